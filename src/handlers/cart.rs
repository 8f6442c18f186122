// src/handlers/cart.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::cart::{AddCartLinePayload, CartLine, RemoveOutcome, UpdateQuantityPayload},
};

#[utoipa::path(
    get,
    path = "/api/cart",
    tag = "Cart",
    responses(
        (status = 200, description = "Carrinho reidratado do espelho remoto", body = Vec<CartLine>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_cart(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> Result<Json<Vec<CartLine>>, AppError> {
    let cart = app_state.cart_service.open(actor.requestor_id).await?;
    Ok(Json(cart.into_lines()))
}

#[utoipa::path(
    post,
    path = "/api/cart/lines",
    tag = "Cart",
    request_body = AddCartLinePayload,
    responses(
        (status = 201, description = "Linha adicionada; retorna o carrinho atualizado", body = Vec<CartLine>),
        (status = 404, description = "Item não existe no catálogo"),
        (status = 409, description = "Item já está no carrinho")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_line(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Json(payload): Json<AddCartLinePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let lines = app_state
        .cart_service
        .add_item(actor.requestor_id, payload.inventory_item_id, payload.quantity)
        .await?;

    Ok((StatusCode::CREATED, Json(lines)))
}

#[utoipa::path(
    patch,
    path = "/api/cart/lines/{item_id}",
    tag = "Cart",
    request_body = UpdateQuantityPayload,
    params(
        ("item_id" = Uuid, Path, description = "ID do item de inventário")
    ),
    responses(
        (status = 200, description = "Quantidade atualizada", body = Vec<CartLine>),
        (status = 404, description = "Linha não está no carrinho"),
        (status = 422, description = "Quantidade menor que 1")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_quantity(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityPayload>,
) -> Result<Json<Vec<CartLine>>, AppError> {
    let lines = app_state
        .cart_service
        .update_quantity(actor.requestor_id, item_id, payload.quantity)
        .await?;

    Ok(Json(lines))
}

#[utoipa::path(
    delete,
    path = "/api/cart/lines/{item_id}",
    tag = "Cart",
    params(
        ("item_id" = Uuid, Path, description = "ID do item de inventário")
    ),
    responses(
        (status = 200, description = "Remoção idempotente; informa o que foi encontrado", body = RemoveOutcome)
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_line(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(item_id): Path<Uuid>,
) -> Result<Json<RemoveOutcome>, AppError> {
    let outcome = app_state
        .cart_service
        .remove_item(actor.requestor_id, item_id)
        .await?;

    Ok(Json(outcome))
}
