// src/handlers/borrows.rs

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{PermReviewRequisitions, RequirePermission},
    },
    models::borrow::{
        ApprovedSelection, ReturnItemsPayload, ReturnOutcome, ReturnRecord, SelectionStatusQuery,
    },
};

#[utoipa::path(
    get,
    path = "/api/borrows",
    tag = "Borrows",
    params(SelectionStatusQuery),
    responses(
        (status = 200, description = "Seleções aprovadas", body = Vec<ApprovedSelection>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_selections(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermReviewRequisitions>,
    Query(query): Query<SelectionStatusQuery>,
) -> Result<Json<Vec<ApprovedSelection>>, AppError> {
    let selections = app_state
        .reconciliation_service
        .list_selections(query.status)
        .await?;
    Ok(Json(selections))
}

#[utoipa::path(
    post,
    path = "/api/borrows/{selection_id}/borrowed",
    tag = "Borrows",
    params(
        ("selection_id" = Uuid, Path, description = "ID da Seleção Aprovada")
    ),
    responses(
        (status = 200, description = "Empréstimo confirmado (idempotente)", body = ApprovedSelection),
        (status = 409, description = "A seleção já foi devolvida")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_borrowed(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermReviewRequisitions>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(selection_id): Path<Uuid>,
) -> Result<Json<ApprovedSelection>, AppError> {
    let selection = app_state
        .reconciliation_service
        .mark_borrowed(&actor, selection_id)
        .await?;
    Ok(Json(selection))
}

#[utoipa::path(
    post,
    path = "/api/borrows/{selection_id}/returns",
    tag = "Borrows",
    request_body = ReturnItemsPayload,
    params(
        ("selection_id" = Uuid, Path, description = "ID da Seleção Aprovada")
    ),
    responses(
        (status = 200, description = "Devolução registrada", body = ReturnOutcome),
        (status = 409, description = "A seleção não está emprestada"),
        (status = 422, description = "Quantidade inválida ou acima do pendente")
    ),
    security(("api_jwt" = []))
)]
pub async fn return_items(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermReviewRequisitions>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(selection_id): Path<Uuid>,
    Json(payload): Json<ReturnItemsPayload>,
) -> Result<Json<ReturnOutcome>, AppError> {
    let outcome = app_state
        .reconciliation_service
        .return_items(&actor, selection_id, payload)
        .await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/api/borrows/{selection_id}/returns",
    tag = "Borrows",
    params(
        ("selection_id" = Uuid, Path, description = "ID da Seleção Aprovada")
    ),
    responses(
        (status = 200, description = "Devoluções registradas", body = Vec<ReturnRecord>),
        (status = 404, description = "Seleção não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_returns(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermReviewRequisitions>,
    Path(selection_id): Path<Uuid>,
) -> Result<Json<Vec<ReturnRecord>>, AppError> {
    let records = app_state
        .reconciliation_service
        .list_returns(selection_id)
        .await?;
    Ok(Json(records))
}
