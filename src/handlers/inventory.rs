// src/handlers/inventory.rs

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::inventory::{CatalogQuery, InventoryItem},
};

// ---
// Handler: list_items (catálogo, somente leitura)
// ---
#[utoipa::path(
    get,
    path = "/api/inventory/items",
    tag = "Inventory",
    params(CatalogQuery),
    responses(
        (status = 200, description = "Itens do catálogo", body = Vec<InventoryItem>),
        (status = 401, description = "Token ausente ou inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_items(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Vec<InventoryItem>>, AppError> {
    let items = app_state
        .cart_service
        .browse_catalog(query.search.as_deref())
        .await?;

    Ok(Json(items))
}
