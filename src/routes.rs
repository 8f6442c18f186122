// src/routes.rs

use axum::{
    routing::{get, patch, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers};

// Monta o router principal. A autenticação acontece nos extratores de cada handler.
pub fn router(app_state: AppState) -> Router {
    let me_routes = Router::new()
        .route("/overview", get(handlers::requisitions::overview))
        .route("/activity", get(handlers::requisitions::activity));

    let review_routes = Router::new()
        .route("/queue", get(handlers::review::queue))
        .route("/requisitions/{requisition_id}/approve", post(handlers::review::approve))
        .route("/requisitions/{requisition_id}/reject", post(handlers::review::reject));

    // Combina tudo no router principal
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/inventory/items", get(handlers::inventory::list_items))
        // --- Carrinho ---
        .route("/api/cart", get(handlers::cart::get_cart))
        .route("/api/cart/lines", post(handlers::cart::add_line))
        .route(
            "/api/cart/lines/{item_id}",
            patch(handlers::cart::update_quantity).delete(handlers::cart::remove_line),
        )
        // --- Requisições ---
        .route(
            "/api/requisitions",
            post(handlers::requisitions::submit).get(handlers::requisitions::list_mine),
        )
        .route(
            "/api/requisitions/{requisition_id}/cancel",
            post(handlers::requisitions::cancel),
        )
        .nest("/api/me", me_routes)
        .nest("/api/review", review_routes)
        // --- Empréstimos ---
        .route("/api/borrows", get(handlers::borrows::list_selections))
        .route(
            "/api/borrows/{selection_id}/borrowed",
            post(handlers::borrows::mark_borrowed),
        )
        .route(
            "/api/borrows/{selection_id}/returns",
            post(handlers::borrows::return_items).get(handlers::borrows::list_returns),
        )
        .with_state(app_state)
}
