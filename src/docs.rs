// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- INVENTORY ---
        handlers::inventory::list_items,

        // --- CART ---
        handlers::cart::get_cart,
        handlers::cart::add_line,
        handlers::cart::update_quantity,
        handlers::cart::remove_line,

        // --- REQUISITIONS ---
        handlers::requisitions::submit,
        handlers::requisitions::list_mine,
        handlers::requisitions::cancel,
        handlers::requisitions::overview,
        handlers::requisitions::activity,

        // --- REVIEW ---
        handlers::review::queue,
        handlers::review::approve,
        handlers::review::reject,

        // --- BORROWS ---
        handlers::borrows::list_selections,
        handlers::borrows::mark_borrowed,
        handlers::borrows::return_items,
        handlers::borrows::list_returns,
    ),
    components(
        schemas(
            // --- Inventory ---
            models::inventory::InventoryItem,

            // --- Cart ---
            models::cart::CartLine,
            models::cart::AddCartLinePayload,
            models::cart::UpdateQuantityPayload,
            models::cart::RemoveOutcome,

            // --- Requisitions ---
            models::requisition::RequisitionStatus,
            models::requisition::Requisition,
            models::requisition::SubmitRequisitionPayload,
            models::requisition::SubmissionReceipt,
            models::overview::RequestRecord,

            // --- Borrows ---
            models::borrow::SelectionStatus,
            models::borrow::ApprovedLine,
            models::borrow::ApprovedSelection,
            models::borrow::ReturnRecord,
            models::borrow::ApprovePayload,
            models::borrow::ReturnEntry,
            models::borrow::ReturnItemsPayload,
            models::borrow::EnrichmentWarning,
            models::borrow::ApprovalOutcome,
            models::borrow::ReturnOutcome,

            // --- Audit ---
            models::audit::AuditLine,
            models::audit::AuditLogEntry,

            // --- Auth ---
            models::auth::Role,
            models::auth::Actor,
        )
    ),
    tags(
        (name = "Inventory", description = "Catálogo de Itens (somente leitura)"),
        (name = "Cart", description = "Carrinho do Solicitante"),
        (name = "Requisitions", description = "Submissão, Cancelamento e Histórico"),
        (name = "Review", description = "Fila de Aprovação"),
        (name = "Borrows", description = "Empréstimos e Devoluções")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
