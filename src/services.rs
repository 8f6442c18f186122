pub mod approval_service;
pub mod audit_service;
pub mod auth;
pub mod cart_service;
pub mod notification;
pub mod reconciliation_service;
pub mod requisition_service;

pub use approval_service::ApprovalService;
pub use audit_service::AuditService;
pub use cart_service::CartService;
pub use reconciliation_service::ReconciliationService;
pub use requisition_service::RequisitionService;
