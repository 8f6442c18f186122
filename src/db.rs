pub mod store;
pub use store::{AuditStore, BorrowStore, CartStore, InventoryCatalog, RequisitionStore, Stores};
pub mod memory;
pub use memory::MemoryStore;
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod cart_repo;
pub use cart_repo::CartRepository;
pub mod requisition_repo;
pub use requisition_repo::RequisitionRepository;
pub mod borrow_repo;
pub use borrow_repo::BorrowRepository;
pub mod audit_repo;

pub use audit_repo::AuditRepository;
