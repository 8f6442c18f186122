// src/db/store.rs

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        AuditRepository, BorrowRepository, CartRepository, InventoryRepository,
        RequisitionRepository,
    },
    models::{
        audit::{AuditLogEntry, NewAuditEntry},
        borrow::{ApprovedSelection, NewApprovedSelection, NewReturnRecord, ReturnRecord, SelectionStatus},
        cart::CartLine,
        inventory::InventoryItem,
        requisition::{NewRequisition, Requisition, RequisitionChange, RequisitionStatus},
    },
};

// --- Catálogo (somente leitura) ---
#[async_trait]
pub trait InventoryCatalog: Send + Sync {
    async fn find_item(&self, id: Uuid) -> Result<Option<InventoryItem>, AppError>;

    async fn list_items(&self, search: Option<&str>) -> Result<Vec<InventoryItem>, AppError>;
}

// --- Espelho remoto do carrinho ---
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn load_cart(&self, requestor_id: Uuid) -> Result<Vec<CartLine>, AppError>;

    /// Falha com `DuplicateLine` se a linha já existir para o solicitante.
    async fn insert_line(&self, requestor_id: Uuid, line: &CartLine) -> Result<(), AppError>;

    /// `Ok(false)` quando a linha não existe no espelho.
    async fn update_quantity(
        &self,
        requestor_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<bool, AppError>;

    /// Idempotente: `Ok(false)` quando não havia nada para apagar.
    async fn delete_line(&self, requestor_id: Uuid, item_id: Uuid) -> Result<bool, AppError>;
}

// --- Fila global + log do solicitante ---
#[async_trait]
pub trait RequisitionStore: Send + Sync {
    /// Grava a fila e o log na mesma operação atômica.
    /// `Ok(None)` quando já existe uma requisição com o mesmo id.
    async fn insert_requisition(
        &self,
        new: &NewRequisition,
    ) -> Result<Option<Requisition>, AppError>;

    async fn find_requisition(&self, id: Uuid) -> Result<Option<Requisition>, AppError>;

    /// Aplica a mudança às duas cópias se `version` ainda for `expected_version`.
    async fn update_requisition(
        &self,
        id: Uuid,
        expected_version: i32,
        change: &RequisitionChange,
    ) -> Result<Requisition, AppError>;

    /// Substitui, nas duas cópias, as linhas que ainda precisam sair do carrinho.
    async fn set_pending_cleanup(&self, id: Uuid, lines: &[CartLine]) -> Result<(), AppError>;

    async fn list_open(&self) -> Result<Vec<Requisition>, AppError>;

    async fn list_requestor_log(
        &self,
        requestor_id: Uuid,
        status: Option<RequisitionStatus>,
    ) -> Result<Vec<Requisition>, AppError>;
}

// --- Seleções aprovadas e devoluções ---
#[async_trait]
pub trait BorrowStore: Send + Sync {
    async fn find_selection(&self, id: Uuid) -> Result<Option<ApprovedSelection>, AppError>;

    /// Cria a seleção e poda a requisição numa única transação.
    async fn commit_approval(
        &self,
        selection: &NewApprovedSelection,
        expected_version: i32,
        change: &RequisitionChange,
    ) -> Result<(ApprovedSelection, Requisition), AppError>;

    async fn set_selection_status(
        &self,
        id: Uuid,
        expected_version: i32,
        status: SelectionStatus,
    ) -> Result<ApprovedSelection, AppError>;

    /// Grava as devoluções, atualiza a condição no inventário e o status da seleção.
    async fn record_returns(
        &self,
        selection_id: Uuid,
        expected_version: i32,
        records: &[NewReturnRecord],
        status: SelectionStatus,
    ) -> Result<(ApprovedSelection, Vec<ReturnRecord>), AppError>;

    async fn list_returns(&self, selection_id: Uuid) -> Result<Vec<ReturnRecord>, AppError>;

    async fn list_selections(
        &self,
        status: Option<SelectionStatus>,
    ) -> Result<Vec<ApprovedSelection>, AppError>;

    async fn list_requestor_selections(
        &self,
        requestor_id: Uuid,
    ) -> Result<Vec<ApprovedSelection>, AppError>;
}

// --- Histórico (append-only) ---
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: &NewAuditEntry) -> Result<AuditLogEntry, AppError>;

    /// Mais recentes primeiro.
    async fn list_activity(&self, requestor_id: Uuid) -> Result<Vec<AuditLogEntry>, AppError>;
}

/// As cinco costuras de armazenamento, montadas uma vez e clonadas por serviço.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn InventoryCatalog>,
    pub carts: Arc<dyn CartStore>,
    pub requisitions: Arc<dyn RequisitionStore>,
    pub borrows: Arc<dyn BorrowStore>,
    pub audit: Arc<dyn AuditStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            catalog: Arc::new(InventoryRepository::new(pool.clone())),
            carts: Arc::new(CartRepository::new(pool.clone())),
            requisitions: Arc::new(RequisitionRepository::new(pool.clone())),
            borrows: Arc::new(BorrowRepository::new(pool.clone())),
            audit: Arc::new(AuditRepository::new(pool)),
        }
    }

    /// Um único backend que implementa todas as costuras (memória, wrappers de teste).
    pub fn shared<T>(store: Arc<T>) -> Self
    where
        T: InventoryCatalog + CartStore + RequisitionStore + BorrowStore + AuditStore + 'static,
    {
        Self {
            catalog: store.clone(),
            carts: store.clone(),
            requisitions: store.clone(),
            borrows: store.clone(),
            audit: store,
        }
    }
}
