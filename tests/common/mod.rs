// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc,
};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use lab_requisitions::{
    common::error::AppError,
    config::{AppState, Settings},
    db::{AuditStore, BorrowStore, CartStore, InventoryCatalog, MemoryStore, RequisitionStore, Stores},
    models::{
        audit::{AuditLogEntry, NewAuditEntry},
        auth::{Actor, Role},
        borrow::{ApprovedSelection, NewApprovedSelection, NewReturnRecord, ReturnRecord, SelectionStatus},
        cart::CartLine,
        inventory::InventoryItem,
        requisition::{
            NewRequisition, Requisition, RequisitionChange, RequisitionStatus, SubmitRequisitionPayload,
        },
    },
};

pub const JWT_SECRET: &str = "test-secret";

// --- Falhas injetáveis ---
#[derive(Default)]
pub struct Faults {
    pub fail_audit: AtomicBool,
    pub fail_cart_writes: AtomicBool,
    pub fail_cart_deletes: AtomicBool,
    /// Quantas escritas de versão ainda devem falhar com conflito.
    pub version_conflicts: AtomicU32,
}

impl Faults {
    fn take_conflict(&self) -> bool {
        self.version_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn unavailable() -> AppError {
    AppError::PersistenceError("armazenamento indisponível (falha injetada)".into())
}

/// `MemoryStore` com falhas ligáveis por teste.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub faults: Faults,
}

#[async_trait]
impl InventoryCatalog for FlakyStore {
    async fn find_item(&self, id: Uuid) -> Result<Option<InventoryItem>, AppError> {
        self.inner.find_item(id).await
    }

    async fn list_items(&self, search: Option<&str>) -> Result<Vec<InventoryItem>, AppError> {
        self.inner.list_items(search).await
    }
}

#[async_trait]
impl CartStore for FlakyStore {
    async fn load_cart(&self, requestor_id: Uuid) -> Result<Vec<CartLine>, AppError> {
        self.inner.load_cart(requestor_id).await
    }

    async fn insert_line(&self, requestor_id: Uuid, line: &CartLine) -> Result<(), AppError> {
        if self.faults.fail_cart_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.insert_line(requestor_id, line).await
    }

    async fn update_quantity(&self, requestor_id: Uuid, item_id: Uuid, quantity: i32) -> Result<bool, AppError> {
        if self.faults.fail_cart_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.update_quantity(requestor_id, item_id, quantity).await
    }

    async fn delete_line(&self, requestor_id: Uuid, item_id: Uuid) -> Result<bool, AppError> {
        if self.faults.fail_cart_deletes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.delete_line(requestor_id, item_id).await
    }
}

#[async_trait]
impl RequisitionStore for FlakyStore {
    async fn insert_requisition(&self, new: &NewRequisition) -> Result<Option<Requisition>, AppError> {
        self.inner.insert_requisition(new).await
    }

    async fn find_requisition(&self, id: Uuid) -> Result<Option<Requisition>, AppError> {
        self.inner.find_requisition(id).await
    }

    async fn update_requisition(
        &self,
        id: Uuid,
        expected_version: i32,
        change: &RequisitionChange,
    ) -> Result<Requisition, AppError> {
        if self.faults.take_conflict() {
            return Err(AppError::VersionConflict { entity: "requisition", id });
        }
        self.inner.update_requisition(id, expected_version, change).await
    }

    async fn set_pending_cleanup(&self, id: Uuid, lines: &[CartLine]) -> Result<(), AppError> {
        self.inner.set_pending_cleanup(id, lines).await
    }

    async fn list_open(&self) -> Result<Vec<Requisition>, AppError> {
        self.inner.list_open().await
    }

    async fn list_requestor_log(
        &self,
        requestor_id: Uuid,
        status: Option<RequisitionStatus>,
    ) -> Result<Vec<Requisition>, AppError> {
        self.inner.list_requestor_log(requestor_id, status).await
    }
}

#[async_trait]
impl BorrowStore for FlakyStore {
    async fn find_selection(&self, id: Uuid) -> Result<Option<ApprovedSelection>, AppError> {
        self.inner.find_selection(id).await
    }

    async fn commit_approval(
        &self,
        selection: &NewApprovedSelection,
        expected_version: i32,
        change: &RequisitionChange,
    ) -> Result<(ApprovedSelection, Requisition), AppError> {
        if self.faults.take_conflict() {
            return Err(AppError::VersionConflict {
                entity: "requisition",
                id: selection.requisition_id,
            });
        }
        self.inner.commit_approval(selection, expected_version, change).await
    }

    async fn set_selection_status(
        &self,
        id: Uuid,
        expected_version: i32,
        status: SelectionStatus,
    ) -> Result<ApprovedSelection, AppError> {
        self.inner.set_selection_status(id, expected_version, status).await
    }

    async fn record_returns(
        &self,
        selection_id: Uuid,
        expected_version: i32,
        records: &[NewReturnRecord],
        status: SelectionStatus,
    ) -> Result<(ApprovedSelection, Vec<ReturnRecord>), AppError> {
        self.inner
            .record_returns(selection_id, expected_version, records, status)
            .await
    }

    async fn list_returns(&self, selection_id: Uuid) -> Result<Vec<ReturnRecord>, AppError> {
        self.inner.list_returns(selection_id).await
    }

    async fn list_selections(&self, status: Option<SelectionStatus>) -> Result<Vec<ApprovedSelection>, AppError> {
        self.inner.list_selections(status).await
    }

    async fn list_requestor_selections(&self, requestor_id: Uuid) -> Result<Vec<ApprovedSelection>, AppError> {
        self.inner.list_requestor_selections(requestor_id).await
    }
}

#[async_trait]
impl AuditStore for FlakyStore {
    async fn append(&self, entry: &NewAuditEntry) -> Result<AuditLogEntry, AppError> {
        if self.faults.fail_audit.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.append(entry).await
    }

    async fn list_activity(&self, requestor_id: Uuid) -> Result<Vec<AuditLogEntry>, AppError> {
        self.inner.list_activity(requestor_id).await
    }
}

// --- Fixtures ---

pub fn settings() -> Settings {
    Settings {
        database_url: None,
        jwt_secret: JWT_SECRET.to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        db_max_connections: 5,
        approval_max_attempts: 3,
    }
}

pub fn item(name: &str, code: &str) -> InventoryItem {
    InventoryItem {
        id: Uuid::new_v4(),
        item_code: code.to_string(),
        name: name.to_string(),
        category: "Equipment".to_string(),
        quantity_on_hand: 10,
        room: "LAB-1".to_string(),
        status: "Available".to_string(),
        condition: "Good".to_string(),
        usage_type: "Laboratory".to_string(),
        department: "MEDTECH".to_string(),
        updated_at: Utc::now(),
    }
}

pub fn requestor(name: &str) -> Actor {
    Actor {
        requestor_id: Uuid::new_v4(),
        display_name: name.to_string(),
        role: Role::Requestor,
    }
}

pub fn reviewer(name: &str) -> Actor {
    Actor {
        requestor_id: Uuid::new_v4(),
        display_name: name.to_string(),
        role: Role::Reviewer,
    }
}

pub fn metadata() -> SubmitRequisitionPayload {
    SubmitRequisitionPayload {
        requisition_id: None,
        date_required: NaiveDate::from_ymd_opt(2025, 10, 6),
        time_from: None,
        time_to: None,
        program: Some("BS Medical Technology".to_string()),
        room: Some("LAB-3".to_string()),
        reason: Some("Hematology practical".to_string()),
    }
}

/// Estado completo da aplicação sobre um `FlakyStore`.
pub struct Harness {
    pub store: Arc<FlakyStore>,
    pub state: AppState,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(FlakyStore::default());
        let state = AppState::from_stores(Stores::shared(store.clone()), &settings());
        Self { store, state }
    }

    /// O espelho de carrinhos, para montar um `CartManager` direto.
    pub fn state_carts(&self) -> Arc<dyn CartStore> {
        self.store.clone()
    }

    pub async fn seed(&self, item: &InventoryItem) {
        self.store.inner.upsert_item(item.clone()).await;
    }

    /// Coloca itens no carrinho do solicitante, cada um com a quantidade dada.
    pub async fn fill_cart(&self, actor: &Actor, items: &[(&InventoryItem, i32)]) {
        for (item, quantity) in items {
            self.seed(item).await;
            self.state
                .cart_service
                .add_item(actor.requestor_id, item.id, *quantity)
                .await
                .expect("item deveria entrar no carrinho");
        }
    }

    /// Submete o carrinho e devolve a requisição criada.
    pub async fn submit(&self, actor: &Actor) -> Requisition {
        self.state
            .requisition_service
            .submit(actor, metadata())
            .await
            .expect("submissão deveria passar")
            .requisition
    }

    pub fn token(&self, actor: &Actor) -> String {
        self.state
            .auth_service
            .create_token(actor, chrono::Duration::hours(1))
            .expect("token")
    }

    pub fn fail_audit(&self, on: bool) {
        self.store.faults.fail_audit.store(on, Ordering::SeqCst);
    }

    pub fn fail_cart_writes(&self, on: bool) {
        self.store.faults.fail_cart_writes.store(on, Ordering::SeqCst);
    }

    pub fn fail_cart_deletes(&self, on: bool) {
        self.store.faults.fail_cart_deletes.store(on, Ordering::SeqCst);
    }

    pub fn inject_version_conflicts(&self, count: u32) {
        self.store.faults.version_conflicts.store(count, Ordering::SeqCst);
    }
}
