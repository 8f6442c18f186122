// src/db/memory.rs

// Backend em memória: modo de desenvolvimento (sem DATABASE_URL) e testes.
// Cada escrita que toca mais de uma coleção acontece sob um único lock de escrita,
// então nenhum leitor enxerga um estado intermediário.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{AuditStore, BorrowStore, CartStore, InventoryCatalog, RequisitionStore},
    models::{
        audit::{AuditLogEntry, NewAuditEntry},
        borrow::{
            ApprovedSelection, NewApprovedSelection, NewReturnRecord, ReturnRecord,
            SelectionStatus,
        },
        cart::CartLine,
        inventory::InventoryItem,
        requisition::{NewRequisition, Requisition, RequisitionChange, RequisitionStatus},
    },
};

#[derive(Default)]
struct MemoryState {
    items: BTreeMap<Uuid, InventoryItem>,
    carts: HashMap<Uuid, Vec<CartLine>>,
    queue: HashMap<Uuid, Requisition>,
    log: HashMap<Uuid, Requisition>,
    selections: HashMap<Uuid, ApprovedSelection>,
    returns: Vec<ReturnRecord>,
    audit: Vec<AuditLogEntry>,
}

impl MemoryState {
    // Mesma regra da versão SQL: confere a versão e grava nas duas cópias.
    fn apply_change(
        &mut self,
        id: Uuid,
        expected_version: i32,
        change: &RequisitionChange,
    ) -> Result<Requisition, AppError> {
        let current = self.queue.get(&id).ok_or(AppError::RequisitionNotFound)?;
        if current.version != expected_version {
            return Err(AppError::VersionConflict {
                entity: "requisition",
                id,
            });
        }

        let mut updated = current.clone();
        updated.lines = change.lines.clone();
        updated.status = change.status;
        updated.version += 1;
        if change.status.is_terminal() {
            updated.closed_by = change.closed_by.clone();
            updated.closed_at = Some(Utc::now());
        }

        self.queue.insert(id, updated.clone());
        self.log.insert(id, updated.clone());
        Ok(updated)
    }

    fn selection_for_update(
        &self,
        id: Uuid,
        expected_version: i32,
    ) -> Result<ApprovedSelection, AppError> {
        let current = self.selections.get(&id).ok_or(AppError::SelectionNotFound)?;
        if current.version != expected_version {
            return Err(AppError::VersionConflict {
                entity: "selection",
                id,
            });
        }
        Ok(current.clone())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cadastra (ou substitui) um item no catálogo.
    pub async fn upsert_item(&self, item: InventoryItem) {
        self.state.write().await.items.insert(item.id, item);
    }

    /// Remove um item do catálogo (simula uma exclusão feita pelo subsistema de inventário).
    pub async fn remove_item(&self, id: Uuid) -> bool {
        self.state.write().await.items.remove(&id).is_some()
    }

    /// Cópia do log do solicitante, para conferir o espelhamento.
    pub async fn requestor_log_entry(&self, id: Uuid) -> Option<Requisition> {
        self.state.read().await.log.get(&id).cloned()
    }
}

#[async_trait]
impl InventoryCatalog for MemoryStore {
    async fn find_item(&self, id: Uuid) -> Result<Option<InventoryItem>, AppError> {
        Ok(self.state.read().await.items.get(&id).cloned())
    }

    async fn list_items(&self, search: Option<&str>) -> Result<Vec<InventoryItem>, AppError> {
        let state = self.state.read().await;
        let mut items: Vec<InventoryItem> = state
            .items
            .values()
            .filter(|item| search.is_none_or(|needle| item.matches(needle)))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn load_cart(&self, requestor_id: Uuid) -> Result<Vec<CartLine>, AppError> {
        let state = self.state.read().await;
        Ok(state.carts.get(&requestor_id).cloned().unwrap_or_default())
    }

    async fn insert_line(&self, requestor_id: Uuid, line: &CartLine) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        let cart = state.carts.entry(requestor_id).or_default();

        if cart.iter().any(|l| l.inventory_item_id == line.inventory_item_id) {
            return Err(AppError::DuplicateLine {
                item_id: line.inventory_item_id,
            });
        }
        cart.push(line.clone());
        Ok(())
    }

    async fn update_quantity(
        &self,
        requestor_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        let line = state
            .carts
            .get_mut(&requestor_id)
            .and_then(|cart| cart.iter_mut().find(|l| l.inventory_item_id == item_id));

        match line {
            Some(line) => {
                line.quantity_requested = quantity;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_line(&self, requestor_id: Uuid, item_id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        let Some(cart) = state.carts.get_mut(&requestor_id) else {
            return Ok(false);
        };
        let before = cart.len();
        cart.retain(|l| l.inventory_item_id != item_id);
        Ok(cart.len() != before)
    }
}

#[async_trait]
impl RequisitionStore for MemoryStore {
    async fn insert_requisition(
        &self,
        new: &NewRequisition,
    ) -> Result<Option<Requisition>, AppError> {
        let mut state = self.state.write().await;
        if state.queue.contains_key(&new.id) {
            return Ok(None);
        }

        let requisition = Requisition {
            id: new.id,
            requestor_id: new.requestor_id,
            requestor_name: new.requestor_name.clone(),
            lines: new.lines.clone(),
            date_required: new.date_required,
            time_from: new.time_from,
            time_to: new.time_to,
            program: new.program.clone(),
            room: new.room.clone(),
            reason: new.reason.clone(),
            status: RequisitionStatus::Pending,
            version: 1,
            closed_by: None,
            closed_at: None,
            submitted_at: Utc::now(),
            pending_cleanup: Vec::new(),
        };

        state.queue.insert(requisition.id, requisition.clone());
        state.log.insert(requisition.id, requisition.clone());
        Ok(Some(requisition))
    }

    async fn find_requisition(&self, id: Uuid) -> Result<Option<Requisition>, AppError> {
        Ok(self.state.read().await.queue.get(&id).cloned())
    }

    async fn update_requisition(
        &self,
        id: Uuid,
        expected_version: i32,
        change: &RequisitionChange,
    ) -> Result<Requisition, AppError> {
        self.state
            .write()
            .await
            .apply_change(id, expected_version, change)
    }

    async fn set_pending_cleanup(&self, id: Uuid, lines: &[CartLine]) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        let queued = state.queue.get_mut(&id).ok_or(AppError::RequisitionNotFound)?;
        queued.pending_cleanup = lines.to_vec();
        if let Some(logged) = state.log.get_mut(&id) {
            logged.pending_cleanup = lines.to_vec();
        }
        Ok(())
    }

    async fn list_open(&self) -> Result<Vec<Requisition>, AppError> {
        let state = self.state.read().await;
        let mut open: Vec<Requisition> = state
            .queue
            .values()
            .filter(|r| r.status.is_open())
            .cloned()
            .collect();
        open.sort_by_key(|r| r.submitted_at);
        Ok(open)
    }

    async fn list_requestor_log(
        &self,
        requestor_id: Uuid,
        status: Option<RequisitionStatus>,
    ) -> Result<Vec<Requisition>, AppError> {
        let state = self.state.read().await;
        let mut log: Vec<Requisition> = state
            .log
            .values()
            .filter(|r| r.requestor_id == requestor_id)
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        log.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(log)
    }
}

#[async_trait]
impl BorrowStore for MemoryStore {
    async fn find_selection(&self, id: Uuid) -> Result<Option<ApprovedSelection>, AppError> {
        Ok(self.state.read().await.selections.get(&id).cloned())
    }

    async fn commit_approval(
        &self,
        selection: &NewApprovedSelection,
        expected_version: i32,
        change: &RequisitionChange,
    ) -> Result<(ApprovedSelection, Requisition), AppError> {
        let mut state = self.state.write().await;
        if state.selections.contains_key(&selection.id) {
            return Err(AppError::VersionConflict {
                entity: "selection",
                id: selection.id,
            });
        }

        let requisition = state.apply_change(selection.requisition_id, expected_version, change)?;

        let created = ApprovedSelection {
            id: selection.id,
            requisition_id: selection.requisition_id,
            requestor_id: selection.requestor_id,
            requestor_name: selection.requestor_name.clone(),
            approved_lines: selection.approved_lines.clone(),
            approved_by: selection.approved_by.clone(),
            status: SelectionStatus::Approved,
            version: 1,
            approved_at: Utc::now(),
            borrowed_at: None,
            returned_at: None,
        };
        state.selections.insert(created.id, created.clone());

        Ok((created, requisition))
    }

    async fn set_selection_status(
        &self,
        id: Uuid,
        expected_version: i32,
        status: SelectionStatus,
    ) -> Result<ApprovedSelection, AppError> {
        let mut state = self.state.write().await;
        let mut selection = state.selection_for_update(id, expected_version)?;

        selection.status = status;
        selection.version += 1;
        match status {
            SelectionStatus::Borrowed => selection.borrowed_at = Some(Utc::now()),
            SelectionStatus::Returned => selection.returned_at = Some(Utc::now()),
            SelectionStatus::Approved => {}
        }

        state.selections.insert(id, selection.clone());
        Ok(selection)
    }

    async fn record_returns(
        &self,
        selection_id: Uuid,
        expected_version: i32,
        records: &[NewReturnRecord],
        status: SelectionStatus,
    ) -> Result<(ApprovedSelection, Vec<ReturnRecord>), AppError> {
        let mut state = self.state.write().await;
        let mut selection = state.selection_for_update(selection_id, expected_version)?;

        let now = Utc::now();
        let written: Vec<ReturnRecord> = records
            .iter()
            .map(|r| ReturnRecord {
                id: Uuid::new_v4(),
                selection_id,
                requestor_id: selection.requestor_id,
                item_id: r.item_id,
                returned_quantity: r.returned_quantity,
                condition: r.condition.clone(),
                date_returned: now,
            })
            .collect();

        // A condição informada pelo revisor vai para o catálogo
        for record in records {
            if let Some(item) = state.items.get_mut(&record.item_id) {
                item.condition = record.condition.clone();
                item.updated_at = now;
            }
        }

        selection.status = status;
        selection.version += 1;
        if status == SelectionStatus::Returned {
            selection.returned_at = Some(now);
        }

        state.returns.extend(written.iter().cloned());
        state.selections.insert(selection_id, selection.clone());
        Ok((selection, written))
    }

    async fn list_returns(&self, selection_id: Uuid) -> Result<Vec<ReturnRecord>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .returns
            .iter()
            .filter(|r| r.selection_id == selection_id)
            .cloned()
            .collect())
    }

    async fn list_selections(
        &self,
        status: Option<SelectionStatus>,
    ) -> Result<Vec<ApprovedSelection>, AppError> {
        let state = self.state.read().await;
        let mut selections: Vec<ApprovedSelection> = state
            .selections
            .values()
            .filter(|s| status.is_none_or(|wanted| s.status == wanted))
            .cloned()
            .collect();
        selections.sort_by(|a, b| b.approved_at.cmp(&a.approved_at));
        Ok(selections)
    }

    async fn list_requestor_selections(
        &self,
        requestor_id: Uuid,
    ) -> Result<Vec<ApprovedSelection>, AppError> {
        let state = self.state.read().await;
        let mut selections: Vec<ApprovedSelection> = state
            .selections
            .values()
            .filter(|s| s.requestor_id == requestor_id)
            .cloned()
            .collect();
        selections.sort_by(|a, b| b.approved_at.cmp(&a.approved_at));
        Ok(selections)
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append(&self, entry: &NewAuditEntry) -> Result<AuditLogEntry, AppError> {
        let written = AuditLogEntry {
            id: Uuid::new_v4(),
            requestor_id: entry.requestor_id,
            action: entry.action.clone(),
            actor_name: entry.actor_name.clone(),
            related_lines: entry.related_lines.clone(),
            timestamp: Utc::now(),
        };
        self.state.write().await.audit.push(written.clone());
        Ok(written)
    }

    async fn list_activity(&self, requestor_id: Uuid) -> Result<Vec<AuditLogEntry>, AppError> {
        let state = self.state.read().await;
        // Ordem de inserção invertida; o sort estável mantém empates nessa ordem
        let mut entries: Vec<AuditLogEntry> = state
            .audit
            .iter()
            .rev()
            .filter(|e| e.requestor_id == requestor_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }
}
