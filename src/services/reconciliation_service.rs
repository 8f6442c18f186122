// src/services/reconciliation_service.rs

use std::{collections::BTreeMap, sync::Arc};

use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::BorrowStore,
    models::{
        audit::{actions, AuditLine},
        auth::Actor,
        borrow::{
            ApprovedSelection, NewReturnRecord, ReturnItemsPayload, ReturnOutcome, ReturnRecord,
            SelectionStatus,
        },
    },
    services::audit_service::AuditService,
};

// Confere cada devolução contra o que foi aprovado até a seleção fechar.
#[derive(Clone)]
pub struct ReconciliationService {
    borrows: Arc<dyn BorrowStore>,
    audit: AuditService,
    max_attempts: u32,
}

/// Valida um lote contra o pendente atual e devolve os registros e o pendente resultante.
fn plan_returns(
    selection: &ApprovedSelection,
    existing: &[ReturnRecord],
    payload: &ReturnItemsPayload,
) -> Result<(Vec<NewReturnRecord>, BTreeMap<Uuid, i32>), AppError> {
    let mut outstanding = selection.outstanding(existing);
    let mut records = Vec::with_capacity(payload.returns.len());

    for entry in &payload.returns {
        if entry.quantity <= 0 {
            return Err(AppError::InvalidQuantity {
                item_id: entry.item_id,
                quantity: entry.quantity,
            });
        }
        let left = outstanding
            .get_mut(&entry.item_id)
            .ok_or(AppError::ItemNotInSelection { item_id: entry.item_id })?;

        // O pendente já desconta as entradas anteriores do mesmo lote
        if entry.quantity > *left {
            return Err(AppError::OverReturn {
                item_id: entry.item_id,
                requested: entry.quantity,
                outstanding: *left,
            });
        }
        let condition = entry.condition.trim();
        if condition.is_empty() {
            return Err(AppError::MissingField { field: "condition" });
        }

        *left -= entry.quantity;
        records.push(NewReturnRecord {
            item_id: entry.item_id,
            returned_quantity: entry.quantity,
            condition: condition.to_string(),
        });
    }
    Ok((records, outstanding))
}

impl ReconciliationService {
    pub fn new(borrows: Arc<dyn BorrowStore>, audit: AuditService, max_attempts: u32) -> Self {
        Self {
            borrows,
            audit,
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn list_selections(
        &self,
        status: Option<SelectionStatus>,
    ) -> Result<Vec<ApprovedSelection>, AppError> {
        self.borrows.list_selections(status).await
    }

    pub async fn list_returns(&self, selection_id: Uuid) -> Result<Vec<ReturnRecord>, AppError> {
        self.borrows
            .find_selection(selection_id)
            .await?
            .ok_or(AppError::SelectionNotFound)?;
        self.borrows.list_returns(selection_id).await
    }

    /// APPROVED → BORROWED. Repetir sobre BORROWED não faz nada.
    pub async fn mark_borrowed(&self, actor: &Actor, selection_id: Uuid) -> Result<ApprovedSelection, AppError> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let current = self
                .borrows
                .find_selection(selection_id)
                .await?
                .ok_or(AppError::SelectionNotFound)?;

            match current.status {
                SelectionStatus::Borrowed => return Ok(current),
                SelectionStatus::Returned => {
                    return Err(AppError::InvalidState {
                        entity: "selection",
                        current: current.status.to_string(),
                        action: "mark borrowed",
                    });
                }
                SelectionStatus::Approved => {}
            }

            match self
                .borrows
                .set_selection_status(selection_id, current.version, SelectionStatus::Borrowed)
                .await
            {
                Ok(borrowed) => {
                    self.audit
                        .record(
                            borrowed.requestor_id,
                            &actor.display_name,
                            actions::BORROWED,
                            borrowed.approved_lines.iter().map(|l| AuditLine::from(&l.line)).collect(),
                        )
                        .await;

                    tracing::info!(selection_id = %selection_id, requestor_id = %borrowed.requestor_id, "Empréstimo confirmado");
                    return Ok(borrowed);
                }
                Err(AppError::VersionConflict { .. }) if attempt < self.max_attempts => {
                    tracing::warn!(selection_id = %selection_id, attempt, "Conflito de versão no empréstimo; relendo");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Registra um evento de devolução (um ou mais itens).
    pub async fn return_items(
        &self,
        actor: &Actor,
        selection_id: Uuid,
        payload: ReturnItemsPayload,
    ) -> Result<ReturnOutcome, AppError> {
        payload.validate()?;
        if payload.returns.is_empty() {
            return Err(AppError::MissingField { field: "returns" });
        }

        let mut attempt = 0;
        loop {
            attempt += 1;

            let current = self
                .borrows
                .find_selection(selection_id)
                .await?
                .ok_or(AppError::SelectionNotFound)?;

            if current.status != SelectionStatus::Borrowed {
                return Err(AppError::InvalidState {
                    entity: "selection",
                    current: current.status.to_string(),
                    action: "return items",
                });
            }

            let existing = self.borrows.list_returns(selection_id).await?;
            let (records, outstanding) = plan_returns(&current, &existing, &payload)?;

            let status = SelectionStatus::after_returns(&outstanding);

            match self
                .borrows
                .record_returns(selection_id, current.version, &records, status)
                .await
            {
                Ok((selection, written)) => {
                    // Uma entrada por evento de devolução, não por item
                    let lines = records
                        .iter()
                        .map(|r| {
                            let mut line = AuditLine::from(r);
                            if let Some(approved) = selection
                                .approved_lines
                                .iter()
                                .find(|l| l.line.inventory_item_id == r.item_id)
                            {
                                line.label = approved.line.inventory_item_label.clone();
                            }
                            line
                        })
                        .collect();
                    self.audit
                        .record(selection.requestor_id, &actor.display_name, actions::RETURNED, lines)
                        .await;

                    tracing::info!(
                        selection_id = %selection_id,
                        requestor_id = %selection.requestor_id,
                        status = %selection.status,
                        "Devolução registrada"
                    );
                    return Ok(ReturnOutcome {
                        selection,
                        records: written,
                        outstanding,
                    });
                }
                Err(AppError::VersionConflict { .. }) if attempt < self.max_attempts => {
                    tracing::warn!(selection_id = %selection_id, attempt, "Conflito de versão na devolução; relendo");
                }
                Err(e) => return Err(e),
            }
        }
    }
}
