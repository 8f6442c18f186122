// src/services/approval_service.rs

use std::{collections::HashSet, sync::Arc};

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{BorrowStore, InventoryCatalog, RequisitionStore},
    models::{
        audit::{actions, AuditLine},
        auth::Actor,
        borrow::{ApprovalOutcome, ApprovePayload, ApprovedLine, EnrichmentWarning, NewApprovedSelection},
        cart::CartLine,
        inventory::PLACEHOLDER_ITEM_CODE,
        requisition::{Requisition, RequisitionChange, RequisitionStatus},
    },
    services::audit_service::AuditService,
};

/// Alcance de uma rejeição. Hoje só existe a rejeição do conjunto inteiro;
/// uma rejeição por linha entraria aqui como nova variante.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionScope {
    WholeRequisition,
}

#[derive(Clone)]
pub struct ApprovalService {
    requisitions: Arc<dyn RequisitionStore>,
    borrows: Arc<dyn BorrowStore>,
    catalog: Arc<dyn InventoryCatalog>,
    audit: AuditService,
    max_attempts: u32,
}

impl ApprovalService {
    pub fn new(
        requisitions: Arc<dyn RequisitionStore>,
        borrows: Arc<dyn BorrowStore>,
        catalog: Arc<dyn InventoryCatalog>,
        audit: AuditService,
        max_attempts: u32,
    ) -> Self {
        Self {
            requisitions,
            borrows,
            catalog,
            audit,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Requisições abertas, das mais antigas para as mais novas.
    pub async fn queue(&self) -> Result<Vec<Requisition>, AppError> {
        self.requisitions.list_open().await
    }

    /// Aprova o subconjunto marcado pelo revisor.
    pub async fn approve(
        &self,
        reviewer: &Actor,
        requisition_id: Uuid,
        payload: ApprovePayload,
    ) -> Result<ApprovalOutcome, AppError> {
        // 1. Nada marcado é erro, não uma aprovação vazia
        if payload.selected_item_ids.is_empty() {
            return Err(AppError::NoSelection);
        }
        let selected: HashSet<Uuid> = payload.selected_item_ids.iter().copied().collect();
        let selection_id = payload.selection_id.unwrap_or_else(Uuid::new_v4);

        let mut attempt = 0;
        loop {
            attempt += 1;

            // 2. Repetição com a mesma chave devolve a seleção já gravada
            if let Some(outcome) = self.replay_approval(requisition_id, selection_id).await? {
                return Ok(outcome);
            }

            // 3. Relê a requisição logo antes de aprovar
            let current = self
                .requisitions
                .find_requisition(requisition_id)
                .await?
                .ok_or(AppError::RequisitionNotFound)?;

            let (approved, remaining): (Vec<CartLine>, Vec<CartLine>) = current
                .lines
                .iter()
                .cloned()
                .partition(|l| selected.contains(&l.inventory_item_id));

            // Linhas já aprovadas por outra sessão somem da interseção
            if approved.is_empty() {
                return Err(AppError::NoSelection);
            }
            if !current.status.is_open() {
                return Err(AppError::InvalidState {
                    entity: "requisition",
                    current: current.status.to_string(),
                    action: "approve",
                });
            }

            // 4. Enriquecimento pelo catálogo; item ausente vira placeholder + aviso
            let (approved_lines, warnings) = self.enrich(&approved).await?;

            let new_selection = NewApprovedSelection {
                id: selection_id,
                requisition_id,
                requestor_id: current.requestor_id,
                requestor_name: current.requestor_name.clone(),
                approved_lines,
                approved_by: reviewer.display_name.clone(),
            };
            let status = RequisitionStatus::after_approval(remaining.len());
            let change = RequisitionChange {
                lines: remaining,
                status,
                closed_by: Some(reviewer.display_name.clone()),
            };

            // 5. Seleção + poda da requisição numa única transação
            match self
                .borrows
                .commit_approval(&new_selection, current.version, &change)
                .await
            {
                Ok((selection, requisition)) => {
                    self.audit
                        .record(
                            selection.requestor_id,
                            &reviewer.display_name,
                            actions::APPROVED,
                            approved.iter().map(AuditLine::from).collect(),
                        )
                        .await;

                    tracing::info!(
                        requisition_id = %requisition_id,
                        selection_id = %selection.id,
                        requestor_id = %selection.requestor_id,
                        approved = selection.approved_lines.len(),
                        status = %requisition.status,
                        "✅ Seleção aprovada"
                    );
                    return Ok(ApprovalOutcome {
                        selection,
                        requisition,
                        warnings,
                        replayed: false,
                    });
                }
                Err(AppError::VersionConflict { .. }) if attempt < self.max_attempts => {
                    tracing::warn!(requisition_id = %requisition_id, attempt, "Conflito de versão na aprovação; relendo");
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn replay_approval(
        &self,
        requisition_id: Uuid,
        selection_id: Uuid,
    ) -> Result<Option<ApprovalOutcome>, AppError> {
        let Some(selection) = self.borrows.find_selection(selection_id).await? else {
            return Ok(None);
        };
        if selection.requisition_id != requisition_id {
            return Err(AppError::InvalidState {
                entity: "selection",
                current: format!("vinculada à requisição {}", selection.requisition_id),
                action: "approve",
            });
        }

        let requisition = self
            .requisitions
            .find_requisition(requisition_id)
            .await?
            .ok_or(AppError::RequisitionNotFound)?;

        tracing::info!(selection_id = %selection_id, "Aprovação repetida; devolvendo a seleção existente");
        Ok(Some(ApprovalOutcome {
            selection,
            requisition,
            warnings: Vec::new(),
            replayed: true,
        }))
    }

    async fn enrich(
        &self,
        lines: &[CartLine],
    ) -> Result<(Vec<ApprovedLine>, Vec<EnrichmentWarning>), AppError> {
        let mut approved = Vec::with_capacity(lines.len());
        let mut warnings = Vec::new();

        for line in lines {
            let item_code = match self.catalog.find_item(line.inventory_item_id).await? {
                Some(item) => item.item_code,
                None => {
                    tracing::warn!(
                        item_id = %line.inventory_item_id,
                        label = %line.inventory_item_label,
                        "Item ausente do catálogo; usando identificador provisório"
                    );
                    warnings.push(EnrichmentWarning {
                        inventory_item_id: line.inventory_item_id,
                        message: format!(
                            "'{}' não está mais no catálogo; identificador '{}' usado.",
                            line.inventory_item_label, PLACEHOLDER_ITEM_CODE
                        ),
                    });
                    PLACEHOLDER_ITEM_CODE.to_string()
                }
            };
            approved.push(ApprovedLine {
                line: line.clone(),
                item_code,
            });
        }
        Ok((approved, warnings))
    }

    /// Devolve a requisição inteira ao solicitante.
    pub async fn reject(&self, reviewer: &Actor, requisition_id: Uuid) -> Result<Requisition, AppError> {
        self.reject_scoped(reviewer, requisition_id, RejectionScope::WholeRequisition)
            .await
    }

    pub async fn reject_scoped(
        &self,
        reviewer: &Actor,
        requisition_id: Uuid,
        scope: RejectionScope,
    ) -> Result<Requisition, AppError> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let current = self
                .requisitions
                .find_requisition(requisition_id)
                .await?
                .ok_or(AppError::RequisitionNotFound)?;

            if !current.status.is_open() {
                return Err(AppError::InvalidState {
                    entity: "requisition",
                    current: current.status.to_string(),
                    action: "reject",
                });
            }

            // As linhas ficam intactas para o solicitante ver o que foi devolvido
            let change = match scope {
                RejectionScope::WholeRequisition => RequisitionChange {
                    lines: current.lines.clone(),
                    status: current.status.after_rejection(),
                    closed_by: Some(reviewer.display_name.clone()),
                },
            };

            match self
                .requisitions
                .update_requisition(requisition_id, current.version, &change)
                .await
            {
                Ok(rejected) => {
                    self.audit
                        .record(
                            rejected.requestor_id,
                            &reviewer.display_name,
                            actions::REJECTED,
                            rejected.lines.iter().map(AuditLine::from).collect(),
                        )
                        .await;

                    tracing::info!(
                        requisition_id = %requisition_id,
                        status = %rejected.status,
                        "Requisição rejeitada"
                    );
                    return Ok(rejected);
                }
                Err(AppError::VersionConflict { .. }) if attempt < self.max_attempts => {
                    tracing::warn!(requisition_id = %requisition_id, attempt, "Conflito de versão na rejeição; relendo");
                }
                Err(e) => return Err(e),
            }
        }
    }
}
