// src/services/requisition_service.rs

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{BorrowStore, RequisitionStore},
    models::{
        audit::{actions, AuditLine},
        auth::{permissions, Actor},
        cart::CartLine,
        overview::RequestRecord,
        requisition::{
            NewRequisition, Requisition, RequisitionChange, RequisitionStatus, SubmissionReceipt,
            SubmitRequisitionPayload,
        },
    },
    services::{audit_service::AuditService, cart_service::CartService},
};

#[derive(Clone)]
pub struct RequisitionService {
    requisitions: Arc<dyn RequisitionStore>,
    borrows: Arc<dyn BorrowStore>,
    carts: CartService,
    audit: AuditService,
    max_attempts: u32,
}

impl RequisitionService {
    pub fn new(
        requisitions: Arc<dyn RequisitionStore>,
        borrows: Arc<dyn BorrowStore>,
        carts: CartService,
        audit: AuditService,
        max_attempts: u32,
    ) -> Self {
        Self {
            requisitions,
            borrows,
            carts,
            audit,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Transforma o carrinho do solicitante numa requisição PENDING.
    pub async fn submit(
        &self,
        actor: &Actor,
        payload: SubmitRequisitionPayload,
    ) -> Result<SubmissionReceipt, AppError> {
        // 1. Metadados (na ordem: data, programa, sala), antes dos limites de formato
        if let Some(field) = payload.first_missing_field() {
            return Err(AppError::MissingField { field });
        }
        payload.validate()?;

        // 2. Repetição com a mesma chave devolve a requisição já gravada
        let requisition_id = payload.requisition_id.unwrap_or_else(Uuid::new_v4);
        if let Some(existing) = self.requisitions.find_requisition(requisition_id).await? {
            return self.replay_submission(actor, existing).await;
        }

        // 3. Carrinho não vazio
        let mut cart = self.carts.open(actor.requestor_id).await?;
        if cart.lines().is_empty() {
            return Err(AppError::EmptyCart);
        }

        // 4. Só linhas completas seguem; as incompletas ficam no carrinho
        let (valid, dropped): (Vec<CartLine>, Vec<CartLine>) =
            cart.lines().iter().cloned().partition(CartLine::is_complete);
        if valid.is_empty() {
            return Err(AppError::NoValidLines);
        }
        let dropped_item_ids: Vec<Uuid> = dropped.iter().map(|l| l.inventory_item_id).collect();
        if !dropped_item_ids.is_empty() {
            tracing::warn!(
                requestor_id = %actor.requestor_id,
                dropped = dropped_item_ids.len(),
                "Linhas com dados incompletos ficaram fora da requisição"
            );
        }

        // `validate` + `first_missing_field` garantem os três campos
        let new = NewRequisition {
            id: requisition_id,
            requestor_id: actor.requestor_id,
            requestor_name: actor.display_name.clone(),
            lines: valid,
            date_required: payload.date_required.ok_or(AppError::MissingField { field: "dateRequired" })?,
            time_from: payload.time_from,
            time_to: payload.time_to,
            program: payload.program.unwrap_or_default().trim().to_string(),
            room: payload.room.unwrap_or_default().trim().to_string(),
            reason: payload.reason.filter(|r| !r.trim().is_empty()),
        };

        // 5. Fila + log numa única escrita atômica
        let Some(mut requisition) = self.requisitions.insert_requisition(&new).await? else {
            // Outra chamada com a mesma chave ganhou a corrida
            let existing = self
                .requisitions
                .find_requisition(requisition_id)
                .await?
                .ok_or(AppError::RequisitionNotFound)?;
            return self.replay_submission(actor, existing).await;
        };

        // 6. Histórico (best-effort)
        self.audit
            .record(
                actor.requestor_id,
                &actor.display_name,
                actions::REQUESTED,
                requisition.lines.iter().map(AuditLine::from).collect(),
            )
            .await;

        // 7. Limpa as linhas consumidas (best-effort por linha)
        let cleanup_failures = cart.consume(&requisition.line_ids()).await;
        if !cleanup_failures.is_empty() {
            let pending: Vec<CartLine> = requisition
                .lines
                .iter()
                .filter(|l| cleanup_failures.contains(&l.inventory_item_id))
                .cloned()
                .collect();
            self.remember_cleanup(&mut requisition, pending).await;
        }

        tracing::info!(
            requisition_id = %requisition.id,
            requestor_id = %actor.requestor_id,
            lines = requisition.lines.len(),
            "✅ Requisição submetida"
        );

        Ok(SubmissionReceipt {
            requisition,
            dropped_item_ids,
            cleanup_failures,
            replayed: false,
        })
    }

    // Repetição idempotente: nada é gravado de novo, só a limpeza pendente é refeita.
    async fn replay_submission(
        &self,
        actor: &Actor,
        mut existing: Requisition,
    ) -> Result<SubmissionReceipt, AppError> {
        if existing.requestor_id != actor.requestor_id {
            return Err(AppError::Forbidden {
                permission: permissions::OWN_REQUISITIONS,
            });
        }

        let mut cleanup_failures = Vec::new();
        if !existing.pending_cleanup.is_empty() {
            let mut cart = self.carts.open(actor.requestor_id).await?;

            // Linha removida ou alterada depois da submissão já não é desta requisição
            let leftovers: Vec<Uuid> = cart
                .lines()
                .iter()
                .filter(|l| existing.pending_cleanup.contains(l))
                .map(|l| l.inventory_item_id)
                .collect();
            cleanup_failures = cart.consume(&leftovers).await;

            let still_pending: Vec<CartLine> = existing
                .pending_cleanup
                .iter()
                .filter(|l| cleanup_failures.contains(&l.inventory_item_id))
                .cloned()
                .collect();
            self.remember_cleanup(&mut existing, still_pending).await;
        }

        tracing::info!(requisition_id = %existing.id, "Submissão repetida; devolvendo a requisição existente");
        Ok(SubmissionReceipt {
            requisition: existing,
            dropped_item_ids: Vec::new(),
            cleanup_failures,
            replayed: true,
        })
    }

    // Best-effort: se a gravação falhar, a próxima repetição não limpa essas linhas.
    async fn remember_cleanup(&self, requisition: &mut Requisition, pending: Vec<CartLine>) {
        if let Err(e) = self.requisitions.set_pending_cleanup(requisition.id, &pending).await {
            tracing::warn!(
                requisition_id = %requisition.id,
                pending = pending.len(),
                error = %e,
                "Falha ao registrar a limpeza pendente do carrinho"
            );
        }
        requisition.pending_cleanup = pending;
    }

    /// O próprio solicitante retira uma requisição ainda aberta.
    pub async fn cancel(&self, actor: &Actor, requisition_id: Uuid) -> Result<Requisition, AppError> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let current = self
                .requisitions
                .find_requisition(requisition_id)
                .await?
                .ok_or(AppError::RequisitionNotFound)?;

            if current.requestor_id != actor.requestor_id {
                return Err(AppError::Forbidden {
                    permission: permissions::OWN_REQUISITIONS,
                });
            }
            if !current.status.is_open() {
                return Err(AppError::InvalidState {
                    entity: "requisition",
                    current: current.status.to_string(),
                    action: "cancel",
                });
            }

            let change = RequisitionChange {
                lines: current.lines.clone(),
                status: RequisitionStatus::Cancelled,
                closed_by: Some(actor.display_name.clone()),
            };

            match self
                .requisitions
                .update_requisition(requisition_id, current.version, &change)
                .await
            {
                Ok(cancelled) => {
                    self.audit
                        .record(
                            cancelled.requestor_id,
                            &actor.display_name,
                            actions::CANCELLED,
                            cancelled.lines.iter().map(AuditLine::from).collect(),
                        )
                        .await;

                    tracing::info!(requisition_id = %requisition_id, "Requisição cancelada pelo solicitante");
                    return Ok(cancelled);
                }
                Err(AppError::VersionConflict { .. }) if attempt < self.max_attempts => {
                    tracing::warn!(requisition_id = %requisition_id, attempt, "Conflito de versão; relendo");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Log do próprio solicitante, opcionalmente filtrado por status.
    pub async fn list_mine(
        &self,
        actor: &Actor,
        status: Option<RequisitionStatus>,
    ) -> Result<Vec<Requisition>, AppError> {
        self.requisitions
            .list_requestor_log(actor.requestor_id, status)
            .await
    }

    /// Todos os registros do solicitante, em qualquer etapa.
    pub async fn overview(&self, actor: &Actor) -> Result<Vec<RequestRecord>, AppError> {
        let cart = self.carts.open(actor.requestor_id).await?;
        let requisitions = self
            .requisitions
            .list_requestor_log(actor.requestor_id, None)
            .await?;
        let selections = self
            .borrows
            .list_requestor_selections(actor.requestor_id)
            .await?;

        let records = cart
            .into_lines()
            .into_iter()
            .map(RequestRecord::Cart)
            .chain(requisitions.into_iter().map(RequestRecord::Requisition))
            .chain(selections.into_iter().map(RequestRecord::ApprovedSelection))
            .collect();
        Ok(records)
    }
}
