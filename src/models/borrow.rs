// src/models/borrow.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::{cart::CartLine, requisition::Requisition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "selection_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionStatus {
    Approved,
    Borrowed,
    Returned,
}

impl SelectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Borrowed => "BORROWED",
            Self::Returned => "RETURNED",
        }
    }

    /// Estado de uma seleção emprestada depois de um evento de devolução.
    /// Só fecha quando todas as linhas foram devolvidas por inteiro.
    pub fn after_returns(outstanding: &BTreeMap<Uuid, i32>) -> Self {
        if outstanding.values().all(|left| *left <= 0) {
            Self::Returned
        } else {
            Self::Borrowed
        }
    }
}

impl std::fmt::Display for SelectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Linha aprovada ---
// A linha original da requisição + o identificador canônico resolvido no catálogo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedLine {
    #[serde(flatten)]
    pub line: CartLine,
    #[schema(example = "MED-002")]
    pub item_code: String,
}

// --- Seleção Aprovada (registro de empréstimo) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedSelection {
    pub id: Uuid,
    pub requisition_id: Uuid,
    pub requestor_id: Uuid,
    pub requestor_name: String,
    #[sqlx(json)]
    pub approved_lines: Vec<ApprovedLine>,
    pub approved_by: String,
    pub status: SelectionStatus,
    pub version: i32,
    pub approved_at: DateTime<Utc>,
    pub borrowed_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl ApprovedSelection {
    /// Quantidade ainda em aberto por item, descontando as devoluções já gravadas.
    pub fn outstanding(&self, returns: &[ReturnRecord]) -> BTreeMap<Uuid, i32> {
        let mut outstanding: BTreeMap<Uuid, i32> = self
            .approved_lines
            .iter()
            .map(|l| (l.line.inventory_item_id, l.line.quantity_requested))
            .collect();

        for record in returns.iter().filter(|r| r.selection_id == self.id) {
            if let Some(left) = outstanding.get_mut(&record.item_id) {
                *left -= record.returned_quantity;
            }
        }
        outstanding
    }
}

/// Dados para gravar uma nova seleção aprovada.
#[derive(Debug, Clone)]
pub struct NewApprovedSelection {
    pub id: Uuid,
    pub requisition_id: Uuid,
    pub requestor_id: Uuid,
    pub requestor_name: String,
    pub approved_lines: Vec<ApprovedLine>,
    pub approved_by: String,
}

// --- Registro de Devolução (histórico, nunca alterado) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRecord {
    pub id: Uuid,
    pub selection_id: Uuid,
    pub requestor_id: Uuid,
    pub item_id: Uuid,
    pub returned_quantity: i32,
    #[schema(example = "Good")]
    pub condition: String,
    pub date_returned: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReturnRecord {
    pub item_id: Uuid,
    pub returned_quantity: i32,
    pub condition: String,
}

// --- Payloads ---

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovePayload {
    /// Ids dos itens de inventário marcados pelo revisor.
    pub selected_item_ids: Vec<Uuid>,
    /// Chave de idempotência da seleção aprovada.
    pub selection_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnEntry {
    pub item_id: Uuid,
    #[schema(example = 2)]
    pub quantity: i32,
    #[validate(length(min = 1, message = "A condição do item é obrigatória."))]
    #[schema(example = "Good")]
    pub condition: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnItemsPayload {
    #[validate(nested)]
    pub returns: Vec<ReturnEntry>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SelectionStatusQuery {
    pub status: Option<SelectionStatus>,
}

/// Aviso não fatal: item ausente do catálogo durante a aprovação.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentWarning {
    pub inventory_item_id: Uuid,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalOutcome {
    pub selection: ApprovedSelection,
    pub requisition: Requisition,
    pub warnings: Vec<EnrichmentWarning>,
    pub replayed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnOutcome {
    pub selection: ApprovedSelection,
    pub records: Vec<ReturnRecord>,
    /// Quantidade ainda em aberto por item após esta devolução.
    pub outstanding: BTreeMap<Uuid, i32>,
}
