// src/models/requisition.rs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::cart::CartLine;

// --- Enums ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "requisition_status", rename_all = "SCREAMING_SNAKE_CASE")] // Banco
#[serde(rename_all = "SCREAMING_SNAKE_CASE")] // JSON
pub enum RequisitionStatus {
    Pending,           // Vira "PENDING"
    PartiallyApproved, // Parte aprovada, o restante continua na fila
    Approved,          // Todas as linhas foram consumidas por aprovações
    Rejected,          // Restante recusado após aprovação parcial
    Cancelled,         // Devolvida ao solicitante (ou retirada por ele)
}

impl RequisitionStatus {
    /// Ainda aceita aprovação, rejeição ou cancelamento.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::PartiallyApproved)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_open()
    }

    /// Status após aprovar um subconjunto das linhas. Com sobra, a requisição
    /// segue aberta como PARTIALLY_APPROVED, o que a distingue de uma intacta
    /// (PENDING) na fila e na rejeição. APPROVED só quando não resta nenhuma linha.
    pub fn after_approval(remaining_lines: usize) -> Self {
        if remaining_lines == 0 {
            Self::Approved
        } else {
            Self::PartiallyApproved
        }
    }

    /// Status após a rejeição pelo revisor. Uma requisição intacta volta ao
    /// solicitante como CANCELLED; o restante de uma aprovação parcial fica REJECTED.
    pub fn after_rejection(self) -> Self {
        match self {
            Self::PartiallyApproved => Self::Rejected,
            _ => Self::Cancelled,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::PartiallyApproved => "PARTIALLY_APPROVED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for RequisitionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Requisição ---
// Gravada na fila global e no log do solicitante com o mesmo `id`.
// `lines` guarda apenas as linhas ainda não aprovadas; `version` é o token
// de concorrência otimista usado por aprovação, rejeição e cancelamento.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Requisition {
    pub id: Uuid,
    pub requestor_id: Uuid,
    #[schema(example = "Berlene Bernabe")]
    pub requestor_name: String,
    #[sqlx(json)]
    pub lines: Vec<CartLine>,
    pub date_required: NaiveDate,
    #[schema(value_type = Option<String>, example = "08:00:00")]
    pub time_from: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "10:00:00")]
    pub time_to: Option<NaiveTime>,
    #[schema(example = "BS Medical Technology")]
    pub program: String,
    #[schema(example = "LAB-3")]
    pub room: String,
    pub reason: Option<String>,
    pub status: RequisitionStatus,
    pub version: i32,
    pub closed_by: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    /// Cópia das linhas que a submissão não conseguiu tirar do carrinho.
    /// Uma repetição só apaga a linha do carrinho se ela ainda for idêntica.
    #[sqlx(json)]
    #[serde(default)]
    pub pending_cleanup: Vec<CartLine>,
}

impl Requisition {
    pub fn line_ids(&self) -> Vec<Uuid> {
        self.lines.iter().map(|l| l.inventory_item_id).collect()
    }
}

/// Dados para gravar uma nova requisição (o timestamp é do servidor).
#[derive(Debug, Clone)]
pub struct NewRequisition {
    pub id: Uuid,
    pub requestor_id: Uuid,
    pub requestor_name: String,
    pub lines: Vec<CartLine>,
    pub date_required: NaiveDate,
    pub time_from: Option<NaiveTime>,
    pub time_to: Option<NaiveTime>,
    pub program: String,
    pub room: String,
    pub reason: Option<String>,
}

/// Mudança aplicada atomicamente às duas cópias (fila + log).
#[derive(Debug, Clone)]
pub struct RequisitionChange {
    pub lines: Vec<CartLine>,
    pub status: RequisitionStatus,
    pub closed_by: Option<String>,
}

// --- Metadados da submissão ---
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequisitionPayload {
    /// Chave de idempotência: repetir com o mesmo id não duplica a requisição.
    pub requisition_id: Option<Uuid>,

    pub date_required: Option<NaiveDate>,
    #[schema(value_type = Option<String>, example = "08:00:00")]
    pub time_from: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "10:00:00")]
    pub time_to: Option<NaiveTime>,
    pub program: Option<String>,
    pub room: Option<String>,

    #[validate(length(max = 500, message = "O motivo deve ter no máximo 500 caracteres."))]
    pub reason: Option<String>,
}

impl SubmitRequisitionPayload {
    /// Primeiro campo obrigatório ausente, na ordem data → programa → sala.
    pub fn first_missing_field(&self) -> Option<&'static str> {
        fn blank(value: &Option<String>) -> bool {
            value.as_deref().is_none_or(|v| v.trim().is_empty())
        }

        if self.date_required.is_none() {
            Some("dateRequired")
        } else if blank(&self.program) {
            Some("program")
        } else if blank(&self.room) {
            Some("room")
        } else {
            None
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RequisitionStatusQuery {
    pub status: Option<RequisitionStatus>,
}

/// Resposta da submissão: a requisição gravada e o que ficou para trás.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub requisition: Requisition,
    /// Linhas descartadas por metadados incompletos (continuam no carrinho).
    pub dropped_item_ids: Vec<Uuid>,
    /// Linhas consumidas que não puderam ser apagadas do carrinho.
    pub cleanup_failures: Vec<Uuid>,
    /// true quando a chamada repetiu uma submissão já gravada.
    pub replayed: bool,
}
