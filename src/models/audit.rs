// src/models/audit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::{borrow::NewReturnRecord, cart::CartLine};

/// Ações gravadas no histórico do solicitante.
pub mod actions {
    pub const REQUESTED: &str = "Requested Items";
    pub const APPROVED: &str = "Approved Items";
    pub const REJECTED: &str = "Rejected Request";
    pub const CANCELLED: &str = "Cancelled Request";
    pub const BORROWED: &str = "Borrowed Items";
    pub const RETURNED: &str = "Returned Items";
}

// Linha resumida anexada a uma entrada do histórico.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLine {
    pub inventory_item_id: Uuid,
    pub label: String,
    pub quantity: i32,
    pub condition: Option<String>,
}

impl From<&CartLine> for AuditLine {
    fn from(line: &CartLine) -> Self {
        Self {
            inventory_item_id: line.inventory_item_id,
            label: line.inventory_item_label.clone(),
            quantity: line.quantity_requested,
            condition: None,
        }
    }
}

impl From<&NewReturnRecord> for AuditLine {
    fn from(record: &NewReturnRecord) -> Self {
        Self {
            inventory_item_id: record.item_id,
            label: String::new(),
            quantity: record.returned_quantity,
            condition: Some(record.condition.clone()),
        }
    }
}

// --- Entrada do histórico (append-only) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub requestor_id: Uuid,
    #[schema(example = "Requested Items")]
    pub action: String,
    pub actor_name: String,
    #[sqlx(json)]
    pub related_lines: Vec<AuditLine>,
    pub timestamp: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        needle.is_empty()
            || self.action.to_lowercase().contains(&needle)
            || self.actor_name.to_lowercase().contains(&needle)
    }
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub requestor_id: Uuid,
    pub action: String,
    pub actor_name: String,
    pub related_lines: Vec<AuditLine>,
}

/// Falha de escrita no histórico, publicada no canal do operador.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFailure {
    pub requestor_id: Uuid,
    pub action: String,
    pub error: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityQuery {
    /// Busca por ação ou nome de quem executou
    pub search: Option<String>,
}
