// src/models/inventory.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Identificador exibido quando o item não existe mais no catálogo.
pub const PLACEHOLDER_ITEM_CODE: &str = "N/A";

// --- Item do Catálogo ---
// Dados de referência, mantidos pelo subsistema administrativo de inventário.
// Este núcleo só lê (a única escrita é a condição informada na devolução).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: Uuid,
    #[schema(example = "MED-002")]
    pub item_code: String, // Identificador canônico de exibição
    #[schema(example = "Microscópio Binocular")]
    pub name: String,
    pub category: String,
    pub quantity_on_hand: i32,
    pub room: String,
    pub status: String,
    pub condition: String,
    pub usage_type: String,
    pub department: String,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Busca simples por nome, código ou categoria (sem diferenciar maiúsculas).
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&needle)
            || self.item_code.to_lowercase().contains(&needle)
            || self.category.to_lowercase().contains(&needle)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CatalogQuery {
    /// Filtro por nome, código ou categoria
    pub search: Option<String>,
}
