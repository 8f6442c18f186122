// src/models/cart.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::inventory::InventoryItem;

// --- Linha do Carrinho ---
// Uma linha por (requestor_id, inventory_item_id). A unicidade é garantida
// tanto na cópia local quanto no espelho remoto (chave primária composta).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub inventory_item_id: Uuid,
    #[schema(example = "Microscópio Binocular")]
    pub inventory_item_label: String,
    #[schema(example = 2)]
    pub quantity_requested: i32,
    pub category: String,
    pub room: String,
    pub status: String,
    pub condition: String,
    pub usage_type: String,
    pub department: String,
}

impl CartLine {
    /// Copia os metadados do catálogo no momento da seleção.
    pub fn from_item(item: &InventoryItem, quantity: i32) -> Self {
        Self {
            inventory_item_id: item.id,
            inventory_item_label: item.name.clone(),
            quantity_requested: quantity,
            category: item.category.clone(),
            room: item.room.clone(),
            status: item.status.clone(),
            condition: item.condition.clone(),
            usage_type: item.usage_type.clone(),
            department: item.department.clone(),
        }
    }

    /// Campos obrigatórios ausentes (vazios) nesta linha.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let text_fields = [
            ("inventoryItemLabel", &self.inventory_item_label),
            ("category", &self.category),
            ("room", &self.room),
            ("status", &self.status),
            ("condition", &self.condition),
            ("usageType", &self.usage_type),
            ("department", &self.department),
        ];

        let mut missing: Vec<&'static str> = text_fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if self.quantity_requested < 1 {
            missing.push("quantityRequested");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddCartLinePayload {
    pub inventory_item_id: Uuid,

    // Se não vier no JSON, assume 1
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, message = "A quantidade deve ser no mínimo 1."))]
    #[schema(example = 1)]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuantityPayload {
    #[schema(example = 3)]
    pub quantity: i32,
}

/// Resultado de uma remoção: idempotente, mas informa se algo foi encontrado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveOutcome {
    pub inventory_item_id: Uuid,
    pub removed_local: bool,
    pub removed_remote: bool,
}

impl RemoveOutcome {
    pub fn found(&self) -> bool {
        self.removed_local || self.removed_remote
    }
}
