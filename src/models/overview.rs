// src/models/overview.rs

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{borrow::ApprovedSelection, cart::CartLine, requisition::Requisition};

// Um registro do solicitante em qualquer etapa do ciclo de vida.
// Cada variante carrega só os campos válidos para a sua etapa.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "stage", rename_all = "camelCase")]
pub enum RequestRecord {
    Cart(CartLine),
    Requisition(Requisition),
    ApprovedSelection(ApprovedSelection),
}

impl RequestRecord {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Cart(_) => "cart",
            Self::Requisition(_) => "requisition",
            Self::ApprovedSelection(_) => "approvedSelection",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn records_are_tagged_with_their_stage() {
        let line = CartLine {
            inventory_item_id: Uuid::new_v4(),
            inventory_item_label: "Pipette".into(),
            quantity_requested: 4,
            category: "Glassware".into(),
            room: "LAB-4".into(),
            status: "Available".into(),
            condition: "Good".into(),
            usage_type: "Consumable".into(),
            department: "NURSING".into(),
        };

        let record = RequestRecord::Cart(line);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(record.stage(), "cart");
        assert_eq!(json["stage"], "cart");
        assert_eq!(json["inventoryItemLabel"], "Pipette");
    }
}
