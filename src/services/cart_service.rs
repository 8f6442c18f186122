// src/services/cart_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CartStore, InventoryCatalog},
    models::{
        cart::{CartLine, RemoveOutcome},
        inventory::InventoryItem,
    },
};

// --- Carrinho de uma sessão ---
// Cópia local + espelho remoto. O espelho é a fonte da verdade: toda sessão
// começa reidratada a partir dele e toda edição local só fica se o espelho aceitar.
pub struct CartManager {
    requestor_id: Uuid,
    store: Arc<dyn CartStore>,
    lines: Vec<CartLine>,
}

impl CartManager {
    /// Reconstrói o carrinho a partir do espelho remoto.
    pub async fn rehydrate(store: Arc<dyn CartStore>, requestor_id: Uuid) -> Result<Self, AppError> {
        let lines = store.load_cart(requestor_id).await?;
        Ok(Self {
            requestor_id,
            store,
            lines,
        })
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    fn position(&self, item_id: Uuid) -> Option<usize> {
        self.lines.iter().position(|l| l.inventory_item_id == item_id)
    }

    pub async fn add_line(&mut self, item: &InventoryItem, quantity: i32) -> Result<&[CartLine], AppError> {
        if quantity < 1 {
            return Err(AppError::InvalidQuantity {
                item_id: item.id,
                quantity,
            });
        }
        if self.position(item.id).is_some() {
            return Err(AppError::DuplicateLine { item_id: item.id });
        }

        // O espelho primeiro: a chave composta barra duplicatas de outra sessão
        let line = CartLine::from_item(item, quantity);
        self.store.insert_line(self.requestor_id, &line).await?;
        self.lines.push(line);

        tracing::info!(requestor_id = %self.requestor_id, item_id = %item.id, "Item adicionado ao carrinho");
        Ok(&self.lines)
    }

    pub async fn update_quantity(&mut self, item_id: Uuid, quantity: i32) -> Result<&[CartLine], AppError> {
        if quantity < 1 {
            return Err(AppError::InvalidQuantity { item_id, quantity });
        }
        let index = self.position(item_id).ok_or(AppError::CartLineNotFound)?;

        let previous = self.lines[index].quantity_requested;
        self.lines[index].quantity_requested = quantity;

        // Se o espelho não aceitar, a cópia local volta ao valor anterior
        let mirrored = match self.store.update_quantity(self.requestor_id, item_id, quantity).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(AppError::CartLineNotFound),
            Err(e) => Err(e),
        };
        if let Err(e) = mirrored {
            self.lines[index].quantity_requested = previous;
            tracing::warn!(
                requestor_id = %self.requestor_id,
                item_id = %item_id,
                error = %e,
                "Espelho recusou a quantidade; cópia local revertida"
            );
            return Err(e);
        }

        Ok(&self.lines)
    }

    /// Idempotente: só informa se havia algo para remover.
    pub async fn remove_line(&mut self, item_id: Uuid) -> Result<RemoveOutcome, AppError> {
        let removed = self.position(item_id).map(|index| (index, self.lines.remove(index)));

        let removed_remote = match self.store.delete_line(self.requestor_id, item_id).await {
            Ok(found) => found,
            Err(e) => {
                if let Some((index, line)) = removed {
                    self.lines.insert(index, line);
                }
                return Err(e);
            }
        };

        let outcome = RemoveOutcome {
            inventory_item_id: item_id,
            removed_local: removed.is_some(),
            removed_remote,
        };
        if !outcome.found() {
            tracing::warn!(requestor_id = %self.requestor_id, item_id = %item_id, "Remoção sem efeito: linha não encontrada");
        }
        Ok(outcome)
    }

    /// Apaga linhas consumidas por uma submissão. Best-effort por linha:
    /// uma falha não impede as outras e volta na lista de retorno.
    pub async fn consume(&mut self, item_ids: &[Uuid]) -> Vec<Uuid> {
        let mut failures = Vec::new();

        for item_id in item_ids {
            match self.store.delete_line(self.requestor_id, *item_id).await {
                Ok(_) => self.lines.retain(|l| l.inventory_item_id != *item_id),
                Err(e) => {
                    tracing::warn!(
                        requestor_id = %self.requestor_id,
                        item_id = %item_id,
                        error = %e,
                        "Falha ao limpar linha consumida do carrinho"
                    );
                    failures.push(*item_id);
                }
            }
        }
        failures
    }
}

// --- Serviço ---
// Cada requisição HTTP abre o carrinho reidratado e aplica uma única operação.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CartStore>,
    catalog: Arc<dyn InventoryCatalog>,
}

impl CartService {
    pub fn new(store: Arc<dyn CartStore>, catalog: Arc<dyn InventoryCatalog>) -> Self {
        Self { store, catalog }
    }

    pub async fn open(&self, requestor_id: Uuid) -> Result<CartManager, AppError> {
        CartManager::rehydrate(self.store.clone(), requestor_id).await
    }

    pub async fn browse_catalog(&self, search: Option<&str>) -> Result<Vec<InventoryItem>, AppError> {
        self.catalog.list_items(search).await
    }

    pub async fn add_item(
        &self,
        requestor_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<Vec<CartLine>, AppError> {
        let item = self
            .catalog
            .find_item(item_id)
            .await?
            .ok_or(AppError::InventoryItemNotFound)?;

        let mut cart = self.open(requestor_id).await?;
        cart.add_line(&item, quantity).await?;
        Ok(cart.into_lines())
    }

    pub async fn update_quantity(
        &self,
        requestor_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<Vec<CartLine>, AppError> {
        let mut cart = self.open(requestor_id).await?;
        cart.update_quantity(item_id, quantity).await?;
        Ok(cart.into_lines())
    }

    pub async fn remove_item(&self, requestor_id: Uuid, item_id: Uuid) -> Result<RemoveOutcome, AppError> {
        let mut cart = self.open(requestor_id).await?;
        cart.remove_line(item_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use assert_matches::assert_matches;
    use chrono::Utc;

    fn item(name: &str) -> InventoryItem {
        InventoryItem {
            id: Uuid::new_v4(),
            item_code: format!("LAB-{}", name.len()),
            name: name.into(),
            category: "Glassware".into(),
            quantity_on_hand: 10,
            room: "LAB-1".into(),
            status: "Available".into(),
            condition: "Good".into(),
            usage_type: "Laboratory".into(),
            department: "MEDTECH".into(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn second_add_of_same_item_is_a_duplicate() {
        let store = Arc::new(MemoryStore::new());
        let requestor = Uuid::new_v4();
        let beaker = item("Beaker");

        let mut cart = CartManager::rehydrate(store.clone(), requestor).await.unwrap();
        cart.add_line(&beaker, 2).await.unwrap();

        let second = cart.add_line(&beaker, 1).await;
        assert_matches!(second, Err(AppError::DuplicateLine { item_id }) if item_id == beaker.id);
        assert_eq!(cart.lines().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_from_another_session_is_caught_by_the_mirror() {
        let store = Arc::new(MemoryStore::new());
        let requestor = Uuid::new_v4();
        let flask = item("Flask");

        let mut first = CartManager::rehydrate(store.clone(), requestor).await.unwrap();
        let mut stale = CartManager::rehydrate(store.clone(), requestor).await.unwrap();
        first.add_line(&flask, 1).await.unwrap();

        assert_matches!(stale.add_line(&flask, 1).await, Err(AppError::DuplicateLine { .. }));
        assert!(stale.lines().is_empty());
        assert_eq!(store.load_cart(requestor).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rehydrate_reads_the_mirror() {
        let store = Arc::new(MemoryStore::new());
        let requestor = Uuid::new_v4();

        let mut cart = CartManager::rehydrate(store.clone(), requestor).await.unwrap();
        cart.add_line(&item("Pipette"), 3).await.unwrap();
        drop(cart);

        let restored = CartManager::rehydrate(store, requestor).await.unwrap();
        assert_eq!(restored.lines().len(), 1);
        assert_eq!(restored.lines()[0].quantity_requested, 3);
    }

    #[tokio::test]
    async fn quantity_below_one_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let mut cart = CartManager::rehydrate(store, Uuid::new_v4()).await.unwrap();
        let tube = item("Tube");
        cart.add_line(&tube, 1).await.unwrap();

        assert_matches!(
            cart.update_quantity(tube.id, 0).await,
            Err(AppError::InvalidQuantity { quantity: 0, .. })
        );
        assert_eq!(cart.lines()[0].quantity_requested, 1);
    }

    #[tokio::test]
    async fn removing_a_missing_line_reports_nothing_found() {
        let store = Arc::new(MemoryStore::new());
        let mut cart = CartManager::rehydrate(store, Uuid::new_v4()).await.unwrap();

        let outcome = cart.remove_line(Uuid::new_v4()).await.unwrap();
        assert!(!outcome.found());
    }
}
