// src/db/inventory_repo.rs

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, db::store::InventoryCatalog, models::inventory::InventoryItem};

// Leitura do catálogo mantido pelo subsistema de inventário.
#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grava a condição informada na devolução. Roda dentro da transação da devolução.
    pub(crate) async fn update_condition<'e, E>(
        executor: E,
        item_id: Uuid,
        condition: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE inventory_items SET condition = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(item_id)
        .bind(condition)
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl InventoryCatalog for InventoryRepository {
    async fn find_item(&self, id: Uuid) -> Result<Option<InventoryItem>, AppError> {
        let item = sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn list_items(&self, search: Option<&str>) -> Result<Vec<InventoryItem>, AppError> {
        // Busca vazia = catálogo inteiro
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let items = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT * FROM inventory_items
            WHERE $1::TEXT IS NULL
               OR name ILIKE $1
               OR item_code ILIKE $1
               OR category ILIKE $1
            ORDER BY name ASC
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }
}
