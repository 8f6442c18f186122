// src/db/cart_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, db::store::CartStore, models::cart::CartLine};

// Espelho durável do carrinho: uma linha por (requestor_id, inventory_item_id).
#[derive(Clone)]
pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartStore for CartRepository {
    async fn load_cart(&self, requestor_id: Uuid) -> Result<Vec<CartLine>, AppError> {
        let lines = sqlx::query_as::<_, CartLine>(
            "SELECT * FROM cart_lines WHERE requestor_id = $1 ORDER BY created_at ASC",
        )
        .bind(requestor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    async fn insert_line(&self, requestor_id: Uuid, line: &CartLine) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO cart_lines (
                requestor_id, inventory_item_id, inventory_item_label, quantity_requested,
                category, room, status, condition, usage_type, department
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(requestor_id)
        .bind(line.inventory_item_id)
        .bind(&line.inventory_item_label)
        .bind(line.quantity_requested)
        .bind(&line.category)
        .bind(&line.room)
        .bind(&line.status)
        .bind(&line.condition)
        .bind(&line.usage_type)
        .bind(&line.department)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // A chave primária composta é quem garante a unicidade
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::DuplicateLine {
                        item_id: line.inventory_item_id,
                    };
                }
            }
            e.into()
        })?;
        Ok(())
    }

    async fn update_quantity(
        &self,
        requestor_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE cart_lines
            SET quantity_requested = $3, updated_at = NOW()
            WHERE requestor_id = $1 AND inventory_item_id = $2
            "#,
        )
        .bind(requestor_id)
        .bind(item_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_line(&self, requestor_id: Uuid, item_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM cart_lines WHERE requestor_id = $1 AND inventory_item_id = $2",
        )
        .bind(requestor_id)
        .bind(item_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
