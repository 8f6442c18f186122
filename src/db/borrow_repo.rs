// src/db/borrow_repo.rs

use async_trait::async_trait;
use sqlx::{types::Json, PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{inventory_repo::InventoryRepository, requisition_repo, store::BorrowStore},
    models::{
        borrow::{ApprovedSelection, NewApprovedSelection, NewReturnRecord, ReturnRecord, SelectionStatus},
        requisition::{Requisition, RequisitionChange},
    },
};

#[derive(Clone)]
pub struct BorrowRepository {
    pool: PgPool,
}

impl BorrowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// UPDATE com checagem de versão; distingue "não existe" de "versão mudou".
async fn update_selection_status(
    conn: &mut PgConnection,
    id: Uuid,
    expected_version: i32,
    status: SelectionStatus,
) -> Result<ApprovedSelection, AppError> {
    let updated = sqlx::query_as::<_, ApprovedSelection>(
        r#"
        UPDATE approved_selections
        SET status = $3,
            version = version + 1,
            borrowed_at = CASE WHEN $3 = 'BORROWED'::selection_status THEN COALESCE(borrowed_at, NOW()) ELSE borrowed_at END,
            returned_at = CASE WHEN $3 = 'RETURNED'::selection_status THEN COALESCE(returned_at, NOW()) ELSE returned_at END
        WHERE id = $1 AND version = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(expected_version)
    .bind(status)
    .fetch_optional(&mut *conn)
    .await?;

    match updated {
        Some(selection) => Ok(selection),
        None => {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM approved_selections WHERE id = $1)",
            )
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;

            Err(if exists {
                AppError::VersionConflict {
                    entity: "selection",
                    id,
                }
            } else {
                AppError::SelectionNotFound
            })
        }
    }
}

#[async_trait]
impl BorrowStore for BorrowRepository {
    async fn find_selection(&self, id: Uuid) -> Result<Option<ApprovedSelection>, AppError> {
        let selection =
            sqlx::query_as::<_, ApprovedSelection>("SELECT * FROM approved_selections WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(selection)
    }

    async fn commit_approval(
        &self,
        selection: &NewApprovedSelection,
        expected_version: i32,
        change: &RequisitionChange,
    ) -> Result<(ApprovedSelection, Requisition), AppError> {
        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.pool.begin().await?;

        // 1. A seleção aprovada é gravada antes de podar a requisição
        let created = sqlx::query_as::<_, ApprovedSelection>(
            r#"
            INSERT INTO approved_selections (
                id, requisition_id, requestor_id, requestor_name, approved_lines, approved_by
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(selection.id)
        .bind(selection.requisition_id)
        .bind(selection.requestor_id)
        .bind(&selection.requestor_name)
        .bind(Json(&selection.approved_lines))
        .bind(&selection.approved_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            // Outra sessão gravou a mesma chave: o chamador relê e devolve a existente
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::VersionConflict {
                        entity: "selection",
                        id: selection.id,
                    };
                }
            }
            e.into()
        })?;

        // 2. Poda as linhas aprovadas (fila + log), com checagem de versão.
        // Se falhar, o drop do `tx` desfaz o passo 1.
        let requisition =
            requisition_repo::apply_change(&mut tx, selection.requisition_id, expected_version, change)
                .await?;

        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        Ok((created, requisition))
    }

    async fn set_selection_status(
        &self,
        id: Uuid,
        expected_version: i32,
        status: SelectionStatus,
    ) -> Result<ApprovedSelection, AppError> {
        let mut conn = self.pool.acquire().await?;
        update_selection_status(&mut conn, id, expected_version, status).await
    }

    async fn record_returns(
        &self,
        selection_id: Uuid,
        expected_version: i32,
        records: &[NewReturnRecord],
        status: SelectionStatus,
    ) -> Result<(ApprovedSelection, Vec<ReturnRecord>), AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Versão primeiro: duas devoluções simultâneas não passam juntas
        let selection = update_selection_status(&mut tx, selection_id, expected_version, status).await?;

        // 2. Registros de devolução + condição no catálogo
        let mut written = Vec::with_capacity(records.len());
        for record in records {
            let row = sqlx::query_as::<_, ReturnRecord>(
                r#"
                INSERT INTO return_records (selection_id, requestor_id, item_id, returned_quantity, condition)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
            )
            .bind(selection_id)
            .bind(selection.requestor_id)
            .bind(record.item_id)
            .bind(record.returned_quantity)
            .bind(&record.condition)
            .fetch_one(&mut *tx)
            .await?;

            InventoryRepository::update_condition(&mut *tx, record.item_id, &record.condition).await?;
            written.push(row);
        }

        tx.commit().await?;
        Ok((selection, written))
    }

    async fn list_returns(&self, selection_id: Uuid) -> Result<Vec<ReturnRecord>, AppError> {
        let records = sqlx::query_as::<_, ReturnRecord>(
            "SELECT * FROM return_records WHERE selection_id = $1 ORDER BY date_returned ASC",
        )
        .bind(selection_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn list_selections(
        &self,
        status: Option<SelectionStatus>,
    ) -> Result<Vec<ApprovedSelection>, AppError> {
        let selections = sqlx::query_as::<_, ApprovedSelection>(
            r#"
            SELECT * FROM approved_selections
            WHERE ($1::selection_status IS NULL OR status = $1)
            ORDER BY approved_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(selections)
    }

    async fn list_requestor_selections(
        &self,
        requestor_id: Uuid,
    ) -> Result<Vec<ApprovedSelection>, AppError> {
        let selections = sqlx::query_as::<_, ApprovedSelection>(
            "SELECT * FROM approved_selections WHERE requestor_id = $1 ORDER BY approved_at DESC",
        )
        .bind(requestor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(selections)
    }
}
