// src/db/requisition_repo.rs

use async_trait::async_trait;
use sqlx::{types::Json, PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::RequisitionStore,
    models::{
        cart::CartLine,
        requisition::{NewRequisition, Requisition, RequisitionChange, RequisitionStatus},
    },
};

// Colunas compartilhadas entre a fila e o log (as duas tabelas têm o mesmo formato).
const REQUISITION_COLUMNS: &str = "id, requestor_id, requestor_name, lines, date_required, \
     time_from, time_to, program, room, reason, status, version, closed_by, closed_at, submitted_at, pending_cleanup";

#[derive(Clone)]
pub struct RequisitionRepository {
    pool: PgPool,
}

impl RequisitionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Aplica a mudança à fila (com checagem de versão) e replica no log do solicitante.
/// Deve rodar dentro de uma transação aberta pelo chamador.
pub(crate) async fn apply_change(
    conn: &mut PgConnection,
    id: Uuid,
    expected_version: i32,
    change: &RequisitionChange,
) -> Result<Requisition, AppError> {
    // 1. Atualiza a fila global, só se ninguém mexeu desde a leitura
    let updated = sqlx::query_as::<_, Requisition>(
        r#"
        UPDATE requisition_queue
        SET lines = $3,
            status = $4,
            version = version + 1,
            closed_by = CASE WHEN $5 THEN $6 ELSE closed_by END,
            closed_at = CASE WHEN $5 THEN NOW() ELSE closed_at END
        WHERE id = $1 AND version = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(expected_version)
    .bind(Json(&change.lines))
    .bind(change.status)
    .bind(change.status.is_terminal())
    .bind(&change.closed_by)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(updated) = updated else {
        // 2. Nada atualizado: ou não existe, ou a versão mudou
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM requisition_queue WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;

        return Err(if exists {
            AppError::VersionConflict {
                entity: "requisition",
                id,
            }
        } else {
            AppError::RequisitionNotFound
        });
    };

    // 3. Espelha exatamente o mesmo estado no log do solicitante
    sqlx::query(
        r#"
        UPDATE requisition_log
        SET lines = $2, status = $3, version = $4, closed_by = $5, closed_at = $6
        WHERE id = $1
        "#,
    )
    .bind(updated.id)
    .bind(Json(&updated.lines))
    .bind(updated.status)
    .bind(updated.version)
    .bind(&updated.closed_by)
    .bind(updated.closed_at)
    .execute(&mut *conn)
    .await?;

    Ok(updated)
}

#[async_trait]
impl RequisitionStore for RequisitionRepository {
    async fn insert_requisition(
        &self,
        new: &NewRequisition,
    ) -> Result<Option<Requisition>, AppError> {
        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.pool.begin().await?;

        // 1. Fila global. Se o id já existe, é uma repetição da mesma submissão.
        let created = sqlx::query_as::<_, Requisition>(
            r#"
            INSERT INTO requisition_queue (
                id, requestor_id, requestor_name, lines, date_required,
                time_from, time_to, program, room, reason
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(new.id)
        .bind(new.requestor_id)
        .bind(&new.requestor_name)
        .bind(Json(&new.lines))
        .bind(new.date_required)
        .bind(new.time_from)
        .bind(new.time_to)
        .bind(&new.program)
        .bind(&new.room)
        .bind(&new.reason)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(created) = created else {
            tx.rollback().await?;
            return Ok(None);
        };

        // 2. Log do solicitante: cópia do que a fila gravou (mesmo id e timestamp)
        let log_insert = format!(
            "INSERT INTO requisition_log ({cols}) SELECT {cols} FROM requisition_queue WHERE id = $1",
            cols = REQUISITION_COLUMNS
        );
        sqlx::query(&log_insert)
            .bind(created.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        Ok(Some(created))
    }

    async fn find_requisition(&self, id: Uuid) -> Result<Option<Requisition>, AppError> {
        let requisition =
            sqlx::query_as::<_, Requisition>("SELECT * FROM requisition_queue WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(requisition)
    }

    async fn update_requisition(
        &self,
        id: Uuid,
        expected_version: i32,
        change: &RequisitionChange,
    ) -> Result<Requisition, AppError> {
        let mut tx = self.pool.begin().await?;
        let updated = apply_change(&mut tx, id, expected_version, change).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn set_pending_cleanup(&self, id: Uuid, lines: &[CartLine]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE requisition_queue SET pending_cleanup = $2 WHERE id = $1")
            .bind(id)
            .bind(Json(lines))
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::RequisitionNotFound);
        }

        sqlx::query("UPDATE requisition_log SET pending_cleanup = $2 WHERE id = $1")
            .bind(id)
            .bind(Json(lines))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_open(&self) -> Result<Vec<Requisition>, AppError> {
        let open = sqlx::query_as::<_, Requisition>(
            r#"
            SELECT * FROM requisition_queue
            WHERE status IN ('PENDING', 'PARTIALLY_APPROVED')
            ORDER BY submitted_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(open)
    }

    async fn list_requestor_log(
        &self,
        requestor_id: Uuid,
        status: Option<RequisitionStatus>,
    ) -> Result<Vec<Requisition>, AppError> {
        let log = sqlx::query_as::<_, Requisition>(
            r#"
            SELECT * FROM requisition_log
            WHERE requestor_id = $1
              AND ($2::requisition_status IS NULL OR status = $2)
            ORDER BY submitted_at DESC
            "#,
        )
        .bind(requestor_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(log)
    }
}
