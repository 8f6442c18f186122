// src/db/audit_repo.rs

use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::AuditStore,
    models::audit::{AuditLogEntry, NewAuditEntry},
};

// Histórico append-only: só INSERT e SELECT, nunca UPDATE/DELETE.
#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for AuditRepository {
    async fn append(&self, entry: &NewAuditEntry) -> Result<AuditLogEntry, AppError> {
        let written = sqlx::query_as::<_, AuditLogEntry>(
            r#"
            INSERT INTO audit_log (requestor_id, action, actor_name, related_lines)
            VALUES ($1, $2, $3, $4)
            RETURNING id, requestor_id, action, actor_name, related_lines, recorded_at AS timestamp
            "#,
        )
        .bind(entry.requestor_id)
        .bind(&entry.action)
        .bind(&entry.actor_name)
        .bind(Json(&entry.related_lines))
        .fetch_one(&self.pool)
        .await?;
        Ok(written)
    }

    async fn list_activity(&self, requestor_id: Uuid) -> Result<Vec<AuditLogEntry>, AppError> {
        // `seq` desempata entradas gravadas no mesmo instante
        let entries = sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT id, requestor_id, action, actor_name, related_lines, recorded_at AS timestamp
            FROM audit_log
            WHERE requestor_id = $1
            ORDER BY recorded_at DESC, seq DESC
            "#,
        )
        .bind(requestor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
