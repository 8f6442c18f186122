// src/services/audit_service.rs

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::AuditStore,
    models::audit::{AuditFailure, AuditLine, AuditLogEntry, NewAuditEntry},
    services::notification::{Notification, Notifier},
};

const ALERT_CAPACITY: usize = 256;

// Escritor do histórico. A gravação é best-effort: uma falha aqui nunca desfaz
// a operação de negócio, mas vai para o log (target "audit") e para o canal do operador.
#[derive(Clone)]
pub struct AuditService {
    store: Arc<dyn AuditStore>,
    notifier: Arc<dyn Notifier>,
    alerts: broadcast::Sender<AuditFailure>,
}

impl AuditService {
    pub fn new(store: Arc<dyn AuditStore>, notifier: Arc<dyn Notifier>) -> Self {
        let (alerts, _) = broadcast::channel(ALERT_CAPACITY);
        Self {
            store,
            notifier,
            alerts,
        }
    }

    /// Canal do operador com as falhas de escrita do histórico.
    pub fn subscribe(&self) -> broadcast::Receiver<AuditFailure> {
        self.alerts.subscribe()
    }

    /// Grava uma entrada no histórico do solicitante. Nunca retorna erro.
    pub async fn record(
        &self,
        requestor_id: Uuid,
        actor_name: &str,
        action: &str,
        related_lines: Vec<AuditLine>,
    ) -> Option<AuditLogEntry> {
        let entry = NewAuditEntry {
            requestor_id,
            action: action.to_string(),
            actor_name: actor_name.to_string(),
            related_lines,
        };

        match self.store.append(&entry).await {
            Ok(written) => {
                self.send_receipt(&written);
                Some(written)
            }
            Err(e) => {
                tracing::error!(
                    target: "audit",
                    requestor_id = %requestor_id,
                    action = %action,
                    error = %e,
                    "🔥 Falha ao gravar o histórico"
                );
                // Sem inscritos o envio falha; o log acima já registrou.
                let _ = self.alerts.send(AuditFailure {
                    requestor_id,
                    action: action.to_string(),
                    error: e.to_string(),
                    occurred_at: Utc::now(),
                });
                None
            }
        }
    }

    /// Histórico do solicitante, do mais recente para o mais antigo.
    pub async fn activity(
        &self,
        requestor_id: Uuid,
        search: Option<&str>,
    ) -> Result<Vec<AuditLogEntry>, AppError> {
        let entries = self.store.list_activity(requestor_id).await?;
        Ok(match search {
            Some(needle) => entries.into_iter().filter(|e| e.matches(needle)).collect(),
            None => entries,
        })
    }

    // Recibo por e-mail: dispara e esquece.
    fn send_receipt(&self, entry: &AuditLogEntry) {
        let notifier = self.notifier.clone();
        let notification = Notification {
            recipient: entry.requestor_id.to_string(),
            subject: entry.action.clone(),
            body: format!(
                "{} por {} em {} ({} item(ns)).",
                entry.action,
                entry.actor_name,
                entry.timestamp.format("%Y-%m-%d %H:%M"),
                entry.related_lines.len()
            ),
        };

        tokio::spawn(async move {
            if let Err(e) = notifier.send(notification).await {
                tracing::warn!(error = %e, "Falha ao enviar notificação");
            }
        });
    }
}

/// Drena o canal do operador para o log até o canal fechar.
pub async fn run_alert_drain(mut receiver: broadcast::Receiver<AuditFailure>) {
    loop {
        match receiver.recv().await {
            Ok(failure) => {
                tracing::error!(
                    target: "audit",
                    requestor_id = %failure.requestor_id,
                    action = %failure.action,
                    "🚨 Alerta de operador: histórico não gravado ({})",
                    failure.error
                );
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "Canal de alertas do histórico atrasado");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
