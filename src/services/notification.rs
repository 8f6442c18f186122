// src/services/notification.rs

use async_trait::async_trait;
use serde::Serialize;

use crate::common::error::AppError;

/// Mensagem entregue ao serviço externo de notificação (e-mail de recibo).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

// O serviço externo é opaco: recebe a mensagem e diz se deu certo.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), AppError>;
}

/// Notificador padrão: não entrega nada, só registra no log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<(), AppError> {
        tracing::info!(
            recipient = %notification.recipient,
            subject = %notification.subject,
            "📧 Notificação registrada"
        );
        Ok(())
    }
}
