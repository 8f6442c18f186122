// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{MemoryStore, Stores},
    services::{
        auth::AuthService, notification::LogNotifier, ApprovalService, AuditService, CartService,
        ReconciliationService, RequisitionService,
    },
};

// --- Configuração (variáveis de ambiente) ---
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub approval_max_attempts: u32,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta a configuração a partir de qualquer fonte chave → valor.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = get("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .context("JWT_SECRET deve ser definido")?;

        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("DB_MAX_CONNECTIONS inválido: {}", raw))?,
            None => 5,
        };
        let approval_max_attempts = match get("APPROVAL_MAX_ATTEMPTS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("APPROVAL_MAX_ATTEMPTS inválido: {}", raw))?,
            None => 3,
        };

        Ok(Self {
            database_url: get("DATABASE_URL").filter(|s| !s.is_empty()),
            jwt_secret,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            db_max_connections,
            approval_max_attempts,
        })
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: Option<PgPool>,
    pub auth_service: AuthService,
    pub cart_service: CartService,
    pub requisition_service: RequisitionService,
    pub approval_service: ApprovalService,
    pub reconciliation_service: ReconciliationService,
    pub audit_service: AuditService,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let Some(database_url) = settings.database_url.as_deref() else {
            tracing::warn!("⚠️ DATABASE_URL não definida: usando armazenamento em memória (modo de desenvolvimento)");
            return Ok(Self::from_stores(
                Stores::shared(Arc::new(MemoryStore::new())),
                settings,
            ));
        };

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        sqlx::migrate!()
            .run(&db_pool)
            .await
            .context("Falha ao rodar as migrações do banco de dados")?;

        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

        let mut state = Self::from_stores(Stores::postgres(db_pool.clone()), settings);
        state.db_pool = Some(db_pool);
        Ok(state)
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_stores(stores: Stores, settings: &Settings) -> Self {
        let attempts = settings.approval_max_attempts;

        let audit_service = AuditService::new(stores.audit.clone(), Arc::new(LogNotifier));
        let cart_service = CartService::new(stores.carts.clone(), stores.catalog.clone());
        let requisition_service = RequisitionService::new(
            stores.requisitions.clone(),
            stores.borrows.clone(),
            cart_service.clone(),
            audit_service.clone(),
            attempts,
        );
        let approval_service = ApprovalService::new(
            stores.requisitions.clone(),
            stores.borrows.clone(),
            stores.catalog.clone(),
            audit_service.clone(),
            attempts,
        );
        let reconciliation_service =
            ReconciliationService::new(stores.borrows.clone(), audit_service.clone(), attempts);

        Self {
            db_pool: None,
            auth_service: AuthService::new(settings.jwt_secret.clone()),
            cart_service,
            requisition_service,
            approval_service,
            reconciliation_service,
            audit_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_the_secret_is_set() {
        let settings = Settings::from_lookup(lookup(&[("JWT_SECRET", "s3cr3t")])).unwrap();

        assert_eq!(settings.database_url, None);
        assert_eq!(settings.bind_addr, "0.0.0.0:3000");
        assert_eq!(settings.db_max_connections, 5);
        assert_eq!(settings.approval_max_attempts, 3);
    }

    #[test]
    fn missing_secret_fails() {
        assert!(Settings::from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn malformed_numbers_fail() {
        let result = Settings::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cr3t"),
            ("APPROVAL_MAX_ATTEMPTS", "three"),
        ]));
        assert!(result.is_err());
    }
}
