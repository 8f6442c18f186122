// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// Papéis emitidos pelo serviço de autenticação externo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Requestor,
    Reviewer,
    SuperAdmin,
}

/// Slugs de permissão usados nas respostas 403.
pub mod permissions {
    pub const REVIEW_REQUISITIONS: &str = "requisitions:review";
    pub const OWN_REQUISITIONS: &str = "requisitions:own";
}

// Quem está executando a operação (derivado do token)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub requestor_id: Uuid,
    pub display_name: String,
    pub role: Role,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,    // Subject (ID do solicitante)
    pub name: String, // Nome de exibição
    pub role: Role,
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

impl From<Claims> for Actor {
    fn from(claims: Claims) -> Self {
        Self {
            requestor_id: claims.sub,
            display_name: claims.name,
            role: claims.role,
        }
    }
}
