// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::BTreeMap;

use serde_json::json;
use thiserror::Error;
use uuid::Uuid;
use validator::{ValidationErrors, ValidationErrorsKind};

// Um único tipo de erro para o motor inteiro, com `thiserror` para a ergonomia.
// Cada variante de negócio nomeia o campo ou a condição que falhou.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Campo obrigatório ausente: {field}")]
    MissingField { field: &'static str },

    #[error("O item {item_id} já está no carrinho")]
    DuplicateLine { item_id: Uuid },

    #[error("O carrinho está vazio")]
    EmptyCart,

    #[error("Nenhuma linha do carrinho tem os dados completos")]
    NoValidLines,

    #[error("Nenhuma linha selecionada está presente na requisição")]
    NoSelection,

    #[error("Não é possível {action}: {entity} está em {current}")]
    InvalidState {
        entity: &'static str,
        current: String,
        action: &'static str,
    },

    #[error("Devolução de {requested} excede o pendente ({outstanding}) do item {item_id}")]
    OverReturn {
        item_id: Uuid,
        requested: i32,
        outstanding: i32,
    },

    #[error("Quantidade inválida ({quantity}) para o item {item_id}")]
    InvalidQuantity { item_id: Uuid, quantity: i32 },

    #[error("O item {item_id} não faz parte da seleção aprovada")]
    ItemNotInSelection { item_id: Uuid },

    #[error("Requisição não encontrada")]
    RequisitionNotFound,

    #[error("Seleção aprovada não encontrada")]
    SelectionNotFound,

    #[error("Linha do carrinho não encontrada")]
    CartLineNotFound,

    #[error("Item de inventário não encontrado")]
    InventoryItemNotFound,

    #[error("Conflito de versão em {entity} {id}")]
    VersionConflict { entity: &'static str, id: Uuid },

    #[error("Permissão '{permission}' necessária")]
    Forbidden { permission: &'static str },

    #[error("Token inválido")]
    InvalidToken,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Falha de persistência: {0}")]
    PersistenceError(String),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// Falhas do armazenamento remoto: o cliente pode repetir com a mesma chave.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DatabaseError(_) | Self::PersistenceError(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) | Self::MissingField { .. } => StatusCode::BAD_REQUEST,
            Self::DuplicateLine { .. }
            | Self::NoSelection
            | Self::InvalidState { .. }
            | Self::VersionConflict { .. } => StatusCode::CONFLICT,
            Self::EmptyCart
            | Self::NoValidLines
            | Self::OverReturn { .. }
            | Self::InvalidQuantity { .. }
            | Self::ItemNotInSelection { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RequisitionNotFound
            | Self::SelectionNotFound
            | Self::CartLineNotFound
            | Self::InventoryItemNotFound => StatusCode::NOT_FOUND,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::DatabaseError(_) | Self::PersistenceError(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Código estável para o cliente distinguir os casos sem ler a mensagem.
    fn code(&self) -> &'static str {
        match self {
            Self::ValidationError(_) | Self::MissingField { .. } => "VALIDATION_ERROR",
            Self::DuplicateLine { .. } => "DUPLICATE_LINE",
            Self::EmptyCart => "EMPTY_CART",
            Self::NoValidLines => "NO_VALID_LINES",
            Self::NoSelection => "NO_SELECTION",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::OverReturn { .. } => "OVER_RETURN",
            Self::InvalidQuantity { .. } => "INVALID_QUANTITY",
            Self::ItemNotInSelection { .. } => "ITEM_NOT_IN_SELECTION",
            Self::RequisitionNotFound
            | Self::SelectionNotFound
            | Self::CartLineNotFound
            | Self::InventoryItemNotFound => "NOT_FOUND",
            Self::VersionConflict { .. } => "VERSION_CONFLICT",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::DatabaseError(_) | Self::PersistenceError(_) => "PERSISTENCE_ERROR",
            Self::InternalServerError(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        let body = match &self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => json!({
                "error": "Um ou mais campos são inválidos.",
                "code": code,
                "details": validation_details(errors),
            }),
            AppError::MissingField { field } => json!({
                "error": format!("O campo '{}' é obrigatório.", field),
                "code": code,
                "details": { "field": field },
            }),
            AppError::DuplicateLine { item_id } | AppError::ItemNotInSelection { item_id } => json!({
                "error": self.to_string(),
                "code": code,
                "details": { "itemId": item_id },
            }),
            AppError::OverReturn { item_id, requested, outstanding } => json!({
                "error": self.to_string(),
                "code": code,
                "details": {
                    "itemId": item_id,
                    "requested": requested,
                    "outstanding": outstanding,
                },
            }),
            AppError::InvalidQuantity { item_id, quantity } => json!({
                "error": self.to_string(),
                "code": code,
                "details": { "itemId": item_id, "quantity": quantity },
            }),
            AppError::InvalidState { entity, current, action } => json!({
                "error": self.to_string(),
                "code": code,
                "details": { "entity": entity, "current": current, "action": action },
            }),

            // Erros de infraestrutura: o detalhe vai para o log, não para o cliente.
            e @ (AppError::DatabaseError(_) | AppError::PersistenceError(_)) => {
                tracing::error!("Falha de persistência: {}", e);
                json!({
                    "error": "O armazenamento está indisponível. Tente novamente.",
                    "code": code,
                    "retryable": true,
                })
            }
            e @ AppError::InternalServerError(_) => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                json!({ "error": "Ocorreu um erro inesperado.", "code": code })
            }

            e => json!({ "error": e.to_string(), "code": code }),
        };

        (status, Json(body)).into_response()
    }
}

/// Achata os erros do `validator`, incluindo structs e listas aninhadas,
/// em chaves como `returns[0].condition`.
pub fn validation_details(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    let mut details = BTreeMap::new();
    collect_details("", errors, &mut details);
    details
}

fn collect_details(prefix: &str, errors: &ValidationErrors, out: &mut BTreeMap<String, Vec<String>>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                let messages = field_errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                out.insert(path, messages);
            }
            ValidationErrorsKind::Struct(nested) => collect_details(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_details(&format!("{}[{}]", path, index), nested, out);
                }
            }
        }
    }
}
