// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{permissions, Role},
};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;

    /// Papéis que recebem esta permissão.
    fn allows(role: Role) -> bool;
}

/// 2. O Extractor (Guardião)
pub struct RequirePermission<T>(pub PhantomData<T>);

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // A. Extrai o usuário (valida o token se ainda não foi validado)
        let AuthenticatedUser(actor) = AuthenticatedUser::from_request_parts(parts, state).await?;

        // B. Confere o papel
        if !T::allows(actor.role) {
            tracing::warn!(
                requestor_id = %actor.requestor_id,
                permission = T::slug(),
                "Acesso negado"
            );
            return Err(AppError::Forbidden {
                permission: T::slug(),
            });
        }

        Ok(RequirePermission(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermReviewRequisitions;
impl PermissionDef for PermReviewRequisitions {
    fn slug() -> &'static str { permissions::REVIEW_REQUISITIONS }

    fn allows(role: Role) -> bool {
        matches!(role, Role::Reviewer | Role::SuperAdmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_reviewers_and_admins_review() {
        assert!(PermReviewRequisitions::allows(Role::Reviewer));
        assert!(PermReviewRequisitions::allows(Role::SuperAdmin));
        assert!(!PermReviewRequisitions::allows(Role::Requestor));
    }
}
