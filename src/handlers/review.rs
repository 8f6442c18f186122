// src/handlers/review.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{PermReviewRequisitions, RequirePermission},
    },
    models::{
        borrow::{ApprovalOutcome, ApprovePayload},
        requisition::Requisition,
    },
};

#[utoipa::path(
    get,
    path = "/api/review/queue",
    tag = "Review",
    responses(
        (status = 200, description = "Requisições abertas (mais antigas primeiro)", body = Vec<Requisition>),
        (status = 403, description = "Requer a permissão requisitions:review")
    ),
    security(("api_jwt" = []))
)]
pub async fn queue(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermReviewRequisitions>,
) -> Result<Json<Vec<Requisition>>, AppError> {
    let open = app_state.approval_service.queue().await?;
    Ok(Json(open))
}

#[utoipa::path(
    post,
    path = "/api/review/requisitions/{requisition_id}/approve",
    tag = "Review",
    request_body = ApprovePayload,
    params(
        ("requisition_id" = Uuid, Path, description = "ID da Requisição")
    ),
    responses(
        (status = 201, description = "Seleção aprovada criada", body = ApprovalOutcome),
        (status = 200, description = "Repetição: a seleção já existia", body = ApprovalOutcome),
        (status = 409, description = "Nenhuma linha selecionada está na requisição")
    ),
    security(("api_jwt" = []))
)]
pub async fn approve(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermReviewRequisitions>,
    AuthenticatedUser(reviewer): AuthenticatedUser,
    Path(requisition_id): Path<Uuid>,
    Json(payload): Json<ApprovePayload>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = app_state
        .approval_service
        .approve(&reviewer, requisition_id, payload)
        .await?;

    let status = if outcome.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(outcome)))
}

#[utoipa::path(
    post,
    path = "/api/review/requisitions/{requisition_id}/reject",
    tag = "Review",
    params(
        ("requisition_id" = Uuid, Path, description = "ID da Requisição")
    ),
    responses(
        (status = 200, description = "Requisição devolvida ao solicitante", body = Requisition),
        (status = 409, description = "A requisição já está encerrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermReviewRequisitions>,
    AuthenticatedUser(reviewer): AuthenticatedUser,
    Path(requisition_id): Path<Uuid>,
) -> Result<Json<Requisition>, AppError> {
    let rejected = app_state
        .approval_service
        .reject(&reviewer, requisition_id)
        .await?;
    Ok(Json(rejected))
}
