// src/handlers/requisitions.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        audit::{ActivityQuery, AuditLogEntry},
        overview::RequestRecord,
        requisition::{Requisition, RequisitionStatusQuery, SubmissionReceipt, SubmitRequisitionPayload},
    },
};

// ---
// Handler: submit
// ---
#[utoipa::path(
    post,
    path = "/api/requisitions",
    tag = "Requisitions",
    request_body = SubmitRequisitionPayload,
    responses(
        (status = 201, description = "Requisição criada a partir do carrinho", body = SubmissionReceipt),
        (status = 200, description = "Repetição: a requisição já existia", body = SubmissionReceipt),
        (status = 400, description = "Metadado obrigatório ausente"),
        (status = 422, description = "Carrinho vazio ou sem linhas válidas")
    ),
    security(("api_jwt" = []))
)]
pub async fn submit(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Json(payload): Json<SubmitRequisitionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let receipt = app_state.requisition_service.submit(&actor, payload).await?;

    let status = if receipt.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(receipt)))
}

#[utoipa::path(
    get,
    path = "/api/requisitions",
    tag = "Requisitions",
    params(RequisitionStatusQuery),
    responses(
        (status = 200, description = "Requisições do solicitante", body = Vec<Requisition>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_mine(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Query(query): Query<RequisitionStatusQuery>,
) -> Result<Json<Vec<Requisition>>, AppError> {
    let requisitions = app_state
        .requisition_service
        .list_mine(&actor, query.status)
        .await?;
    Ok(Json(requisitions))
}

#[utoipa::path(
    post,
    path = "/api/requisitions/{requisition_id}/cancel",
    tag = "Requisitions",
    params(
        ("requisition_id" = Uuid, Path, description = "ID da Requisição")
    ),
    responses(
        (status = 200, description = "Requisição cancelada", body = Requisition),
        (status = 403, description = "A requisição é de outro solicitante"),
        (status = 409, description = "A requisição já está encerrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(requisition_id): Path<Uuid>,
) -> Result<Json<Requisition>, AppError> {
    let cancelled = app_state
        .requisition_service
        .cancel(&actor, requisition_id)
        .await?;
    Ok(Json(cancelled))
}

#[utoipa::path(
    get,
    path = "/api/me/overview",
    tag = "Requisitions",
    responses(
        (status = 200, description = "Registros do solicitante em todas as etapas", body = Vec<RequestRecord>)
    ),
    security(("api_jwt" = []))
)]
pub async fn overview(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> Result<Json<Vec<RequestRecord>>, AppError> {
    let records = app_state.requisition_service.overview(&actor).await?;
    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/api/me/activity",
    tag = "Requisitions",
    params(ActivityQuery),
    responses(
        (status = 200, description = "Histórico do solicitante (mais recentes primeiro)", body = Vec<AuditLogEntry>)
    ),
    security(("api_jwt" = []))
)]
pub async fn activity(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<AuditLogEntry>>, AppError> {
    let entries = app_state
        .audit_service
        .activity(actor.requestor_id, query.search.as_deref())
        .await?;
    Ok(Json(entries))
}
