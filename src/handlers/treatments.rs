// src/handlers/treatments.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError, ErrorBody},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{PermResponsesRead, PermTreatmentsWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::treatment::{Treatment, TreatmentBoard, TreatmentStatus},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveTreatmentPayload {
    pub status: TreatmentStatus,

    /// Índice na coluna de destino; sem ele o cartão fica onde está ou vai para o fim da nova coluna
    #[validate(range(min = 0, message = "range"))]
    pub position: Option<i32>,

    #[validate(length(max = 2000, message = "too_long"))]
    pub notes: Option<String>,
}

// GET /api/tratativas
#[utoipa::path(
    get,
    path = "/api/tratativas",
    tag = "Treatments",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    responses((status = 200, description = "Quadro com as três colunas", body = TreatmentBoard)),
    security(("api_jwt" = []))
)]
pub async fn get_board(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermResponsesRead>,
) -> Result<impl IntoResponse, ApiError> {
    let board = app_state
        .treatment_service
        .board(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(board))
}

// PUT /api/tratativas/{id}
#[utoipa::path(
    put,
    path = "/api/tratativas/{id}",
    tag = "Treatments",
    request_body = MoveTreatmentPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Cartão movido", body = Treatment),
        (status = 404, description = "Tratativa não encontrada", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn move_treatment(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermTreatmentsWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MoveTreatmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let card = app_state
        .treatment_service
        .move_card(
            tenant.0,
            id,
            payload.status,
            payload.position,
            payload.notes.as_deref(),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(card))
}
