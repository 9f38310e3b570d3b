// src/handlers/attendants.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::{ApiError, AppError, ErrorBody},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermAttendantsRead, PermAttendantsWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::attendant::{Attendant, AttendantGoal, AttendantPerformance, BonusAward, GoalPeriod},
};

// ---
// Validações
// ---
pub(crate) fn validate_not_blank(val: &str) -> Result<(), ValidationError> {
    if val.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("required".into());
        return Err(err);
    }
    Ok(())
}

fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        return Err(err);
    }
    Ok(())
}

fn validate_nps_target(val: i32) -> Result<(), ValidationError> {
    if !(-100..=100).contains(&val) {
        return Err(ValidationError::new("range"));
    }
    Ok(())
}

fn default_true() -> bool {
    true
}

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendantPayload {
    #[validate(custom(function = "validate_not_blank"), length(max = 120, message = "too_long"))]
    #[schema(example = "Carlos Garçom")]
    pub name: String,

    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,

    #[validate(length(max = 20, message = "invalid_phone"))]
    pub phone: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GoalPayload {
    pub period: GoalPeriod,

    #[validate(range(min = 1, message = "range"))]
    #[schema(example = 40)]
    pub target_responses: i32,

    #[validate(custom(function = "validate_nps_target"))]
    #[schema(example = 70)]
    pub target_nps: i32,

    #[validate(custom(function = "validate_not_negative"))]
    #[schema(value_type = f64, example = 150.0)]
    pub bonus_amount: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwardPayload {
    #[schema(value_type = String, format = Date, example = "2025-03-15")]
    pub reference_date: NaiveDate,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActiveFilter {
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PerformanceQuery {
    /// Qualquer dia do período desejado (padrão: hoje)
    #[param(value_type = Option<String>, format = Date)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AwardFilter {
    pub attendant_id: Option<Uuid>,
}

// ---
// CRUD
// ---

#[utoipa::path(
    get,
    path = "/api/atendentes",
    tag = "Attendants",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ActiveFilter),
    responses((status = 200, description = "Atendentes", body = Vec<Attendant>)),
    security(("api_jwt" = []))
)]
pub async fn list_attendants(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermAttendantsRead>,
    Query(filter): Query<ActiveFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let attendants = app_state
        .attendant_service
        .list(tenant.0, filter.active)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(attendants))
}

#[utoipa::path(
    get,
    path = "/api/atendentes/{id}",
    tag = "Attendants",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Atendente", body = Attendant),
        (status = 404, description = "Não encontrado", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_attendant(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermAttendantsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let attendant = app_state
        .attendant_service
        .get(tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(attendant))
}

#[utoipa::path(
    post,
    path = "/api/atendentes",
    tag = "Attendants",
    request_body = AttendantPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    responses(
        (status = 201, description = "Atendente criado", body = Attendant),
        (status = 400, description = "Nome obrigatório", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_attendant(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermAttendantsWrite>,
    Json(payload): Json<AttendantPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let attendant = app_state
        .attendant_service
        .create(tenant.0, &payload.name, payload.email.as_deref(), payload.phone.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(attendant)))
}

#[utoipa::path(
    put,
    path = "/api/atendentes/{id}",
    tag = "Attendants",
    request_body = AttendantPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Atendente atualizado", body = Attendant),
        (status = 400, description = "Nome obrigatório", body = ErrorBody),
        (status = 404, description = "Não encontrado", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_attendant(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermAttendantsWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AttendantPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let attendant = app_state
        .attendant_service
        .update(
            tenant.0,
            id,
            &payload.name,
            payload.email.as_deref(),
            payload.phone.as_deref(),
            payload.is_active,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(attendant))
}

#[utoipa::path(
    delete,
    path = "/api/atendentes/{id}",
    tag = "Attendants",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 204, description = "Removido"),
        (status = 404, description = "Não encontrado", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_attendant(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermAttendantsWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .attendant_service
        .delete(tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// ---
// Meta
// ---

#[utoipa::path(
    get,
    path = "/api/atendentes/{id}/meta",
    tag = "Attendants",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Meta do atendente", body = AttendantGoal),
        (status = 404, description = "Sem meta cadastrada", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_goal(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermAttendantsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let goal = app_state
        .attendant_service
        .get_goal(tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(goal))
}

#[utoipa::path(
    put,
    path = "/api/atendentes/{id}/meta",
    tag = "Attendants",
    request_body = GoalPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses((status = 200, description = "Meta salva", body = AttendantGoal)),
    security(("api_jwt" = []))
)]
pub async fn put_goal(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermAttendantsWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GoalPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let goal = app_state
        .attendant_service
        .set_goal(
            tenant.0,
            id,
            payload.period,
            payload.target_responses,
            payload.target_nps,
            payload.bonus_amount,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(goal))
}

// ---
// Desempenho e premiações
// ---

#[utoipa::path(
    get,
    path = "/api/atendentes/{id}/desempenho",
    tag = "Attendants",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path), PerformanceQuery),
    responses((status = 200, description = "Desempenho no período", body = AttendantPerformance)),
    security(("api_jwt" = []))
)]
pub async fn get_performance(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermAttendantsRead>,
    Path(id): Path<Uuid>,
    Query(query): Query<PerformanceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let performance = app_state
        .attendant_service
        .performance(tenant.0, id, date)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(performance))
}

#[utoipa::path(
    post,
    path = "/api/atendentes/{id}/premiacoes",
    tag = "Attendants",
    request_body = AwardPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 201, description = "Premiação registrada", body = BonusAward),
        (status = 409, description = "Período já premiado", body = ErrorBody),
        (status = 422, description = "Meta não atingida", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn award_bonus(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermAttendantsWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AwardPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let award = app_state
        .attendant_service
        .award_bonus(tenant.0, id, payload.reference_date, user.0.id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(award)))
}

#[utoipa::path(
    get,
    path = "/api/atendentes/{id}/premiacoes",
    tag = "Attendants",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses((status = 200, description = "Histórico do atendente", body = Vec<BonusAward>)),
    security(("api_jwt" = []))
)]
pub async fn list_attendant_awards(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermAttendantsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let awards = app_state
        .attendant_service
        .list_awards(tenant.0, Some(id))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(awards))
}

#[utoipa::path(
    get,
    path = "/api/premiacoes",
    tag = "Attendants",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), AwardFilter),
    responses((status = 200, description = "Histórico de premiações", body = Vec<BonusAward>)),
    security(("api_jwt" = []))
)]
pub async fn list_awards(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermAttendantsRead>,
    Query(filter): Query<AwardFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let awards = app_state
        .attendant_service
        .list_awards(tenant.0, filter.attendant_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(awards))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(name: &str) -> AttendantPayload {
        AttendantPayload {
            name: name.to_string(),
            email: None,
            phone: None,
            is_active: true,
        }
    }

    #[test]
    fn empty_or_whitespace_name_is_rejected() {
        for name in ["", "   ", "\t"] {
            let errors = payload(name).validate().unwrap_err();
            assert!(errors.field_errors().contains_key("name"), "nome {name:?} deveria falhar");
        }
    }

    #[test]
    fn regular_name_passes() {
        assert!(payload("Carlos").validate().is_ok());
    }

    #[test]
    fn goal_rejects_negative_bonus_and_out_of_range_nps() {
        let goal = GoalPayload {
            period: GoalPeriod::Monthly,
            target_responses: 10,
            target_nps: 150,
            bonus_amount: Decimal::new(-1, 0),
        };
        let errors = goal.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("target_nps"));
        assert!(fields.contains_key("bonus_amount"));
    }

    #[test]
    fn attendant_payload_defaults_to_active() {
        let parsed: AttendantPayload = serde_json::from_str(r#"{"name":"Ana"}"#).unwrap();
        assert!(parsed.is_active);
    }
}
