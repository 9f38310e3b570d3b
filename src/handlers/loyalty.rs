// src/handlers/loyalty.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::{
        error::{ApiError, AppError, ErrorBody},
        pagination::{Page, Pagination},
    },
    config::AppState,
    db::loyalty_repo::RewardInput,
    handlers::attendants::validate_not_blank,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermCouponsRead, PermCouponsValidate, PermCouponsWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::loyalty::{
        Coupon, CouponStatus, Reward, RewardType, MAX_ACTIVATION_DELAY_HOURS, MAX_VALIDITY_DAYS,
    },
};

// ---
// Validações
// ---
fn validate_reward_value(payload: &RewardPayload) -> Result<(), ValidationError> {
    if payload.value.is_sign_negative() {
        return Err(ValidationError::new("negative_value"));
    }
    if payload.reward_type == RewardType::PercentageDiscount && payload.value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("percentage_over_100"));
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
#[validate(schema(function = "validate_reward_value"))]
pub struct RewardPayload {
    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "Sobremesa grátis")]
    pub name: String,

    pub description: Option<String>,

    pub reward_type: RewardType,

    #[schema(value_type = f64, example = 10.0)]
    pub value: Decimal,

    #[validate(range(min = 1, max = MAX_VALIDITY_DAYS, message = "range"))]
    #[schema(example = 30)]
    pub validity_days: i32,

    #[validate(range(min = 0, max = MAX_ACTIVATION_DELAY_HOURS, message = "range"))]
    #[serde(default)]
    #[schema(example = 24)]
    pub activation_delay_hours: i32,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl RewardPayload {
    fn as_input(&self) -> RewardInput<'_> {
        RewardInput {
            name: self.name.trim(),
            description: self.description.as_deref(),
            reward_type: self.reward_type,
            value: self.value,
            validity_days: self.validity_days,
            activation_delay_hours: self.activation_delay_hours,
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CouponListQuery {
    /// Status efetivo (active, pending, used, expired, canceled)
    #[param(inline)]
    pub status: Option<CouponStatus>,
    /// Código do cupom ou nome do cliente
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueCouponPayload {
    pub client_id: Uuid,
    pub reward_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ValidateCouponPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "K7QM2XPA")]
    pub code: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelCouponPayload {
    #[schema(example = "Cliente desistiu")]
    pub reason: String,
}

// ---
// Recompensas
// ---

#[utoipa::path(
    post,
    path = "/api/recompensas",
    tag = "Loyalty",
    request_body = RewardPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    responses(
        (status = 201, description = "Recompensa criada", body = Reward),
        (status = 400, description = "Payload inválido", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_reward(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermCouponsWrite>,
    Json(payload): Json<RewardPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let reward = app_state
        .loyalty_service
        .create_reward(tenant.0, &payload.as_input())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(reward)))
}

#[utoipa::path(
    get,
    path = "/api/recompensas",
    tag = "Loyalty",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    responses((status = 200, description = "Recompensas da loja", body = Vec<Reward>)),
    security(("api_jwt" = []))
)]
pub async fn list_rewards(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermCouponsRead>,
) -> Result<impl IntoResponse, ApiError> {
    let rewards = app_state
        .loyalty_service
        .list_rewards(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(rewards))
}

#[utoipa::path(
    get,
    path = "/api/recompensas/{id}",
    tag = "Loyalty",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Recompensa", body = Reward),
        (status = 404, description = "Não encontrada", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_reward(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermCouponsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let reward = app_state
        .loyalty_service
        .get_reward(tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(reward))
}

#[utoipa::path(
    put,
    path = "/api/recompensas/{id}",
    tag = "Loyalty",
    request_body = RewardPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Recompensa atualizada", body = Reward),
        (status = 404, description = "Não encontrada", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_reward(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermCouponsWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RewardPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let reward = app_state
        .loyalty_service
        .update_reward(tenant.0, id, &payload.as_input())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(reward))
}

#[utoipa::path(
    delete,
    path = "/api/recompensas/{id}",
    tag = "Loyalty",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 204, description = "Removida"),
        (status = 409, description = "Recompensa com cupons emitidos", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_reward(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermCouponsWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .loyalty_service
        .delete_reward(tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// ---
// Cupons
// ---

#[utoipa::path(
    get,
    path = "/api/cupons",
    tag = "Loyalty",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), CouponListQuery),
    responses((status = 200, description = "Cupons paginados", body = Page<Coupon>)),
    security(("api_jwt" = []))
)]
pub async fn list_coupons(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermCouponsRead>,
    Query(query): Query<CouponListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let page = app_state
        .loyalty_service
        .list_coupons(
            tenant.0,
            query.status,
            search,
            Pagination::new(query.page, query.per_page),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(page))
}

#[utoipa::path(
    post,
    path = "/api/cupons",
    tag = "Loyalty",
    request_body = IssueCouponPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    responses(
        (status = 201, description = "Cupom emitido", body = Coupon),
        (status = 404, description = "Cliente ou recompensa não encontrados", body = ErrorBody),
        (status = 422, description = "Recompensa inativa", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn issue_coupon(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermCouponsWrite>,
    Json(payload): Json<IssueCouponPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let coupon = app_state
        .loyalty_service
        .issue_manual(tenant.0, payload.client_id, payload.reward_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(coupon)))
}

#[utoipa::path(
    get,
    path = "/api/cupons/code/{code}",
    tag = "Loyalty",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("code" = String, Path)),
    responses(
        (status = 200, description = "Cupom", body = Coupon),
        (status = 404, description = "Código inexistente", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_coupon_by_code(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermCouponsRead>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let coupon = app_state
        .loyalty_service
        .find_by_code(tenant.0, &code)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(coupon))
}

#[utoipa::path(
    post,
    path = "/api/cupons/validate",
    tag = "Loyalty",
    request_body = ValidateCouponPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    responses(
        (status = 200, description = "Cupom utilizado", body = Coupon),
        (status = 409, description = "Cupom não pode ser utilizado", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn validate_coupon(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermCouponsValidate>,
    Json(payload): Json<ValidateCouponPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let coupon = app_state
        .loyalty_service
        .validate(tenant.0, &payload.code, user.0.id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(coupon))
}

#[utoipa::path(
    post,
    path = "/api/cupons/{id}/cancel",
    tag = "Loyalty",
    request_body = CancelCouponPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Cupom cancelado", body = Coupon),
        (status = 400, description = "Motivo obrigatório", body = ErrorBody),
        (status = 409, description = "Status não permite cancelamento", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_coupon(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermCouponsWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelCouponPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let coupon = app_state
        .loyalty_service
        .cancel(tenant.0, id, &payload.reason)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(coupon))
}

// GET /api/cupons/{id}/voucher (PDF)
#[utoipa::path(
    get,
    path = "/api/cupons/{id}/voucher",
    tag = "Loyalty",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Voucher em PDF", content_type = "application/pdf", body = Vec<u8>),
        (status = 404, description = "Cupom não encontrado", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn download_voucher(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermCouponsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (code, pdf) = app_state
        .voucher_service
        .generate_voucher(tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"cupom-{code}.pdf\""),
        ),
    ];

    Ok((headers, pdf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reward(reward_type: &str, value: f64) -> RewardPayload {
        serde_json::from_value(json!({
            "name": "Sobremesa",
            "rewardType": reward_type,
            "value": value,
            "validityDays": 30
        }))
        .unwrap()
    }

    #[test]
    fn percentage_above_100_is_rejected() {
        assert!(reward("percentage_discount", 150.0).validate().is_err());
        assert!(reward("percentage_discount", 15.0).validate().is_ok());
        assert!(reward("fixed_discount", 150.0).validate().is_ok());
    }

    #[test]
    fn reward_defaults() {
        let payload = reward("gift", 0.0);
        assert_eq!(payload.activation_delay_hours, 0);
        assert!(payload.is_active);
    }

    #[test]
    fn zero_validity_is_rejected() {
        let mut payload = reward("gift", 0.0);
        payload.validity_days = 0;
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("validity_days"));
    }

    #[test]
    fn oversized_windows_are_rejected() {
        let mut payload = reward("gift", 0.0);
        payload.validity_days = 2_000_000_000;
        payload.activation_delay_hours = MAX_ACTIVATION_DELAY_HOURS + 1;
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("validity_days"));
        assert!(fields.contains_key("activation_delay_hours"));

        payload.validity_days = MAX_VALIDITY_DAYS;
        payload.activation_delay_hours = MAX_ACTIVATION_DELAY_HOURS;
        assert!(payload.validate().is_ok());
    }
}
