// src/handlers/integrations.rs

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::{ApiError, AppError, ErrorBody},
    config::AppState,
    handlers::attendants::validate_not_blank,
    middleware::{
        i18n::Locale,
        rbac::{PermIntegrationsWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::integrations::{GmbReview, IntegrationProvider, IntegrationSettings, TemplateKind, WhatsAppTemplate},
    services::integration_service::{ReviewSyncResult, TemplateTestResult},
};

fn validate_settings_object(val: &Value) -> Result<(), ValidationError> {
    if !val.is_object() {
        return Err(ValidationError::new("settings_object"));
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
pub struct TemplatePayload {
    #[validate(custom(function = "validate_not_blank"), length(max = 80, message = "too_long"))]
    #[schema(example = "cupom_emitido")]
    pub name: String,

    pub kind: TemplateKind,

    #[validate(custom(function = "validate_not_blank"), length(max = 4096, message = "too_long"))]
    #[schema(example = "Olá {{nome}}! Seu cupom {{codigo}} já está disponível.")]
    pub body: String,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateTestPayload {
    #[validate(length(min = 8, max = 20, message = "invalid_phone"))]
    #[schema(example = "5511988887777")]
    pub phone: String,

    #[serde(default)]
    #[schema(example = json!({"nome": "Maria", "codigo": "K7QM2XPA"}))]
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPayload {
    /// Chaves omitidas ou com a máscara mantêm o valor salvo
    #[validate(custom(function = "validate_settings_object"))]
    #[schema(value_type = Object, example = json!({"phoneNumberId": "10987654321", "accessToken": "EAAG..."}))]
    pub settings: Value,

    pub is_enabled: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReplyPayload {
    #[validate(custom(function = "validate_not_blank"), length(max = 4096, message = "too_long"))]
    #[schema(example = "Obrigado pela visita!")]
    pub comment: String,
}

// ---
// Templates de WhatsApp
// ---

#[utoipa::path(
    post,
    path = "/api/whatsapp-templates",
    tag = "Integrations",
    request_body = TemplatePayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    responses(
        (status = 201, description = "Template criado", body = WhatsAppTemplate),
        (status = 409, description = "Nome já usado na loja", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_template(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermIntegrationsWrite>,
    Json(payload): Json<TemplatePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let template = app_state
        .integration_service
        .create_template(tenant.0, &payload.name, payload.kind, &payload.body, payload.is_active)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(template)))
}

#[utoipa::path(
    get,
    path = "/api/whatsapp-templates",
    tag = "Integrations",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    responses((status = 200, description = "Templates da loja", body = Vec<WhatsAppTemplate>)),
    security(("api_jwt" = []))
)]
pub async fn list_templates(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermIntegrationsWrite>,
) -> Result<impl IntoResponse, ApiError> {
    let templates = app_state
        .integration_service
        .list_templates(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(templates))
}

#[utoipa::path(
    get,
    path = "/api/whatsapp-templates/{id}",
    tag = "Integrations",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Template", body = WhatsAppTemplate),
        (status = 404, description = "Não encontrado", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_template(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermIntegrationsWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let template = app_state
        .integration_service
        .get_template(tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(template))
}

#[utoipa::path(
    put,
    path = "/api/whatsapp-templates/{id}",
    tag = "Integrations",
    request_body = TemplatePayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Template atualizado", body = WhatsAppTemplate),
        (status = 404, description = "Não encontrado", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_template(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermIntegrationsWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TemplatePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let template = app_state
        .integration_service
        .update_template(tenant.0, id, &payload.name, payload.kind, &payload.body, payload.is_active)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(template))
}

#[utoipa::path(
    delete,
    path = "/api/whatsapp-templates/{id}",
    tag = "Integrations",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 204, description = "Removido"),
        (status = 404, description = "Não encontrado", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_template(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermIntegrationsWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .integration_service
        .delete_template(tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/whatsapp-templates/{id}/test
#[utoipa::path(
    post,
    path = "/api/whatsapp-templates/{id}/test",
    tag = "Integrations",
    request_body = TemplateTestPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Mensagem enviada", body = TemplateTestResult),
        (status = 422, description = "WhatsApp não configurado", body = ErrorBody),
        (status = 502, description = "Falha na API do WhatsApp", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn test_template(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermIntegrationsWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TemplateTestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let result = app_state
        .integration_service
        .send_test(tenant.0, id, &payload.phone, &payload.variables)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(result))
}

// ---
// Configurações por provedor
// ---

#[utoipa::path(
    get,
    path = "/api/integrations/{provider}",
    tag = "Integrations",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("provider" = IntegrationProvider, Path, description = "whatsapp, google_my_business, ifood, rappi ou uber_eats")
    ),
    responses((status = 200, description = "Configuração com segredos mascarados", body = IntegrationSettings)),
    security(("api_jwt" = []))
)]
pub async fn get_settings(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermIntegrationsWrite>,
    Path(provider): Path<IntegrationProvider>,
) -> Result<impl IntoResponse, ApiError> {
    let settings = app_state
        .integration_service
        .get_settings(tenant.0, provider)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(settings))
}

#[utoipa::path(
    put,
    path = "/api/integrations/{provider}",
    tag = "Integrations",
    request_body = SettingsPayload,
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("provider" = IntegrationProvider, Path)
    ),
    responses(
        (status = 200, description = "Configuração salva (mascarada)", body = IntegrationSettings),
        (status = 400, description = "settings precisa ser um objeto", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn put_settings(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermIntegrationsWrite>,
    Path(provider): Path<IntegrationProvider>,
    Json(payload): Json<SettingsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let saved = app_state
        .integration_service
        .put_settings(tenant.0, provider, payload.settings, payload.is_enabled)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(saved))
}

// ---
// Google My Business
// ---

#[utoipa::path(
    get,
    path = "/api/gmb-review",
    tag = "Integrations",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    responses((status = 200, description = "Avaliações armazenadas", body = Vec<GmbReview>)),
    security(("api_jwt" = []))
)]
pub async fn list_reviews(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermIntegrationsWrite>,
) -> Result<impl IntoResponse, ApiError> {
    let reviews = app_state
        .integration_service
        .list_reviews(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(reviews))
}

#[utoipa::path(
    post,
    path = "/api/gmb-review/sync",
    tag = "Integrations",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    responses(
        (status = 200, description = "Sincronização concluída", body = ReviewSyncResult),
        (status = 422, description = "Google My Business não configurado", body = ErrorBody),
        (status = 502, description = "Falha na API do Google", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn sync_reviews(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermIntegrationsWrite>,
) -> Result<impl IntoResponse, ApiError> {
    let result = app_state
        .integration_service
        .sync_reviews(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(result))
}

#[utoipa::path(
    put,
    path = "/api/gmb-review/{id}/reply",
    tag = "Integrations",
    request_body = ReplyPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Resposta publicada", body = GmbReview),
        (status = 404, description = "Avaliação não encontrada", body = ErrorBody),
        (status = 502, description = "Falha na API do Google", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn reply_review(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermIntegrationsWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReplyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let review = app_state
        .integration_service
        .reply_review(tenant.0, id, payload.comment.trim())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(review))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn settings_must_be_an_object() {
        let payload: SettingsPayload =
            serde_json::from_value(json!({"settings": ["a"], "isEnabled": true})).unwrap();
        assert!(payload.validate().is_err());

        let payload: SettingsPayload =
            serde_json::from_value(json!({"settings": {"phoneNumberId": "1"}, "isEnabled": false})).unwrap();
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_payload_variables_default_to_empty() {
        let payload: TemplateTestPayload = serde_json::from_value(json!({"phone": "5511988887777"})).unwrap();
        assert!(payload.variables.is_empty());
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn blank_reply_is_rejected() {
        let payload = ReplyPayload { comment: "  ".into() };
        assert!(payload.validate().is_err());
    }
}
