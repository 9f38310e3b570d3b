// src/handlers/tenancy.rs

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError, ErrorBody},
    config::AppState,
    handlers::read_file_field,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermTenantsManage, RequirePermission},
        tenancy::TenantContext,
    },
    models::tenancy::Tenant,
};

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenantPayload {
    #[validate(length(min = 1, max = 120, message = "required"))]
    #[schema(example = "Cantina da Praça")]
    pub name: String,

    /// Gerado a partir do nome quando ausente
    #[validate(length(max = 80, message = "too_long"))]
    #[schema(example = "cantina-da-praca")]
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTenantPayload {
    #[validate(length(min = 1, max = 120, message = "required"))]
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

// POST /api/tenants (apenas superadmin)
#[utoipa::path(
    post,
    path = "/api/tenants",
    tag = "Tenancy",
    request_body = CreateTenantPayload,
    responses(
        (status = 201, description = "Loja criada", body = Tenant),
        (status = 403, description = "Apenas superadmins", body = ErrorBody),
        (status = 409, description = "Slug já existe", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    // Precisamos do utilizador autenticado para o podermos tornar "dono"
    user: AuthenticatedUser,
    Json(payload): Json<CreateTenantPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if !user.0.is_superadmin {
        return Err(AppError::SuperadminRequired.to_api_error(&locale, &app_state.i18n_store));
    }

    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let new_tenant = app_state
        .tenant_service
        .create_tenant_with_owner(&payload.name, payload.slug.as_deref(), user.0.id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(new_tenant)))
}

// GET /api/tenants
#[utoipa::path(
    get,
    path = "/api/tenants",
    tag = "Tenancy",
    responses(
        (status = 200, description = "Lojas visíveis ao usuário", body = Vec<Tenant>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_tenants(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let tenants = app_state
        .tenant_service
        .list_visible_tenants(&user.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(tenants))
}

// PUT /api/tenants/current
#[utoipa::path(
    put,
    path = "/api/tenants/current",
    tag = "Tenancy",
    request_body = UpdateTenantPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    responses(
        (status = 200, description = "Loja atualizada", body = Tenant),
        (status = 403, description = "Sem permissão", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_current_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermTenantsManage>,
    Json(payload): Json<UpdateTenantPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let updated = app_state
        .tenant_service
        .update_tenant(tenant.0, payload.name.as_deref(), payload.is_active)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(updated))
}

// POST /api/tenants/current/logo (multipart, campo "file")
#[utoipa::path(
    post,
    path = "/api/tenants/current/logo",
    tag = "Tenancy",
    request_body(content_type = "multipart/form-data", description = "Campo `file` com PNG, JPEG ou WEBP (até 5 MiB)"),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    responses(
        (status = 200, description = "Logo atualizado", body = Tenant),
        (status = 400, description = "Arquivo inválido", body = ErrorBody),
        (status = 413, description = "Arquivo grande demais", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_tenant_logo(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermTenantsManage>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let bytes = read_file_field(multipart).await.map_err(to_api)?;
    let url = app_state
        .upload_service
        .store_image(&format!("logos/{}", tenant.0), &bytes)
        .await
        .map_err(to_api)?;

    let updated = app_state
        .tenant_service
        .set_logo(tenant.0, &url)
        .await
        .map_err(to_api)?;

    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_tenant_name_is_rejected() {
        let payload = CreateTenantPayload {
            name: String::new(),
            slug: None,
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
    }
}
