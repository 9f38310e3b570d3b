// src/handlers/clients.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError, ErrorBody},
        pagination::{Page, Pagination},
    },
    config::AppState,
    handlers::attendants::validate_not_blank,
    middleware::{
        i18n::Locale,
        rbac::{PermClientsRead, PermClientsWrite, PermCouponsRead, RequirePermission},
        tenancy::TenantContext,
    },
    models::{
        client::{Client, ClientListEntry},
        loyalty::Coupon,
    },
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ClientListQuery {
    /// Busca por nome, telefone ou e-mail
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientPayload {
    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "Maria da Silva")]
    pub name: String,

    #[validate(length(min = 8, max = 20, message = "invalid_phone"))]
    #[schema(example = "+5511988887777")]
    pub phone: String,

    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,

    #[schema(value_type = Option<String>, format = Date)]
    pub birth_date: Option<NaiveDate>,
}

#[utoipa::path(
    get,
    path = "/api/clients",
    tag = "Clients",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ClientListQuery),
    responses((status = 200, description = "Clientes paginados", body = Page<ClientListEntry>)),
    security(("api_jwt" = []))
)]
pub async fn list_clients(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermClientsRead>,
    Query(query): Query<ClientListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let page = app_state
        .client_service
        .list(tenant.0, search, Pagination::new(query.page, query.per_page))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/clients/{id}",
    tag = "Clients",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Cliente", body = Client),
        (status = 404, description = "Não encontrado", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_client(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermClientsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let client = app_state
        .client_service
        .get(tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(client))
}

#[utoipa::path(
    put,
    path = "/api/clients/{id}",
    tag = "Clients",
    request_body = UpdateClientPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Cliente atualizado", body = Client),
        (status = 409, description = "Telefone já cadastrado", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_client(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermClientsWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateClientPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let client = app_state
        .client_service
        .update(
            tenant.0,
            id,
            &payload.name,
            &payload.phone,
            payload.email.as_deref(),
            payload.birth_date,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(client))
}

#[utoipa::path(
    delete,
    path = "/api/clients/{id}",
    tag = "Clients",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 204, description = "Removido"),
        (status = 404, description = "Não encontrado", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_client(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermClientsWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .client_service
        .delete(tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/clients/{id}/cupons",
    tag = "Clients",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path), PageQuery),
    responses((status = 200, description = "Cupons do cliente", body = Page<Coupon>)),
    security(("api_jwt" = []))
)]
pub async fn list_client_coupons(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermCouponsRead>,
    Path(id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let coupons = app_state
        .loyalty_service
        .list_client_coupons(tenant.0, id, Pagination::new(query.page, query.per_page))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(coupons))
}
