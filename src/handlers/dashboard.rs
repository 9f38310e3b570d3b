// src/handlers/dashboard.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use uuid::Uuid; // Importante para o Swagger params

use crate::{
    common::error::{ApiError, ErrorBody},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{PermDashboardRead, RequirePermission},
        tenancy::TenantContext,
    },
    models::dashboard::{AttendantRankingEntry, DashboardQuery, DashboardSummary, NpsTrendEntry},
    services::dashboard_service::resolve_window,
};

// GET /api/dashboard/summary
#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    tag = "Dashboard",
    responses(
        (status = 200, description = "NPS, CSAT e cupons no período", body = DashboardSummary),
        (status = 400, description = "Período inválido", body = ErrorBody),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Sem acesso à loja")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        DashboardQuery
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermDashboardRead>,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let window = resolve_window(query.from, query.to, Utc::now().date_naive())
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let summary = app_state
        .dashboard_service
        .get_summary(&app_state.db_pool, tenant.0, window)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(summary)))
}

// GET /api/dashboard/nps-trend
#[utoipa::path(
    get,
    path = "/api/dashboard/nps-trend",
    tag = "Dashboard",
    responses(
        (status = 200, description = "NPS por dia ou por mês", body = Vec<NpsTrendEntry>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        DashboardQuery
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_nps_trend(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermDashboardRead>,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let window = resolve_window(query.from, query.to, Utc::now().date_naive())
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let trend = app_state
        .dashboard_service
        .get_nps_trend(
            &app_state.db_pool,
            tenant.0,
            window,
            query.granularity.unwrap_or_default(),
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(trend)))
}

// GET /api/dashboard/attendants
#[utoipa::path(
    get,
    path = "/api/dashboard/attendants",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Ranking de atendentes por NPS", body = Vec<AttendantRankingEntry>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        DashboardQuery
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_attendant_ranking(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermDashboardRead>,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let window = resolve_window(query.from, query.to, Utc::now().date_naive())
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let ranking = app_state
        .dashboard_service
        .get_attendant_ranking(&app_state.db_pool, tenant.0, window)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(ranking)))
}
