// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// 2. O Extractor (Guardião). Depende do `tenant_guard` ter rodado antes.
pub struct RequirePermission<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_headers(&parts.headers);
        let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

        // A. Usuário e loja
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or(AppError::InvalidToken)
            .map_err(to_api)?;
        let tenant = parts
            .extensions
            .get::<TenantContext>()
            .ok_or(AppError::TenantHeaderMissing)
            .map_err(to_api)?;

        // B. Verifica no banco (superadmin passa direto)
        let required_perm = T::slug();
        let has_permission = app_state
            .rbac_service
            .user_can(&user.0, tenant.0, required_perm)
            .await
            .map_err(to_api)?;

        if !has_permission {
            return Err(to_api(AppError::PermissionDenied(required_perm)));
        }

        Ok(RequirePermission(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermTenantsManage;
impl PermissionDef for PermTenantsManage {
    fn slug() -> &'static str { "tenants:manage" }
}

pub struct PermUsersRead;
impl PermissionDef for PermUsersRead {
    fn slug() -> &'static str { "users:read" }
}

pub struct PermUsersWrite;
impl PermissionDef for PermUsersWrite {
    fn slug() -> &'static str { "users:write" }
}

pub struct PermAttendantsRead;
impl PermissionDef for PermAttendantsRead {
    fn slug() -> &'static str { "attendants:read" }
}

pub struct PermAttendantsWrite;
impl PermissionDef for PermAttendantsWrite {
    fn slug() -> &'static str { "attendants:write" }
}

pub struct PermSurveysRead;
impl PermissionDef for PermSurveysRead {
    fn slug() -> &'static str { "surveys:read" }
}

pub struct PermSurveysWrite;
impl PermissionDef for PermSurveysWrite {
    fn slug() -> &'static str { "surveys:write" }
}

pub struct PermResponsesRead;
impl PermissionDef for PermResponsesRead {
    fn slug() -> &'static str { "responses:read" }
}

pub struct PermClientsRead;
impl PermissionDef for PermClientsRead {
    fn slug() -> &'static str { "clients:read" }
}

pub struct PermClientsWrite;
impl PermissionDef for PermClientsWrite {
    fn slug() -> &'static str { "clients:write" }
}

pub struct PermCouponsRead;
impl PermissionDef for PermCouponsRead {
    fn slug() -> &'static str { "coupons:read" }
}

pub struct PermCouponsWrite;
impl PermissionDef for PermCouponsWrite {
    fn slug() -> &'static str { "coupons:write" }
}

pub struct PermCouponsValidate;
impl PermissionDef for PermCouponsValidate {
    fn slug() -> &'static str { "coupons:validate" }
}

pub struct PermDashboardRead;
impl PermissionDef for PermDashboardRead {
    fn slug() -> &'static str { "dashboard:read" }
}

pub struct PermTreatmentsWrite;
impl PermissionDef for PermTreatmentsWrite {
    fn slug() -> &'static str { "treatments:write" }
}

pub struct PermIntegrationsWrite;
impl PermissionDef for PermIntegrationsWrite {
    fn slug() -> &'static str { "integrations:write" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rbac::PERMISSION_CATALOGUE;

    #[test]
    fn every_guard_slug_is_in_the_catalogue() {
        let slugs = [
            PermTenantsManage::slug(),
            PermUsersRead::slug(),
            PermUsersWrite::slug(),
            PermAttendantsRead::slug(),
            PermAttendantsWrite::slug(),
            PermSurveysRead::slug(),
            PermSurveysWrite::slug(),
            PermResponsesRead::slug(),
            PermClientsRead::slug(),
            PermClientsWrite::slug(),
            PermCouponsRead::slug(),
            PermCouponsWrite::slug(),
            PermCouponsValidate::slug(),
            PermDashboardRead::slug(),
            PermTreatmentsWrite::slug(),
            PermIntegrationsWrite::slug(),
        ];
        for slug in slugs {
            assert!(
                PERMISSION_CATALOGUE.iter().any(|(s, _, _)| *s == slug),
                "{slug} fora do catálogo"
            );
        }
    }
}
