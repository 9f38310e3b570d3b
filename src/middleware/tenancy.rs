// src/middleware/tenancy.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
};

// O nome do nosso cabeçalho HTTP customizado
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

/// Lê e converte o cabeçalho `x-tenant-id`.
pub fn tenant_id_from_headers(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let value = headers
        .get(TENANT_ID_HEADER)
        .ok_or(AppError::TenantHeaderMissing)?;

    let value_str = value.to_str().map_err(|_| AppError::TenantHeaderInvalid)?;
    Uuid::parse_str(value_str.trim()).map_err(|_| AppError::TenantHeaderInvalid)
}

// Loja já validada pelo `tenant_guard` (membro ativo ou superadmin)
#[derive(Debug, Clone, Copy)]
pub struct TenantContext(pub Uuid);

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<TenantContext>() {
            Some(ctx) => Ok(*ctx),
            None => {
                let app_state = AppState::from_ref(state);
                let locale = Locale::from_headers(&parts.headers);
                Err(AppError::TenantHeaderMissing.to_api_error(&locale, &app_state.i18n_store))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_header() {
        assert!(matches!(
            tenant_id_from_headers(&HeaderMap::new()),
            Err(AppError::TenantHeaderMissing)
        ));
    }

    #[test]
    fn invalid_uuid() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_ID_HEADER, HeaderValue::from_static("loja-1"));
        assert!(matches!(
            tenant_id_from_headers(&headers),
            Err(AppError::TenantHeaderInvalid)
        ));
    }

    #[test]
    fn valid_uuid() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(tenant_id_from_headers(&headers).unwrap(), id);
    }
}
