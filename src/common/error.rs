// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use utoipa::ToSchema;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::{common::i18n::I18nStore, middleware::i18n::Locale};

// Erro de domínio. Não sabe nada de HTTP nem de idioma;
// a tradução acontece em `to_api_error`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Respostas da pesquisa inválidas")]
    InvalidAnswers(HashMap<String, String>),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Sem acesso à loja")]
    TenantAccessDenied,

    #[error("Permissão ausente: {0}")]
    PermissionDenied(&'static str),

    #[error("Apenas superadmins")]
    SuperadminRequired,

    #[error("Cabeçalho x-tenant-id ausente")]
    TenantHeaderMissing,

    #[error("Cabeçalho x-tenant-id inválido")]
    TenantHeaderInvalid,

    // O &'static str é a chave da entidade ("attendant", "coupon", ...)
    #[error("Registro não encontrado: {0}")]
    NotFound(&'static str),

    #[error("Conflito: {0}")]
    Conflict(&'static str),

    #[error("Pesquisa inativa")]
    SurveyInactive,

    #[error("Recompensa inativa")]
    RewardInactive,

    #[error("Cupom não pode ser validado (status {0})")]
    CouponNotRedeemable(String),

    #[error("Cupom não pode ser cancelado (status {0})")]
    CouponNotCancelable(String),

    #[error("Motivo do cancelamento obrigatório")]
    CancelReasonRequired,

    #[error("Meta não atingida ({responses} respostas, NPS {nps})")]
    GoalNotReached { responses: i64, nps: i32 },

    #[error("Integração não configurada: {0}")]
    IntegrationNotConfigured(String),

    #[error("Falha na integração externa: {0}")]
    IntegrationRequestFailed(String),

    #[error("Arquivo inválido: {0}")]
    InvalidUpload(String),

    #[error("Arquivo excede o limite de tamanho")]
    UploadTooLarge,

    #[error("Fonte não encontrada: {0}")]
    FontNotFound(String),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Erro HTTP: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("Erro de E/S: {0}")]
    IoError(#[from] std::io::Error),
}

// O que o cliente recebe: status + mensagem traduzida + detalhes opcionais.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "Um ou mais campos são inválidos.")]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.error,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidAnswers(_)
            | AppError::TenantHeaderMissing
            | AppError::TenantHeaderInvalid
            | AppError::CancelReasonRequired
            | AppError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::InvalidToken | AppError::JwtError(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::TenantAccessDenied
            | AppError::PermissionDenied(_)
            | AppError::SuperadminRequired => StatusCode::FORBIDDEN,
            AppError::UserNotFound | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::EmailAlreadyExists
            | AppError::Conflict(_)
            | AppError::CouponNotRedeemable(_)
            | AppError::CouponNotCancelable(_) => StatusCode::CONFLICT,
            AppError::SurveyInactive
            | AppError::RewardInactive
            | AppError::GoalNotReached { .. }
            | AppError::IntegrationNotConfigured(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UploadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::IntegrationRequestFailed(_) | AppError::HttpClientError(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::FontNotFound(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Chave do catálogo de mensagens em `locales/*.json`.
    fn message_key(&self) -> String {
        let key = match self {
            AppError::ValidationError(_) => "validation_failed",
            AppError::InvalidAnswers(_) => "invalid_answers",
            AppError::EmailAlreadyExists => "email_already_exists",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::InvalidToken | AppError::JwtError(_) => "invalid_token",
            AppError::UserNotFound => "user_not_found",
            AppError::TenantAccessDenied => "tenant_access_denied",
            AppError::PermissionDenied(_) => "permission_denied",
            AppError::SuperadminRequired => "superadmin_required",
            AppError::TenantHeaderMissing => "tenant_header_missing",
            AppError::TenantHeaderInvalid => "tenant_header_invalid",
            AppError::NotFound(entity) => return format!("not_found.{entity}"),
            AppError::Conflict(what) => return format!("conflict.{what}"),
            AppError::SurveyInactive => "survey_inactive",
            AppError::RewardInactive => "reward_inactive",
            AppError::CouponNotRedeemable(_) => "coupon_not_redeemable",
            AppError::CouponNotCancelable(_) => "coupon_not_cancelable",
            AppError::CancelReasonRequired => "cancel_reason_required",
            AppError::GoalNotReached { .. } => "goal_not_reached",
            AppError::IntegrationNotConfigured(_) => "integration_not_configured",
            AppError::IntegrationRequestFailed(_) | AppError::HttpClientError(_) => {
                "integration_request_failed"
            }
            AppError::InvalidUpload(_) => "invalid_upload",
            AppError::UploadTooLarge => "upload_too_large",
            _ => "internal_error",
        };
        key.to_string()
    }

    fn message_args(&self) -> Vec<(&'static str, String)> {
        match self {
            AppError::PermissionDenied(slug) => vec![("permission", slug.to_string())],
            AppError::CouponNotRedeemable(status) | AppError::CouponNotCancelable(status) => {
                vec![("status", status.clone())]
            }
            AppError::GoalNotReached { responses, nps } => vec![
                ("responses", responses.to_string()),
                ("nps", nps.to_string()),
            ],
            AppError::IntegrationNotConfigured(provider) => vec![("provider", provider.clone())],
            AppError::InvalidUpload(reason) => vec![("reason", reason.clone())],
            _ => Vec::new(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            // Detalhes por campo: campo -> lista de códigos/mensagens
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                flatten_validation_errors("", errors, &mut details);
                Some(json!(details))
            }
            AppError::InvalidAnswers(errors) => Some(json!(errors)),
            _ => None,
        }
    }

    /// Converte o erro de domínio na resposta HTTP, no idioma do cliente.
    pub fn to_api_error(self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR || status == StatusCode::BAD_GATEWAY {
            tracing::error!("Erro Interno do Servidor: {}", self);
        }

        ApiError {
            status,
            error: i18n.translate(&locale.0, &self.message_key(), &self.message_args()),
            details: self.details(),
        }
    }
}

/// Atalho para violações de unicidade: se o erro for a constraint indicada,
/// vira `Conflict(what)`; senão segue como erro de banco.
pub fn map_unique_violation(e: sqlx::Error, constraint: &str, what: &'static str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() && db_err.constraint() == Some(constraint) {
            return AppError::Conflict(what);
        }
    }
    e.into()
}

// Campos aninhados viram "client.name"; listas viram "items[0].qty"
fn flatten_validation_errors(prefix: &str, errors: &ValidationErrors, out: &mut HashMap<String, Vec<String>>) {
    for (field, kind) in errors.errors() {
        let key = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                let messages = field_errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                out.insert(key, messages);
            }
            ValidationErrorsKind::Struct(inner) => flatten_validation_errors(&key, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten_validation_errors(&format!("{key}[{index}]"), inner, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "required"))]
        name: String,
    }

    fn pt() -> Locale {
        Locale("pt".to_string())
    }

    #[test]
    fn validation_error_carries_field_details() {
        let store = I18nStore::load_embedded().unwrap();
        let err = Payload { name: String::new() }.validate().unwrap_err();

        let api = AppError::ValidationError(err).to_api_error(&pt(), &store);

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.details.unwrap()["name"][0], "required");
    }

    #[derive(Validate)]
    struct Wrapper {
        #[validate(nested)]
        inner: Payload,
    }

    #[test]
    fn nested_validation_errors_use_dotted_keys() {
        let store = I18nStore::load_embedded().unwrap();
        let err = Wrapper {
            inner: Payload { name: String::new() },
        }
        .validate()
        .unwrap_err();

        let api = AppError::ValidationError(err).to_api_error(&pt(), &store);
        assert_eq!(api.details.unwrap()["inner.name"][0], "required");
    }

    #[test]
    fn domain_errors_map_to_expected_status() {
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::TenantAccessDenied.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("coupon").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::CouponNotRedeemable("used".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::GoalNotReached { responses: 3, nps: 10 }.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::IntegrationRequestFailed("timeout".into()).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn permission_denied_message_names_the_slug() {
        let store = I18nStore::load_embedded().unwrap();
        let api = AppError::PermissionDenied("coupons:validate").to_api_error(&pt(), &store);

        assert!(api.error.contains("coupons:validate"));
        assert!(api.details.is_none());
    }

    #[test]
    fn not_found_uses_entity_specific_message() {
        let store = I18nStore::load_embedded().unwrap();
        let en = Locale("en".to_string());

        let api = AppError::NotFound("attendant").to_api_error(&en, &store);

        assert_eq!(api.error, "Attendant not found.");
    }
}
