// src/handlers/surveys.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError, ErrorBody},
        pagination::Page,
    },
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{PermResponsesRead, PermSurveysRead, PermSurveysWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::survey::{
        validate_questions, PublicSurvey, Question, ResponseFilter, SubmissionReceipt,
        SubmitResponsePayload, Survey, SurveyResponse,
    },
    services::survey_service::SurveyInput,
};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SurveyPayload {
    #[validate(length(min = 1, max = 160, message = "required"))]
    #[schema(example = "Pesquisa de satisfação - Salão")]
    pub title: String,

    pub description: Option<String>,

    #[validate(custom(function = "validate_questions"))]
    pub questions: Vec<Question>,

    /// Recompensa entregue a quem responder
    pub reward_id: Option<Uuid>,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl SurveyPayload {
    fn as_input(&self) -> SurveyInput<'_> {
        SurveyInput {
            title: self.title.trim(),
            description: self.description.as_deref(),
            questions: &self.questions,
            reward_id: self.reward_id,
            is_active: self.is_active,
        }
    }
}

// ---
// Painel
// ---

#[utoipa::path(
    post,
    path = "/api/surveys",
    tag = "Surveys",
    request_body = SurveyPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    responses(
        (status = 201, description = "Pesquisa criada", body = Survey),
        (status = 400, description = "Perguntas inválidas", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_survey(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermSurveysWrite>,
    Json(payload): Json<SurveyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let survey = app_state
        .survey_service
        .create(tenant.0, &payload.as_input())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(survey)))
}

#[utoipa::path(
    get,
    path = "/api/surveys",
    tag = "Surveys",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    responses((status = 200, description = "Pesquisas da loja", body = Vec<Survey>)),
    security(("api_jwt" = []))
)]
pub async fn list_surveys(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermSurveysRead>,
) -> Result<impl IntoResponse, ApiError> {
    let surveys = app_state
        .survey_service
        .list(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(surveys))
}

#[utoipa::path(
    get,
    path = "/api/surveys/{id}",
    tag = "Surveys",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Pesquisa", body = Survey),
        (status = 404, description = "Não encontrada", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_survey(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermSurveysRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let survey = app_state
        .survey_service
        .get(tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(survey))
}

#[utoipa::path(
    put,
    path = "/api/surveys/{id}",
    tag = "Surveys",
    request_body = SurveyPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Pesquisa atualizada", body = Survey),
        (status = 404, description = "Não encontrada", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_survey(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermSurveysWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SurveyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let survey = app_state
        .survey_service
        .update(tenant.0, id, &payload.as_input())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(survey))
}

#[utoipa::path(
    delete,
    path = "/api/surveys/{id}",
    tag = "Surveys",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 204, description = "Removida"),
        (status = 404, description = "Não encontrada", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_survey(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermSurveysWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .survey_service
        .delete(tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// ---
// Respostas
// ---

#[utoipa::path(
    get,
    path = "/api/responses",
    tag = "Responses",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ResponseFilter),
    responses((status = 200, description = "Respostas paginadas", body = Page<SurveyResponse>)),
    security(("api_jwt" = []))
)]
pub async fn list_responses(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermResponsesRead>,
    Query(filter): Query<ResponseFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .survey_service
        .list_responses(tenant.0, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/responses/{id}",
    tag = "Responses",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Resposta", body = SurveyResponse),
        (status = 404, description = "Não encontrada", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_response(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermResponsesRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let response = app_state
        .survey_service
        .get_response(tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(response))
}

// ---
// Público (sem autenticação)
// ---

#[utoipa::path(
    get,
    path = "/api/public/surveys/{id}",
    tag = "Public",
    params(("id" = Uuid, Path, description = "ID da pesquisa")),
    responses(
        (status = 200, description = "Formulário", body = PublicSurvey),
        (status = 404, description = "Pesquisa inexistente ou inativa", body = ErrorBody)
    )
)]
pub async fn get_public_survey(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let survey = app_state
        .survey_service
        .public_form(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(survey))
}

#[utoipa::path(
    post,
    path = "/api/public/surveys/{id}/responses",
    tag = "Public",
    request_body = SubmitResponsePayload,
    params(("id" = Uuid, Path, description = "ID da pesquisa")),
    responses(
        (status = 201, description = "Resposta registrada", body = SubmissionReceipt),
        (status = 400, description = "Respostas inválidas", body = ErrorBody),
        (status = 404, description = "Pesquisa inexistente ou inativa", body = ErrorBody)
    )
)]
pub async fn submit_response(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitResponsePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let receipt = app_state
        .survey_service
        .submit(id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn survey_without_questions_is_rejected() {
        let payload: SurveyPayload = serde_json::from_value(json!({
            "title": "Salão",
            "questions": []
        }))
        .unwrap();

        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("questions"));
        assert!(payload.is_active);
    }

    #[test]
    fn survey_with_nps_question_passes() {
        let payload: SurveyPayload = serde_json::from_value(json!({
            "title": "Salão",
            "questions": [{"id": "q1", "type": "nps", "label": "Recomendaria?", "required": true}]
        }))
        .unwrap();

        assert!(payload.validate().is_ok());
        assert_eq!(payload.as_input().questions.len(), 1);
    }
}
