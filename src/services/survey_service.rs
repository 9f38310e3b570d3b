// src/services/survey_service.rs

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::{
    common::{
        error::AppError,
        pagination::{Page, Pagination},
    },
    db::{AttendantRepository, ClientRepository, LoyaltyRepository, SurveyRepository, TreatmentRepository},
    models::{
        dashboard::is_detractor,
        survey::{
            validate_answers, validate_questions, PublicSurvey, Question, ResponseFilter,
            SubmissionReceipt, SubmitResponsePayload, Survey, SurveyResponse,
        },
    },
    services::loyalty_service::LoyaltyService,
};

/// Campos editáveis de uma pesquisa.
pub struct SurveyInput<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub questions: &'a [Question],
    pub reward_id: Option<Uuid>,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct SurveyService {
    repo: SurveyRepository,
    client_repo: ClientRepository,
    attendant_repo: AttendantRepository,
    loyalty_repo: LoyaltyRepository,
    treatment_repo: TreatmentRepository,
    loyalty_service: LoyaltyService,
    pool: PgPool,
}

impl SurveyService {
    pub fn new(
        repo: SurveyRepository,
        client_repo: ClientRepository,
        attendant_repo: AttendantRepository,
        loyalty_repo: LoyaltyRepository,
        treatment_repo: TreatmentRepository,
        loyalty_service: LoyaltyService,
        pool: PgPool,
    ) -> Self {
        Self {
            repo,
            client_repo,
            attendant_repo,
            loyalty_repo,
            treatment_repo,
            loyalty_service,
            pool,
        }
    }

    // =========================================================================
    //  PESQUISAS
    // =========================================================================

    /// Regras do formulário + a recompensa (se houver) precisa ser da loja.
    async fn check_input(&self, tenant_id: Uuid, input: &SurveyInput<'_>) -> Result<(), AppError> {
        if let Err(e) = validate_questions(input.questions) {
            let mut errors = ValidationErrors::new();
            errors.add("questions", e);
            return Err(AppError::ValidationError(errors));
        }
        if let Some(reward_id) = input.reward_id {
            self.loyalty_repo.find_reward(&self.pool, tenant_id, reward_id).await?;
        }
        Ok(())
    }

    pub async fn create(&self, tenant_id: Uuid, input: &SurveyInput<'_>) -> Result<Survey, AppError> {
        self.check_input(tenant_id, input).await?;
        self.repo
            .create(
                tenant_id,
                input.title.trim(),
                input.description,
                input.questions,
                input.reward_id,
                input.is_active,
            )
            .await
    }

    pub async fn list(&self, tenant_id: Uuid) -> Result<Vec<Survey>, AppError> {
        self.repo.list(tenant_id).await
    }

    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Survey, AppError> {
        self.repo.find(tenant_id, id).await
    }

    pub async fn update(&self, tenant_id: Uuid, id: Uuid, input: &SurveyInput<'_>) -> Result<Survey, AppError> {
        self.check_input(tenant_id, input).await?;
        self.repo
            .update(
                tenant_id,
                id,
                input.title.trim(),
                input.description,
                input.questions,
                input.reward_id,
                input.is_active,
            )
            .await
    }

    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.repo.delete(tenant_id, id).await
    }

    // =========================================================================
    //  FORMULÁRIO PÚBLICO
    // =========================================================================

    pub async fn public_form(&self, survey_id: Uuid) -> Result<PublicSurvey, AppError> {
        let survey = self.repo.find_public(survey_id).await?;
        if !survey.is_active {
            return Err(AppError::SurveyInactive);
        }
        Ok(survey.into())
    }

    /// Recebe a resposta do cliente final. Numa única transação: identifica o
    /// cliente, grava a resposta, abre tratativa para detrator e emite o cupom.
    pub async fn submit(&self, survey_id: Uuid, payload: &SubmitResponsePayload) -> Result<SubmissionReceipt, AppError> {
        let survey = self.repo.find_public(survey_id).await?;
        if !survey.is_active {
            return Err(AppError::SurveyInactive);
        }
        let tenant_id = survey.tenant_id;

        let scores = validate_answers(&survey.questions.0, &payload.answers).map_err(AppError::InvalidAnswers)?;

        if let Some(attendant_id) = payload.attendant_id {
            if !self.attendant_repo.exists_active(tenant_id, attendant_id).await? {
                return Err(AppError::NotFound("attendant"));
            }
        }

        let answers = serde_json::to_value(&payload.answers).map_err(anyhow::Error::from)?;
        let comment = payload
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let mut tx = self.pool.begin().await?;

        // 1. Cliente (por telefone, dentro da loja)
        let client = match &payload.client {
            Some(c) => Some(
                self.client_repo
                    .upsert_by_phone(
                        &mut *tx,
                        tenant_id,
                        c.name.trim(),
                        c.phone.trim(),
                        c.email.as_deref(),
                        c.birth_date,
                    )
                    .await?,
            ),
            None => None,
        };

        // 2. Resposta
        let response_id = self
            .repo
            .insert_response(
                &mut *tx,
                tenant_id,
                survey.id,
                client.as_ref().map(|c| c.id),
                payload.attendant_id,
                &answers,
                scores.nps,
                scores.csat,
                comment,
            )
            .await?;

        // 3. Detrator abre tratativa
        if scores.nps.is_some_and(is_detractor) {
            self.treatment_repo
                .open_pending(&mut *tx, tenant_id, response_id)
                .await?;
        }

        // 4. Cupom, se a pesquisa oferece recompensa ativa e o cliente se identificou
        let mut coupon = None;
        if let (Some(reward_id), Some(client)) = (survey.reward_id, client.as_ref()) {
            let reward = self.loyalty_repo.find_reward(&mut *tx, tenant_id, reward_id).await?;
            if reward.is_active {
                coupon = Some(
                    self.loyalty_service
                        .issue_in(&mut *tx, tenant_id, &reward, client.id, Some(response_id))
                        .await?,
                );
            }
        }

        tx.commit().await?;

        tracing::info!(
            survey_id = %survey.id,
            response_id = %response_id,
            nps = ?scores.nps,
            coupon = coupon.is_some(),
            "Resposta recebida"
        );

        let now = Utc::now();
        Ok(SubmissionReceipt {
            response_id,
            coupon: coupon.map(|c| c.resolved(now)),
        })
    }

    // =========================================================================
    //  RESPOSTAS (painel)
    // =========================================================================

    pub async fn list_responses(
        &self,
        tenant_id: Uuid,
        filter: &ResponseFilter,
    ) -> Result<Page<SurveyResponse>, AppError> {
        let pagination = Pagination::new(filter.page, filter.per_page);
        let (items, total) = self.repo.list_responses(tenant_id, filter, pagination).await?;
        Ok(Page::new(items, total, pagination))
    }

    pub async fn get_response(&self, tenant_id: Uuid, id: Uuid) -> Result<SurveyResponse, AppError> {
        self.repo.find_response(tenant_id, id).await
    }
}
