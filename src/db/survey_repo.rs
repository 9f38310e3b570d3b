// src/db/survey_repo.rs

use serde_json::Value;
use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::Pagination},
    models::survey::{Question, ResponseFilter, Survey, SurveyResponse},
};

const SURVEY_COLUMNS: &str = r#"
    id, tenant_id, title, description, questions, reward_id, is_active, created_at, updated_at
"#;

// Resposta já com os nomes resolvidos
const RESPONSE_SELECT: &str = r#"
    SELECT r.id, r.tenant_id, r.survey_id, s.title AS survey_title,
           r.client_id, c.name AS client_name,
           r.attendant_id, a.name AS attendant_name,
           r.answers, r.nps_score, r.csat_score, r.comment, r.created_at
    FROM survey_responses r
    JOIN surveys s ON s.id = r.survey_id
    LEFT JOIN clients c ON c.id = r.client_id
    LEFT JOIN attendants a ON a.id = r.attendant_id
"#;

const RESPONSE_FILTER: &str = r#"
    WHERE r.tenant_id = $1
      AND ($2::uuid IS NULL OR r.survey_id = $2)
      AND ($3::uuid IS NULL OR r.attendant_id = $3)
      AND ($4::date IS NULL OR r.created_at >= $4::date)
      AND ($5::date IS NULL OR r.created_at < ($5::date + 1))
"#;

#[derive(Clone)]
pub struct SurveyRepository {
    pool: PgPool,
}

impl SurveyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  PESQUISAS
    // =========================================================================

    pub async fn create(
        &self,
        tenant_id: Uuid,
        title: &str,
        description: Option<&str>,
        questions: &[Question],
        reward_id: Option<Uuid>,
        is_active: bool,
    ) -> Result<Survey, AppError> {
        let survey = sqlx::query_as::<_, Survey>(&format!(
            r#"
            INSERT INTO surveys (tenant_id, title, description, questions, reward_id, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {SURVEY_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(title)
        .bind(description)
        .bind(Json(questions))
        .bind(reward_id)
        .bind(is_active)
        .fetch_one(&self.pool)
        .await?;
        Ok(survey)
    }

    pub async fn list(&self, tenant_id: Uuid) -> Result<Vec<Survey>, AppError> {
        let surveys = sqlx::query_as::<_, Survey>(&format!(
            "SELECT {SURVEY_COLUMNS} FROM surveys WHERE tenant_id = $1 ORDER BY created_at DESC"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(surveys)
    }

    pub async fn find(&self, tenant_id: Uuid, id: Uuid) -> Result<Survey, AppError> {
        sqlx::query_as::<_, Survey>(&format!(
            "SELECT {SURVEY_COLUMNS} FROM surveys WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("survey"))
    }

    /// Rota pública: a loja é descoberta pela própria pesquisa.
    pub async fn find_public(&self, id: Uuid) -> Result<Survey, AppError> {
        sqlx::query_as::<_, Survey>(&format!(
            r#"
            SELECT {SURVEY_COLUMNS} FROM surveys s
            WHERE s.id = $1
              AND EXISTS (SELECT 1 FROM tenants t WHERE t.id = s.tenant_id AND t.is_active = true)
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("survey"))
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        title: &str,
        description: Option<&str>,
        questions: &[Question],
        reward_id: Option<Uuid>,
        is_active: bool,
    ) -> Result<Survey, AppError> {
        sqlx::query_as::<_, Survey>(&format!(
            r#"
            UPDATE surveys
            SET title = $3, description = $4, questions = $5, reward_id = $6,
                is_active = $7, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING {SURVEY_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(id)
        .bind(title)
        .bind(description)
        .bind(Json(questions))
        .bind(reward_id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("survey"))
    }

    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM surveys WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("survey"));
        }
        Ok(())
    }

    // =========================================================================
    //  RESPOSTAS
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_response<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        survey_id: Uuid,
        client_id: Option<Uuid>,
        attendant_id: Option<Uuid>,
        answers: &Value,
        nps_score: Option<i16>,
        csat_score: Option<i16>,
        comment: Option<&str>,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO survey_responses
                (tenant_id, survey_id, client_id, attendant_id, answers, nps_score, csat_score, comment)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(tenant_id)
        .bind(survey_id)
        .bind(client_id)
        .bind(attendant_id)
        .bind(answers)
        .bind(nps_score)
        .bind(csat_score)
        .bind(comment)
        .fetch_one(executor)
        .await?;
        Ok(id)
    }

    pub async fn find_response(&self, tenant_id: Uuid, id: Uuid) -> Result<SurveyResponse, AppError> {
        sqlx::query_as::<_, SurveyResponse>(&format!(
            "{RESPONSE_SELECT} WHERE r.tenant_id = $1 AND r.id = $2"
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("response"))
    }

    pub async fn list_responses(
        &self,
        tenant_id: Uuid,
        filter: &ResponseFilter,
        pagination: Pagination,
    ) -> Result<(Vec<SurveyResponse>, i64), AppError> {
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM survey_responses r {RESPONSE_FILTER}"
        ))
        .bind(tenant_id)
        .bind(filter.survey_id)
        .bind(filter.attendant_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, SurveyResponse>(&format!(
            "{RESPONSE_SELECT} {RESPONSE_FILTER} ORDER BY r.created_at DESC LIMIT $6 OFFSET $7"
        ))
        .bind(tenant_id)
        .bind(filter.survey_id)
        .bind(filter.attendant_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((items, total))
    }
}
