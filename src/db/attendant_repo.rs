// src/db/attendant_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, FromRow, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::attendant::{Attendant, AttendantGoal, BonusAward, GoalPeriod},
};

const ATTENDANT_COLUMNS: &str = "id, tenant_id, name, email, phone, is_active, created_at, updated_at";
const GOAL_COLUMNS: &str = r#"
    id, tenant_id, attendant_id, period, target_responses, target_nps,
    bonus_amount, created_at, updated_at
"#;

// Números crus de um atendente num intervalo de datas
#[derive(Debug, Default, FromRow)]
pub struct AttendantStats {
    pub responses: i64,
    pub promoters: i64,
    pub passives: i64,
    pub detractors: i64,
    pub csat_answered: i64,
    pub csat_satisfied: i64,
}

#[derive(Clone)]
pub struct AttendantRepository {
    pool: PgPool,
}

impl AttendantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  CADASTRO
    // =========================================================================

    pub async fn list(&self, tenant_id: Uuid, active: Option<bool>) -> Result<Vec<Attendant>, AppError> {
        let attendants = sqlx::query_as::<_, Attendant>(&format!(
            r#"
            SELECT {ATTENDANT_COLUMNS} FROM attendants
            WHERE tenant_id = $1 AND ($2::bool IS NULL OR is_active = $2)
            ORDER BY name ASC
            "#
        ))
        .bind(tenant_id)
        .bind(active)
        .fetch_all(&self.pool)
        .await?;
        Ok(attendants)
    }

    pub async fn find(&self, tenant_id: Uuid, id: Uuid) -> Result<Attendant, AppError> {
        sqlx::query_as::<_, Attendant>(&format!(
            "SELECT {ATTENDANT_COLUMNS} FROM attendants WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("attendant"))
    }

    pub async fn exists_active(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM attendants WHERE tenant_id = $1 AND id = $2 AND is_active = true)",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn create(
        &self,
        tenant_id: Uuid,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Attendant, AppError> {
        let attendant = sqlx::query_as::<_, Attendant>(&format!(
            r#"
            INSERT INTO attendants (tenant_id, name, email, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING {ATTENDANT_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(name)
        .bind(email)
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;
        Ok(attendant)
    }

    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
        is_active: bool,
    ) -> Result<Attendant, AppError> {
        sqlx::query_as::<_, Attendant>(&format!(
            r#"
            UPDATE attendants
            SET name = $3, email = $4, phone = $5, is_active = $6, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING {ATTENDANT_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("attendant"))
    }

    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM attendants WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("attendant"));
        }
        Ok(())
    }

    // =========================================================================
    //  META
    // =========================================================================

    pub async fn find_goal(&self, tenant_id: Uuid, attendant_id: Uuid) -> Result<Option<AttendantGoal>, AppError> {
        let goal = sqlx::query_as::<_, AttendantGoal>(&format!(
            "SELECT {GOAL_COLUMNS} FROM attendant_goals WHERE tenant_id = $1 AND attendant_id = $2"
        ))
        .bind(tenant_id)
        .bind(attendant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(goal)
    }

    /// Cada atendente tem uma única meta: grava por cima da anterior.
    pub async fn upsert_goal(
        &self,
        tenant_id: Uuid,
        attendant_id: Uuid,
        period: GoalPeriod,
        target_responses: i32,
        target_nps: i32,
        bonus_amount: Decimal,
    ) -> Result<AttendantGoal, AppError> {
        let goal = sqlx::query_as::<_, AttendantGoal>(&format!(
            r#"
            INSERT INTO attendant_goals (tenant_id, attendant_id, period, target_responses, target_nps, bonus_amount)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (attendant_id) DO UPDATE
            SET period = EXCLUDED.period,
                target_responses = EXCLUDED.target_responses,
                target_nps = EXCLUDED.target_nps,
                bonus_amount = EXCLUDED.bonus_amount,
                updated_at = NOW()
            RETURNING {GOAL_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(attendant_id)
        .bind(period)
        .bind(target_responses)
        .bind(target_nps)
        .bind(bonus_amount)
        .fetch_one(&self.pool)
        .await?;
        Ok(goal)
    }

    // =========================================================================
    //  DESEMPENHO
    // =========================================================================

    /// Contagens do intervalo fechado [start, end] (datas inteiras).
    pub async fn stats<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        attendant_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<AttendantStats, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stats = sqlx::query_as::<_, AttendantStats>(
            r#"
            SELECT
                COUNT(*) AS responses,
                COUNT(*) FILTER (WHERE nps_score >= 9) AS promoters,
                COUNT(*) FILTER (WHERE nps_score BETWEEN 7 AND 8) AS passives,
                COUNT(*) FILTER (WHERE nps_score <= 6) AS detractors,
                COUNT(csat_score) AS csat_answered,
                COUNT(*) FILTER (WHERE csat_score >= 4) AS csat_satisfied
            FROM survey_responses
            WHERE tenant_id = $1
              AND attendant_id = $2
              AND created_at >= $3::date
              AND created_at < ($4::date + 1)
            "#,
        )
        .bind(tenant_id)
        .bind(attendant_id)
        .bind(start)
        .bind(end)
        .fetch_one(executor)
        .await?;
        Ok(stats)
    }

    // =========================================================================
    //  PREMIAÇÕES
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_award<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        attendant_id: Uuid,
        period_start: NaiveDate,
        period_end: NaiveDate,
        responses_count: i32,
        nps_score: i32,
        amount: Decimal,
        awarded_by: Uuid,
    ) -> Result<BonusAward, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, BonusAward>(
            r#"
            WITH inserted AS (
                INSERT INTO bonus_awards
                    (tenant_id, attendant_id, period_start, period_end, responses_count, nps_score, amount, awarded_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
            )
            SELECT i.id, i.tenant_id, i.attendant_id, a.name AS attendant_name,
                   i.period_start, i.period_end, i.responses_count, i.nps_score,
                   i.amount, i.awarded_by, i.created_at
            FROM inserted i
            JOIN attendants a ON a.id = i.attendant_id
            "#,
        )
        .bind(tenant_id)
        .bind(attendant_id)
        .bind(period_start)
        .bind(period_end)
        .bind(responses_count)
        .bind(nps_score)
        .bind(amount)
        .bind(awarded_by)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, "bonus_awards_attendant_period_key", "bonus_awarded"))
    }

    pub async fn list_awards(
        &self,
        tenant_id: Uuid,
        attendant_id: Option<Uuid>,
    ) -> Result<Vec<BonusAward>, AppError> {
        let awards = sqlx::query_as::<_, BonusAward>(
            r#"
            SELECT b.id, b.tenant_id, b.attendant_id, a.name AS attendant_name,
                   b.period_start, b.period_end, b.responses_count, b.nps_score,
                   b.amount, b.awarded_by, b.created_at
            FROM bonus_awards b
            JOIN attendants a ON a.id = b.attendant_id
            WHERE b.tenant_id = $1 AND ($2::uuid IS NULL OR b.attendant_id = $2)
            ORDER BY b.period_start DESC, a.name ASC
            "#,
        )
        .bind(tenant_id)
        .bind(attendant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(awards)
    }
}
