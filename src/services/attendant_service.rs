// src/services/attendant_service.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{attendant_repo::AttendantStats, AttendantRepository},
    models::{
        attendant::{Attendant, AttendantGoal, AttendantPerformance, BonusAward, GoalPeriod},
        dashboard::{CsatBreakdown, NpsBreakdown, NpsCounts},
    },
};

/// Monta o desempenho a partir das contagens do período e da meta (se houver).
pub fn evaluate_performance(
    attendant_id: Uuid,
    (period_start, period_end): (NaiveDate, NaiveDate),
    stats: &AttendantStats,
    goal: Option<AttendantGoal>,
) -> AttendantPerformance {
    let nps = NpsBreakdown::from_counts(NpsCounts {
        promoters: stats.promoters,
        passives: stats.passives,
        detractors: stats.detractors,
    });
    let csat = CsatBreakdown::new(stats.csat_answered, stats.csat_satisfied, None);
    let goal_met = goal
        .as_ref()
        .is_some_and(|g| g.is_met(stats.responses, nps.score));

    AttendantPerformance {
        attendant_id,
        period_start,
        period_end,
        responses: stats.responses,
        nps,
        csat_percentage: (stats.csat_answered > 0).then_some(csat.percentage),
        goal,
        goal_met,
    }
}

#[derive(Clone)]
pub struct AttendantService {
    repo: AttendantRepository,
    pool: PgPool,
}

impl AttendantService {
    pub fn new(repo: AttendantRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    pub async fn list(&self, tenant_id: Uuid, active: Option<bool>) -> Result<Vec<Attendant>, AppError> {
        self.repo.list(tenant_id, active).await
    }

    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Attendant, AppError> {
        self.repo.find(tenant_id, id).await
    }

    pub async fn create(
        &self,
        tenant_id: Uuid,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Attendant, AppError> {
        self.repo.create(tenant_id, name.trim(), email, phone).await
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
        self.repo
            .update(tenant_id, id, name.trim(), email, phone, is_active)
            .await
    }

    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.repo.delete(tenant_id, id).await
    }

    // --- META ---

    pub async fn get_goal(&self, tenant_id: Uuid, attendant_id: Uuid) -> Result<AttendantGoal, AppError> {
        self.repo.find(tenant_id, attendant_id).await?;
        self.repo
            .find_goal(tenant_id, attendant_id)
            .await?
            .ok_or(AppError::NotFound("goal"))
    }

    pub async fn set_goal(
        &self,
        tenant_id: Uuid,
        attendant_id: Uuid,
        period: GoalPeriod,
        target_responses: i32,
        target_nps: i32,
        bonus_amount: Decimal,
    ) -> Result<AttendantGoal, AppError> {
        self.repo.find(tenant_id, attendant_id).await?;
        self.repo
            .upsert_goal(tenant_id, attendant_id, period, target_responses, target_nps, bonus_amount)
            .await
    }

    // --- DESEMPENHO ---

    /// Desempenho no período da meta que contém `date` (mensal se não houver meta).
    pub async fn performance(
        &self,
        tenant_id: Uuid,
        attendant_id: Uuid,
        date: NaiveDate,
    ) -> Result<AttendantPerformance, AppError> {
        self.repo.find(tenant_id, attendant_id).await?;
        let goal = self.repo.find_goal(tenant_id, attendant_id).await?;

        let period = goal.as_ref().map(|g| g.period).unwrap_or(GoalPeriod::Monthly);
        let (start, end) = period.bounds(date);

        let stats = self
            .repo
            .stats(&self.pool, tenant_id, attendant_id, start, end)
            .await?;

        Ok(evaluate_performance(attendant_id, (start, end), &stats, goal))
    }

    // --- PREMIAÇÕES ---

    /// Avalia a meta no período de `reference_date` e, se batida, registra a
    /// premiação. Contagem e gravação na mesma transação.
    pub async fn award_bonus(
        &self,
        tenant_id: Uuid,
        attendant_id: Uuid,
        reference_date: NaiveDate,
        awarded_by: Uuid,
    ) -> Result<BonusAward, AppError> {
        self.repo.find(tenant_id, attendant_id).await?;
        let goal = self
            .repo
            .find_goal(tenant_id, attendant_id)
            .await?
            .ok_or(AppError::NotFound("goal"))?;

        let (start, end) = goal.period.bounds(reference_date);

        let mut tx = self.pool.begin().await?;

        let stats = self
            .repo
            .stats(&mut *tx, tenant_id, attendant_id, start, end)
            .await?;
        let performance = evaluate_performance(attendant_id, (start, end), &stats, Some(goal.clone()));

        if !performance.goal_met {
            return Err(AppError::GoalNotReached {
                responses: performance.responses,
                nps: performance.nps.score,
            });
        }

        let award = self
            .repo
            .insert_award(
                &mut *tx,
                tenant_id,
                attendant_id,
                start,
                end,
                performance.responses as i32,
                performance.nps.score,
                goal.bonus_amount,
                awarded_by,
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            attendant_id = %attendant_id,
            period_start = %start,
            amount = %award.amount,
            "Premiação registrada"
        );
        Ok(award)
    }

    pub async fn list_awards(&self, tenant_id: Uuid, attendant_id: Option<Uuid>) -> Result<Vec<BonusAward>, AppError> {
        if let Some(id) = attendant_id {
            self.repo.find(tenant_id, id).await?;
        }
        self.repo.list_awards(tenant_id, attendant_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn goal(target_responses: i32, target_nps: i32) -> AttendantGoal {
        AttendantGoal {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            attendant_id: Uuid::nil(),
            period: GoalPeriod::Weekly,
            target_responses,
            target_nps,
            bonus_amount: Decimal::new(5000, 2),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn stats(promoters: i64, passives: i64, detractors: i64) -> AttendantStats {
        AttendantStats {
            responses: promoters + passives + detractors,
            promoters,
            passives,
            detractors,
            csat_answered: 4,
            csat_satisfied: 3,
        }
    }

    #[test]
    fn goal_met_when_volume_and_nps_reach_targets() {
        let period = (date(2025, 3, 10), date(2025, 3, 16));
        let perf = evaluate_performance(Uuid::nil(), period, &stats(8, 1, 1), Some(goal(10, 70)));

        assert_eq!(perf.responses, 10);
        assert_eq!(perf.nps.score, 70);
        assert_eq!(perf.csat_percentage, Some(75.0));
        assert!(perf.goal_met);
    }

    #[test]
    fn goal_missed_on_low_score() {
        let period = (date(2025, 3, 10), date(2025, 3, 16));
        let perf = evaluate_performance(Uuid::nil(), period, &stats(5, 3, 2), Some(goal(10, 70)));
        assert_eq!(perf.nps.score, 30);
        assert!(!perf.goal_met);
    }

    #[test]
    fn without_goal_nothing_is_met_and_empty_csat_is_none() {
        let period = (date(2025, 3, 1), date(2025, 3, 31));
        let empty = AttendantStats::default();
        let perf = evaluate_performance(Uuid::nil(), period, &empty, None);
        assert!(!perf.goal_met);
        assert_eq!(perf.csat_percentage, None);
        assert_eq!(perf.nps.score, 0);
    }
}
