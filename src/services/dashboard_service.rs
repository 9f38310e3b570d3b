// src/services/dashboard_service.rs

use chrono::{Duration, NaiveDate};
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::{
    common::error::AppError,
    db::DashboardRepository,
    models::dashboard::{AttendantRankingEntry, DashboardSummary, NpsTrendEntry, TrendGranularity},
};

// Janela padrão do painel, contando o dia de hoje
const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Resolve o período do painel. Sem `to`, vai até hoje; sem `from`, volta
/// 30 dias a partir de `to`. `from` depois de `to` é erro de validação.
pub fn resolve_window(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), AppError> {
    let to = to.unwrap_or(today);
    let from = from.unwrap_or(to - Duration::days(DEFAULT_WINDOW_DAYS - 1));

    if from > to {
        let mut errors = ValidationErrors::new();
        errors.add("from", ValidationError::new("invalid_range"));
        return Err(AppError::ValidationError(errors));
    }
    Ok((from, to))
}

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
}

impl DashboardService {
    pub fn new(repo: DashboardRepository) -> Self {
        Self { repo }
    }

    pub async fn get_summary<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        (from, to): (NaiveDate, NaiveDate),
    ) -> Result<DashboardSummary, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        self.repo.get_summary(executor, tenant_id, from, to).await
    }

    pub async fn get_nps_trend<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        (from, to): (NaiveDate, NaiveDate),
        granularity: TrendGranularity,
    ) -> Result<Vec<NpsTrendEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .get_nps_trend(executor, tenant_id, from, to, granularity)
            .await
    }

    pub async fn get_attendant_ranking<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        (from, to): (NaiveDate, NaiveDate),
    ) -> Result<Vec<AttendantRankingEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.get_attendant_ranking(executor, tenant_id, from, to).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn default_window_is_last_thirty_days() {
        let (from, to) = resolve_window(None, None, date(2025, 3, 31)).unwrap();
        assert_eq!(to, date(2025, 3, 31));
        assert_eq!(from, date(2025, 3, 2));
        assert_eq!((to - from).num_days() + 1, 30);
    }

    #[test]
    fn explicit_bounds_are_kept() {
        let window = resolve_window(Some(date(2025, 1, 1)), Some(date(2025, 1, 31)), date(2025, 6, 1));
        assert_eq!(window.unwrap(), (date(2025, 1, 1), date(2025, 1, 31)));
    }

    #[test]
    fn only_to_counts_back_from_it() {
        let (from, _) = resolve_window(None, Some(date(2025, 2, 28)), date(2025, 6, 1)).unwrap();
        assert_eq!(from, date(2025, 1, 30));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = resolve_window(Some(date(2025, 2, 1)), Some(date(2025, 1, 1)), date(2025, 6, 1));
        assert!(matches!(err, Err(AppError::ValidationError(_))));
    }
}
