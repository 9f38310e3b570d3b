// src/models/attendant.rs

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::dashboard::NpsBreakdown;

// --- ENUMS ---

// Mapeia o CREATE TYPE goal_period do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "goal_period", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GoalPeriod {
    Weekly,
    Monthly,
}

impl GoalPeriod {
    /// Intervalo fechado [início, fim] do período que contém `date`.
    /// Semana: segunda a domingo. Mês: dia 1 ao último dia.
    pub fn bounds(self, date: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            GoalPeriod::Weekly => {
                let start = date - Duration::days(date.weekday().num_days_from_monday() as i64);
                (start, start + Duration::days(6))
            }
            GoalPeriod::Monthly => {
                let start = date.with_day(1).unwrap_or(date);
                let next_month = if start.month() == 12 {
                    NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
                };
                let end = next_month.map(|d| d - Duration::days(1)).unwrap_or(start);
                (start, end)
            }
        }
    }
}

// --- ATENDENTE ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attendant {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Carlos Lima")]
    pub name: String,
    pub email: Option<String>,
    #[schema(example = "+5511999998888")]
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- META ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendantGoal {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub attendant_id: Uuid,
    pub period: GoalPeriod,
    #[schema(example = 40)]
    pub target_responses: i32,
    #[schema(example = 70)]
    pub target_nps: i32,
    #[schema(value_type = f64, example = 150.00)]
    pub bonus_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttendantGoal {
    pub fn is_met(&self, responses: i64, nps: i32) -> bool {
        responses >= self.target_responses as i64 && nps >= self.target_nps
    }
}

// --- PREMIAÇÃO ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BonusAward {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub attendant_id: Uuid,
    pub attendant_name: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub responses_count: i32,
    pub nps_score: i32,
    #[schema(value_type = f64, example = 150.00)]
    pub amount: Decimal,
    pub awarded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// --- DESEMPENHO ---

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendantPerformance {
    pub attendant_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub responses: i64,
    pub nps: NpsBreakdown,
    #[schema(example = 92.5)]
    pub csat_percentage: Option<f64>,
    pub goal: Option<AttendantGoal>,
    pub goal_met: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekly_period_runs_monday_to_sunday() {
        // 2025-03-13 é uma quinta-feira
        let (start, end) = GoalPeriod::Weekly.bounds(date(2025, 3, 13));
        assert_eq!(start, date(2025, 3, 10));
        assert_eq!(end, date(2025, 3, 16));

        let (start, _) = GoalPeriod::Weekly.bounds(date(2025, 3, 10));
        assert_eq!(start, date(2025, 3, 10));
    }

    #[test]
    fn monthly_period_handles_leap_years_and_december() {
        assert_eq!(
            GoalPeriod::Monthly.bounds(date(2024, 2, 17)),
            (date(2024, 2, 1), date(2024, 2, 29))
        );
        assert_eq!(
            GoalPeriod::Monthly.bounds(date(2025, 12, 31)),
            (date(2025, 12, 1), date(2025, 12, 31))
        );
    }

    #[test]
    fn goal_requires_volume_and_score() {
        let goal = AttendantGoal {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            attendant_id: Uuid::new_v4(),
            period: GoalPeriod::Monthly,
            target_responses: 10,
            target_nps: 50,
            bonus_amount: Decimal::new(10000, 2),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(goal.is_met(10, 50));
        assert!(!goal.is_met(9, 100));
        assert!(!goal.is_met(30, 49));
    }
}
