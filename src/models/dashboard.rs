// src/models/dashboard.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub const PROMOTER_MIN: i16 = 9;
pub const PASSIVE_MIN: i16 = 7;
pub const CSAT_SATISFIED_MIN: i16 = 4;

// Contagens brutas por classe de NPS, como vêm do SQL (COUNT FILTER)
#[derive(Debug, Clone, Copy, Default, FromRow)]
pub struct NpsCounts {
    pub promoters: i64,
    pub passives: i64,
    pub detractors: i64,
}

// 1. Bloco de NPS (usado no resumo, no ranking e no desempenho do atendente)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NpsBreakdown {
    pub promoters: i64,
    pub passives: i64,
    pub detractors: i64,
    pub answered: i64,
    #[schema(example = 64)]
    pub score: i32,
}

impl NpsBreakdown {
    pub fn from_counts(counts: NpsCounts) -> Self {
        let answered = counts.promoters + counts.passives + counts.detractors;
        let score = if answered == 0 {
            0
        } else {
            let pct = 100.0 * (counts.promoters - counts.detractors) as f64 / answered as f64;
            pct.round() as i32
        };
        Self {
            promoters: counts.promoters,
            passives: counts.passives,
            detractors: counts.detractors,
            answered,
            score,
        }
    }
}

/// Detrator: nota de 0 a 6.
pub fn is_detractor(nps: i16) -> bool {
    nps < PASSIVE_MIN
}

// 2. Bloco de CSAT
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CsatBreakdown {
    pub answered: i64,
    pub satisfied: i64,
    #[schema(example = 87.0)]
    pub percentage: f64,
    #[schema(example = 4.3)]
    pub average: Option<f64>,
}

impl CsatBreakdown {
    pub fn new(answered: i64, satisfied: i64, average: Option<f64>) -> Self {
        let percentage = if answered == 0 {
            0.0
        } else {
            (100.0 * satisfied as f64 / answered as f64).round()
        };
        Self {
            answered,
            satisfied,
            percentage,
            average: average.map(|avg| (avg * 100.0).round() / 100.0),
        }
    }
}

/// Percentual de cupons usados sobre emitidos, com uma casa decimal.
pub fn conversion_rate(issued: i64, used: i64) -> f64 {
    if issued == 0 {
        return 0.0;
    }
    (1000.0 * used as f64 / issued as f64).round() / 10.0
}

// 3. Resumo do período (os cards do topo)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_responses: i64,
    pub nps: NpsBreakdown,
    pub csat: CsatBreakdown,
    pub coupons_issued: i64,
    pub coupons_used: i64,
    #[schema(example = 37.5)]
    pub conversion_rate: f64,
}

// Janela do painel: `from`/`to` opcionais (padrão: últimos 30 dias)
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DashboardQuery {
    #[param(value_type = Option<String>, format = Date, example = "2025-03-01")]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date, example = "2025-03-31")]
    pub to: Option<NaiveDate>,
    #[param(inline)]
    pub granularity: Option<TrendGranularity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrendGranularity {
    #[default]
    Day,
    Month,
}

impl TrendGranularity {
    pub fn date_trunc_unit(self) -> &'static str {
        match self {
            TrendGranularity::Day => "day",
            TrendGranularity::Month => "month",
        }
    }
}

// Linha crua do SQL da evolução do NPS
#[derive(Debug, FromRow)]
pub struct NpsTrendRow {
    pub bucket: NaiveDate,
    pub promoters: i64,
    pub passives: i64,
    pub detractors: i64,
}

// 4. Gráfico de evolução do NPS
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NpsTrendEntry {
    pub bucket: NaiveDate,
    pub nps: NpsBreakdown,
}

impl From<NpsTrendRow> for NpsTrendEntry {
    fn from(row: NpsTrendRow) -> Self {
        Self {
            bucket: row.bucket,
            nps: NpsBreakdown::from_counts(NpsCounts {
                promoters: row.promoters,
                passives: row.passives,
                detractors: row.detractors,
            }),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct AttendantRankingRow {
    pub attendant_id: Uuid,
    pub attendant_name: String,
    pub responses: i64,
    pub promoters: i64,
    pub passives: i64,
    pub detractors: i64,
}

// 5. Ranking de atendentes
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendantRankingEntry {
    pub attendant_id: Uuid,
    #[schema(example = "Carlos Lima")]
    pub attendant_name: String,
    pub responses: i64,
    pub nps: NpsBreakdown,
}

/// Ordena por NPS (desc) e desempata pelo volume de respostas (desc).
pub fn rank_attendants(rows: Vec<AttendantRankingRow>) -> Vec<AttendantRankingEntry> {
    let mut entries: Vec<AttendantRankingEntry> = rows
        .into_iter()
        .map(|row| AttendantRankingEntry {
            attendant_id: row.attendant_id,
            attendant_name: row.attendant_name,
            responses: row.responses,
            nps: NpsBreakdown::from_counts(NpsCounts {
                promoters: row.promoters,
                passives: row.passives,
                detractors: row.detractors,
            }),
        })
        .collect();

    entries.sort_by(|a, b| {
        b.nps
            .score
            .cmp(&a.nps.score)
            .then_with(|| b.responses.cmp(&a.responses))
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(promoters: i64, passives: i64, detractors: i64) -> NpsCounts {
        NpsCounts {
            promoters,
            passives,
            detractors,
        }
    }

    #[test]
    fn nps_is_promoters_minus_detractors_percentage() {
        let nps = NpsBreakdown::from_counts(counts(70, 20, 10));
        assert_eq!(nps.answered, 100);
        assert_eq!(nps.score, 60);
    }

    #[test]
    fn nps_rounds_and_can_be_negative() {
        assert_eq!(NpsBreakdown::from_counts(counts(1, 1, 1)).score, 0);
        assert_eq!(NpsBreakdown::from_counts(counts(2, 0, 1)).score, 33);
        assert_eq!(NpsBreakdown::from_counts(counts(0, 1, 2)).score, -67);
        assert_eq!(NpsBreakdown::from_counts(counts(0, 0, 5)).score, -100);
    }

    #[test]
    fn nps_without_answers_is_zero() {
        let nps = NpsBreakdown::from_counts(NpsCounts::default());
        assert_eq!((nps.answered, nps.score), (0, 0));
    }

    #[test]
    fn detractor_threshold() {
        assert!(is_detractor(0));
        assert!(is_detractor(6));
        assert!(!is_detractor(7));
        assert!(!is_detractor(10));
    }

    #[test]
    fn csat_percentage_and_average() {
        let csat = CsatBreakdown::new(8, 6, Some(4.1234));
        assert_eq!(csat.percentage, 75.0);
        assert_eq!(csat.average, Some(4.12));

        let empty = CsatBreakdown::new(0, 0, None);
        assert_eq!(empty.percentage, 0.0);
        assert_eq!(empty.average, None);
    }

    #[test]
    fn conversion_rate_keeps_one_decimal() {
        assert_eq!(conversion_rate(3, 1), 33.3);
        assert_eq!(conversion_rate(8, 3), 37.5);
        assert_eq!(conversion_rate(0, 0), 0.0);
    }

    #[test]
    fn ranking_orders_by_score_then_volume() {
        let row = |name: &str, p, pa, d| AttendantRankingRow {
            attendant_id: Uuid::new_v4(),
            attendant_name: name.to_string(),
            responses: p + pa + d,
            promoters: p,
            passives: pa,
            detractors: d,
        };

        let ranking = rank_attendants(vec![
            row("baixo", 1, 0, 1),
            row("alto-pouco", 2, 0, 0),
            row("alto-muito", 10, 0, 0),
        ]);

        let names: Vec<_> = ranking.iter().map(|e| e.attendant_name.as_str()).collect();
        assert_eq!(names, ["alto-muito", "alto-pouco", "baixo"]);
    }
}
