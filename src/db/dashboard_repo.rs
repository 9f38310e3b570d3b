// src/db/dashboard_repo.rs

use chrono::NaiveDate;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::dashboard::{
        conversion_rate, rank_attendants, AttendantRankingEntry, AttendantRankingRow, CsatBreakdown,
        DashboardSummary, NpsBreakdown, NpsCounts, NpsTrendEntry, NpsTrendRow, TrendGranularity,
    },
};

#[derive(Debug, sqlx::FromRow)]
struct CsatRow {
    answered: i64,
    satisfied: i64,
    average: Option<f64>,
}

#[derive(Debug, sqlx::FromRow)]
struct CouponCountRow {
    issued: i64,
    used: i64,
}

// Sem pool próprio: quem chama decide o executor (pool ou transação)
#[derive(Clone, Default)]
pub struct DashboardRepository;

impl DashboardRepository {
    pub fn new() -> Self {
        Self
    }

    // 1. Resumo Geral do período [from, to]
    pub async fn get_summary<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<DashboardSummary, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        // Transação só de leitura: todos os números do mesmo snapshot
        let mut tx = executor.begin().await?;

        // A. Total de respostas e classes de NPS
        let total_responses: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM survey_responses
            WHERE tenant_id = $1 AND created_at >= $2::date AND created_at < ($3::date + 1)
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_one(&mut *tx)
        .await?;

        let nps_counts = sqlx::query_as::<_, NpsCounts>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE nps_score >= 9) AS promoters,
                COUNT(*) FILTER (WHERE nps_score BETWEEN 7 AND 8) AS passives,
                COUNT(*) FILTER (WHERE nps_score <= 6) AS detractors
            FROM survey_responses
            WHERE tenant_id = $1 AND created_at >= $2::date AND created_at < ($3::date + 1)
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_one(&mut *tx)
        .await?;

        // B. CSAT
        let csat = sqlx::query_as::<_, CsatRow>(
            r#"
            SELECT
                COUNT(csat_score) AS answered,
                COUNT(*) FILTER (WHERE csat_score >= 4) AS satisfied,
                AVG(csat_score)::float8 AS average
            FROM survey_responses
            WHERE tenant_id = $1 AND created_at >= $2::date AND created_at < ($3::date + 1)
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_one(&mut *tx)
        .await?;

        // C. Cupons emitidos no período e quantos deles já foram usados
        let coupons = sqlx::query_as::<_, CouponCountRow>(
            r#"
            SELECT
                COUNT(*) AS issued,
                COUNT(*) FILTER (WHERE status = 'used') AS used
            FROM coupons
            WHERE tenant_id = $1 AND created_at >= $2::date AND created_at < ($3::date + 1)
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(DashboardSummary {
            from,
            to,
            total_responses,
            nps: NpsBreakdown::from_counts(nps_counts),
            csat: CsatBreakdown::new(csat.answered, csat.satisfied, csat.average),
            coupons_issued: coupons.issued,
            coupons_used: coupons.used,
            conversion_rate: conversion_rate(coupons.issued, coupons.used),
        })
    }

    // 2. Gráfico de evolução do NPS (um ponto por dia ou por mês)
    pub async fn get_nps_trend<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        granularity: TrendGranularity,
    ) -> Result<Vec<NpsTrendEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, NpsTrendRow>(
            r#"
            SELECT
                date_trunc($4, created_at)::date AS bucket,
                COUNT(*) FILTER (WHERE nps_score >= 9) AS promoters,
                COUNT(*) FILTER (WHERE nps_score BETWEEN 7 AND 8) AS passives,
                COUNT(*) FILTER (WHERE nps_score <= 6) AS detractors
            FROM survey_responses
            WHERE tenant_id = $1
              AND nps_score IS NOT NULL
              AND created_at >= $2::date AND created_at < ($3::date + 1)
            GROUP BY 1
            ORDER BY 1 ASC
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .bind(granularity.date_trunc_unit())
        .fetch_all(executor)
        .await?;

        Ok(rows.into_iter().map(NpsTrendEntry::from).collect())
    }

    // 3. Ranking de atendentes no período
    pub async fn get_attendant_ranking<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendantRankingEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, AttendantRankingRow>(
            r#"
            SELECT
                a.id AS attendant_id,
                a.name AS attendant_name,
                COUNT(r.id) AS responses,
                COUNT(r.id) FILTER (WHERE r.nps_score >= 9) AS promoters,
                COUNT(r.id) FILTER (WHERE r.nps_score BETWEEN 7 AND 8) AS passives,
                COUNT(r.id) FILTER (WHERE r.nps_score <= 6) AS detractors
            FROM attendants a
            JOIN survey_responses r
              ON r.attendant_id = a.id
             AND r.created_at >= $2::date AND r.created_at < ($3::date + 1)
            WHERE a.tenant_id = $1
            GROUP BY a.id, a.name
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await?;

        Ok(rank_attendants(rows))
    }
}
