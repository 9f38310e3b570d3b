// src/db/treatment_repo.rs

use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::treatment::{Treatment, TreatmentStatus},
};

const TREATMENT_SELECT: &str = r#"
    SELECT t.id, t.tenant_id, t.response_id, t.status, t.position, t.notes, t.resolved_at,
           s.title AS survey_title, c.name AS client_name, c.phone AS client_phone,
           a.name AS attendant_name, r.nps_score, r.comment, r.created_at AS responded_at,
           t.created_at, t.updated_at
    FROM feedback_treatments t
    JOIN survey_responses r ON r.id = t.response_id
    JOIN surveys s ON s.id = r.survey_id
    LEFT JOIN clients c ON c.id = r.client_id
    LEFT JOIN attendants a ON a.id = r.attendant_id
"#;

#[derive(Clone)]
pub struct TreatmentRepository {
    pool: PgPool,
}

impl TreatmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Serializa as mudanças no quadro da loja até o fim da transação.
    pub async fn lock_board<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended('tratativas:' || $1::text, 0))")
            .bind(tenant_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Abre o cartão no fim da coluna "pendente".
    pub async fn open_pending(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        response_id: Uuid,
    ) -> Result<Uuid, AppError> {
        self.lock_board(&mut *conn, tenant_id).await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO feedback_treatments (tenant_id, response_id, status, position)
            SELECT $1, $2, 'pending',
                   COALESCE(MAX(position) + 1, 0)
            FROM feedback_treatments
            WHERE tenant_id = $1 AND status = 'pending'
            RETURNING id
            "#,
        )
        .bind(tenant_id)
        .bind(response_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(id)
    }

    pub async fn list(&self, tenant_id: Uuid) -> Result<Vec<Treatment>, AppError> {
        let cards = sqlx::query_as::<_, Treatment>(&format!(
            "{TREATMENT_SELECT} WHERE t.tenant_id = $1 ORDER BY t.status, t.position, t.created_at"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(cards)
    }

    pub async fn find(&self, tenant_id: Uuid, id: Uuid) -> Result<Treatment, AppError> {
        sqlx::query_as::<_, Treatment>(&format!(
            "{TREATMENT_SELECT} WHERE t.tenant_id = $1 AND t.id = $2"
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("treatment"))
    }

    pub async fn current_status<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<TreatmentStatus, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_scalar("SELECT status FROM feedback_treatments WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("treatment"))
    }

    /// IDs da coluna na ordem em que o quadro mostra.
    pub async fn column_ids<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        status: TreatmentStatus,
    ) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar(
            r#"
            SELECT id FROM feedback_treatments
            WHERE tenant_id = $1 AND status = $2
            ORDER BY position, created_at, id
            "#,
        )
        .bind(tenant_id)
        .bind(status)
        .fetch_all(executor)
        .await?;
        Ok(ids)
    }

    /// Troca a coluna e as notas. `resolved_at` acompanha a coluna "resolvido":
    /// é marcado ao entrar (se ainda não tinha) e limpo ao sair.
    pub async fn update_card<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        status: TreatmentStatus,
        notes: Option<&str>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE feedback_treatments
            SET status = $3,
                notes = COALESCE($4, notes),
                resolved_at = CASE
                    WHEN $3 = 'resolved'::treatment_status THEN COALESCE(resolved_at, NOW())
                    ELSE NULL
                END,
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(status)
        .bind(notes)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("treatment"));
        }
        Ok(())
    }

    /// Grava `position` = índice de cada cartão em `ordered_ids` (0, 1, 2...).
    pub async fn renumber<'e, E>(&self, executor: E, tenant_id: Uuid, ordered_ids: &[Uuid]) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE feedback_treatments AS t
            SET position = (o.ord - 1)::int
            FROM unnest($2::uuid[]) WITH ORDINALITY AS o(id, ord)
            WHERE t.tenant_id = $1 AND t.id = o.id AND t.position <> (o.ord - 1)::int
            "#,
        )
        .bind(tenant_id)
        .bind(ordered_ids)
        .execute(executor)
        .await?;
        Ok(())
    }
}
