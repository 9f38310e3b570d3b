// src/db/client_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        error::{map_unique_violation, AppError},
        pagination::Pagination,
    },
    models::client::{Client, ClientListEntry},
};

const CLIENT_COLUMNS: &str = "id, tenant_id, name, phone, email, birth_date, created_at, updated_at";

#[derive(Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Identifica o cliente pelo telefone dentro da loja. Se já existe,
    /// atualiza o nome e só sobrescreve email/nascimento quando vierem preenchidos.
    pub async fn upsert_by_phone<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        name: &str,
        phone: &str,
        email: Option<&str>,
        birth_date: Option<NaiveDate>,
    ) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            INSERT INTO clients (tenant_id, name, phone, email, birth_date)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT ON CONSTRAINT clients_tenant_phone_key DO UPDATE
            SET name = EXCLUDED.name,
                email = COALESCE(EXCLUDED.email, clients.email),
                birth_date = COALESCE(EXCLUDED.birth_date, clients.birth_date),
                updated_at = NOW()
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(name)
        .bind(phone)
        .bind(email)
        .bind(birth_date)
        .fetch_one(executor)
        .await?;
        Ok(client)
    }

    pub async fn find<'e, E>(&self, executor: E, tenant_id: Uuid, id: Uuid) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("client"))
    }

    /// Busca paginada por nome, telefone ou email, com o resumo do histórico.
    pub async fn list(
        &self,
        tenant_id: Uuid,
        search: Option<&str>,
        pagination: Pagination,
    ) -> Result<(Vec<ClientListEntry>, i64), AppError> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM clients c
            WHERE c.tenant_id = $1
              AND ($2::text IS NULL OR c.name ILIKE $2 OR c.phone ILIKE $2 OR c.email ILIKE $2)
            "#,
        )
        .bind(tenant_id)
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, ClientListEntry>(
            r#"
            SELECT c.id, c.name, c.phone, c.email, c.birth_date,
                   (SELECT COUNT(*) FROM survey_responses r WHERE r.client_id = c.id) AS responses_count,
                   (SELECT COUNT(*) FROM coupons k WHERE k.client_id = c.id) AS coupons_count,
                   (SELECT MAX(r.created_at) FROM survey_responses r WHERE r.client_id = c.id) AS last_response_at,
                   c.created_at
            FROM clients c
            WHERE c.tenant_id = $1
              AND ($2::text IS NULL OR c.name ILIKE $2 OR c.phone ILIKE $2 OR c.email ILIKE $2)
            ORDER BY c.name ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(tenant_id)
        .bind(pattern.as_deref())
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((items, total))
    }

    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        name: &str,
        phone: &str,
        email: Option<&str>,
        birth_date: Option<NaiveDate>,
    ) -> Result<Client, AppError> {
        sqlx::query_as::<_, Client>(&format!(
            r#"
            UPDATE clients
            SET name = $3, phone = $4, email = $5, birth_date = $6, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(id)
        .bind(name)
        .bind(phone)
        .bind(email)
        .bind(birth_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "clients_tenant_phone_key", "client_phone"))?
        .ok_or(AppError::NotFound("client"))
    }

    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM clients WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("client"));
        }
        Ok(())
    }
}
