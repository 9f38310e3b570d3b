// src/db/loyalty_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        error::{map_unique_violation, AppError},
        pagination::Pagination,
    },
    models::loyalty::{Coupon, CouponStatus, Reward, RewardType},
};

const REWARD_COLUMNS: &str = r#"
    id, tenant_id, name, description, reward_type, value, validity_days,
    activation_delay_hours, is_active, created_at, updated_at
"#;

const COUPON_SELECT: &str = r#"
    SELECT k.id, k.tenant_id, k.code, k.status,
           k.reward_id, w.name AS reward_name, w.reward_type, w.value AS reward_value,
           k.client_id, c.name AS client_name, c.phone AS client_phone,
           k.response_id, k.valid_from, k.expires_at, k.used_at, k.used_by,
           k.canceled_at, k.cancel_reason, k.created_at, k.updated_at
    FROM coupons k
    JOIN rewards w ON w.id = k.reward_id
    JOIN clients c ON c.id = k.client_id
"#;

// Mesmo critério de `CouponStatus::effective`, para filtrar no SQL
const EFFECTIVE_STATUS_SQL: &str = r#"
    CASE
        WHEN k.status <> 'active' THEN k.status::text
        WHEN k.expires_at <= NOW() THEN 'expired'
        WHEN k.valid_from > NOW() THEN 'pending'
        ELSE 'active'
    END
"#;

/// Campos editáveis de uma recompensa.
pub struct RewardInput<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub reward_type: RewardType,
    pub value: Decimal,
    pub validity_days: i32,
    pub activation_delay_hours: i32,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct LoyaltyRepository {
    pool: PgPool,
}

impl LoyaltyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  RECOMPENSAS
    // =========================================================================

    pub async fn create_reward(&self, tenant_id: Uuid, input: &RewardInput<'_>) -> Result<Reward, AppError> {
        let reward = sqlx::query_as::<_, Reward>(&format!(
            r#"
            INSERT INTO rewards
                (tenant_id, name, description, reward_type, value, validity_days, activation_delay_hours, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {REWARD_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(input.name)
        .bind(input.description)
        .bind(input.reward_type)
        .bind(input.value)
        .bind(input.validity_days)
        .bind(input.activation_delay_hours)
        .bind(input.is_active)
        .fetch_one(&self.pool)
        .await?;
        Ok(reward)
    }

    pub async fn list_rewards(&self, tenant_id: Uuid) -> Result<Vec<Reward>, AppError> {
        let rewards = sqlx::query_as::<_, Reward>(&format!(
            "SELECT {REWARD_COLUMNS} FROM rewards WHERE tenant_id = $1 ORDER BY name ASC"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rewards)
    }

    pub async fn find_reward<'e, E>(&self, executor: E, tenant_id: Uuid, id: Uuid) -> Result<Reward, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Reward>(&format!(
            "SELECT {REWARD_COLUMNS} FROM rewards WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("reward"))
    }

    pub async fn update_reward(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: &RewardInput<'_>,
    ) -> Result<Reward, AppError> {
        sqlx::query_as::<_, Reward>(&format!(
            r#"
            UPDATE rewards
            SET name = $3, description = $4, reward_type = $5, value = $6,
                validity_days = $7, activation_delay_hours = $8, is_active = $9,
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING {REWARD_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(id)
        .bind(input.name)
        .bind(input.description)
        .bind(input.reward_type)
        .bind(input.value)
        .bind(input.validity_days)
        .bind(input.activation_delay_hours)
        .bind(input.is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("reward"))
    }

    /// Recompensa com cupons emitidos não pode sumir: vira conflito.
    pub async fn delete_reward(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM rewards WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_foreign_key_violation() {
                        return AppError::Conflict("reward_in_use");
                    }
                }
                AppError::from(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("reward"));
        }
        Ok(())
    }

    // =========================================================================
    //  CUPONS
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_coupon<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        reward_id: Uuid,
        client_id: Uuid,
        response_id: Option<Uuid>,
        code: &str,
        valid_from: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO coupons (tenant_id, reward_id, client_id, response_id, code, valid_from, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(tenant_id)
        .bind(reward_id)
        .bind(client_id)
        .bind(response_id)
        .bind(code)
        .bind(valid_from)
        .bind(expires_at)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, "coupons_code_key", "coupon_code"))?;
        Ok(id)
    }

    pub async fn find_coupon<'e, E>(&self, executor: E, tenant_id: Uuid, id: Uuid) -> Result<Coupon, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Coupon>(&format!(
            "{COUPON_SELECT} WHERE k.tenant_id = $1 AND k.id = $2"
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("coupon"))
    }

    pub async fn find_coupon_by_code(&self, tenant_id: Uuid, code: &str) -> Result<Coupon, AppError> {
        sqlx::query_as::<_, Coupon>(&format!(
            "{COUPON_SELECT} WHERE k.tenant_id = $1 AND k.code = $2"
        ))
        .bind(tenant_id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("coupon"))
    }

    /// Listagem filtrada pelo status efetivo e pela busca (código ou cliente).
    pub async fn list_coupons(
        &self,
        tenant_id: Uuid,
        status: Option<CouponStatus>,
        search: Option<&str>,
        client_id: Option<Uuid>,
        pagination: Pagination,
    ) -> Result<(Vec<Coupon>, i64), AppError> {
        let status = status.map(CouponStatus::as_str);
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));

        let filter = format!(
            r#"
            WHERE k.tenant_id = $1
              AND ($2::text IS NULL OR {EFFECTIVE_STATUS_SQL} = $2)
              AND ($3::text IS NULL OR k.code ILIKE $3 OR c.name ILIKE $3)
              AND ($4::uuid IS NULL OR k.client_id = $4)
            "#
        );

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM coupons k JOIN clients c ON c.id = k.client_id {filter}"
        ))
        .bind(tenant_id)
        .bind(status)
        .bind(pattern.as_deref())
        .bind(client_id)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, Coupon>(&format!(
            "{COUPON_SELECT} {filter} ORDER BY k.created_at DESC LIMIT $5 OFFSET $6"
        ))
        .bind(tenant_id)
        .bind(status)
        .bind(pattern.as_deref())
        .bind(client_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((items, total))
    }

    /// Baixa condicional: só marca como usado se estiver ativo dentro da janela.
    /// Duas validações simultâneas do mesmo código resultam em uma única baixa.
    pub async fn redeem_coupon(&self, tenant_id: Uuid, id: Uuid, used_by: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET status = 'used', used_at = NOW(), used_by = $3, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
              AND status = 'active' AND valid_from <= NOW() AND expires_at > NOW()
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(used_by)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Cancela cupons ainda não usados e não vencidos (ativos ou pendentes).
    pub async fn cancel_coupon(&self, tenant_id: Uuid, id: Uuid, reason: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET status = 'canceled', canceled_at = NOW(), cancel_reason = $3, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
              AND status = 'active' AND expires_at > NOW()
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
