// src/services/loyalty_service.rs

use chrono::Utc;
use sqlx::{Connection, PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{Page, Pagination},
    },
    db::{loyalty_repo::RewardInput, ClientRepository, LoyaltyRepository},
    models::loyalty::{generate_coupon_code, normalize_coupon_code, Coupon, CouponStatus, Reward},
};

// Tentativas de gerar um código livre antes de desistir
const CODE_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct LoyaltyService {
    repo: LoyaltyRepository,
    client_repo: ClientRepository,
    pool: PgPool,
}

impl LoyaltyService {
    pub fn new(repo: LoyaltyRepository, client_repo: ClientRepository, pool: PgPool) -> Self {
        Self { repo, client_repo, pool }
    }

    // =========================================================================
    //  RECOMPENSAS
    // =========================================================================

    pub async fn create_reward(&self, tenant_id: Uuid, input: &RewardInput<'_>) -> Result<Reward, AppError> {
        self.repo.create_reward(tenant_id, input).await
    }

    pub async fn list_rewards(&self, tenant_id: Uuid) -> Result<Vec<Reward>, AppError> {
        self.repo.list_rewards(tenant_id).await
    }

    pub async fn get_reward(&self, tenant_id: Uuid, id: Uuid) -> Result<Reward, AppError> {
        self.repo.find_reward(&self.pool, tenant_id, id).await
    }

    pub async fn update_reward(&self, tenant_id: Uuid, id: Uuid, input: &RewardInput<'_>) -> Result<Reward, AppError> {
        self.repo.update_reward(tenant_id, id, input).await
    }

    pub async fn delete_reward(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.repo.delete_reward(tenant_id, id).await
    }

    // =========================================================================
    //  EMISSÃO
    // =========================================================================

    /// Emite um cupom dentro da transação de quem chama. Cada tentativa roda
    /// num savepoint, então uma colisão de código não aborta a transação externa.
    pub async fn issue_in(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        reward: &Reward,
        client_id: Uuid,
        response_id: Option<Uuid>,
    ) -> Result<Coupon, AppError> {
        let (valid_from, expires_at) = reward.coupon_window(Utc::now())?;

        for _ in 0..CODE_ATTEMPTS {
            let code = generate_coupon_code();
            let mut savepoint = conn.begin().await?;

            let inserted = self
                .repo
                .insert_coupon(
                    &mut *savepoint,
                    tenant_id,
                    reward.id,
                    client_id,
                    response_id,
                    &code,
                    valid_from,
                    expires_at,
                )
                .await;

            match inserted {
                Ok(id) => {
                    savepoint.commit().await?;
                    let coupon = self.repo.find_coupon(&mut *conn, tenant_id, id).await?;
                    tracing::info!(coupon_id = %id, code = %coupon.code, client_id = %client_id, "Cupom emitido");
                    return Ok(coupon);
                }
                Err(AppError::Conflict("coupon_code")) => {
                    savepoint.rollback().await?;
                    tracing::warn!("Colisão de código de cupom, tentando novamente");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Conflict("coupon_code"))
    }

    /// Emissão manual pelo painel.
    pub async fn issue_manual(&self, tenant_id: Uuid, client_id: Uuid, reward_id: Uuid) -> Result<Coupon, AppError> {
        let mut tx = self.pool.begin().await?;

        self.client_repo.find(&mut *tx, tenant_id, client_id).await?;
        let reward = self.repo.find_reward(&mut *tx, tenant_id, reward_id).await?;
        if !reward.is_active {
            return Err(AppError::RewardInactive);
        }

        let coupon = self.issue_in(&mut *tx, tenant_id, &reward, client_id, None).await?;
        tx.commit().await?;

        Ok(coupon.resolved(Utc::now()))
    }

    // =========================================================================
    //  CONSULTA
    // =========================================================================

    pub async fn list_coupons(
        &self,
        tenant_id: Uuid,
        status: Option<CouponStatus>,
        search: Option<&str>,
        pagination: Pagination,
    ) -> Result<Page<Coupon>, AppError> {
        let (items, total) = self
            .repo
            .list_coupons(tenant_id, status, search, None, pagination)
            .await?;
        let now = Utc::now();
        let items = items.into_iter().map(|c| c.resolved(now)).collect();
        Ok(Page::new(items, total, pagination))
    }

    pub async fn list_client_coupons(
        &self,
        tenant_id: Uuid,
        client_id: Uuid,
        pagination: Pagination,
    ) -> Result<Page<Coupon>, AppError> {
        self.client_repo.find(&self.pool, tenant_id, client_id).await?;
        let (items, total) = self
            .repo
            .list_coupons(tenant_id, None, None, Some(client_id), pagination)
            .await?;
        let now = Utc::now();
        let items = items.into_iter().map(|c| c.resolved(now)).collect();
        Ok(Page::new(items, total, pagination))
    }

    pub async fn get_coupon(&self, tenant_id: Uuid, id: Uuid) -> Result<Coupon, AppError> {
        let coupon = self.repo.find_coupon(&self.pool, tenant_id, id).await?;
        Ok(coupon.resolved(Utc::now()))
    }

    pub async fn find_by_code(&self, tenant_id: Uuid, code: &str) -> Result<Coupon, AppError> {
        let coupon = self
            .repo
            .find_coupon_by_code(tenant_id, &normalize_coupon_code(code))
            .await?;
        Ok(coupon.resolved(Utc::now()))
    }

    // =========================================================================
    //  TRANSIÇÕES
    // =========================================================================

    /// Baixa no caixa: só cupons efetivamente ativos.
    pub async fn validate(&self, tenant_id: Uuid, code: &str, user_id: Uuid) -> Result<Coupon, AppError> {
        let coupon = self.find_by_code(tenant_id, code).await?;
        coupon.ensure_redeemable()?;

        if !self.repo.redeem_coupon(tenant_id, coupon.id, user_id).await? {
            // Outra validação chegou antes (ou o cupom venceu no meio do caminho)
            let current = self.get_coupon(tenant_id, coupon.id).await?;
            return Err(AppError::CouponNotRedeemable(current.status.as_str().to_string()));
        }

        tracing::info!(coupon_id = %coupon.id, code = %coupon.code, "Cupom validado");
        self.get_coupon(tenant_id, coupon.id).await
    }

    pub async fn cancel(&self, tenant_id: Uuid, id: Uuid, reason: &str) -> Result<Coupon, AppError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::CancelReasonRequired);
        }

        let coupon = self.get_coupon(tenant_id, id).await?;
        coupon.ensure_cancelable()?;

        if !self.repo.cancel_coupon(tenant_id, id, reason).await? {
            let current = self.get_coupon(tenant_id, id).await?;
            return Err(AppError::CouponNotCancelable(current.status.as_str().to_string()));
        }

        tracing::info!(coupon_id = %id, reason = %reason, "Cupom cancelado");
        self.get_coupon(tenant_id, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    // Pool sem conexão: os testes abaixo falham antes de chegar ao banco
    fn service() -> LoyaltyService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        LoyaltyService::new(
            LoyaltyRepository::new(pool.clone()),
            ClientRepository::new(pool.clone()),
            pool,
        )
    }

    #[tokio::test]
    async fn cancel_requires_a_reason() {
        for reason in ["", "   ", "\n\t"] {
            let err = service()
                .cancel(Uuid::new_v4(), Uuid::new_v4(), reason)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::CancelReasonRequired), "{reason:?}: {err:?}");
            assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        }
    }
}
