// src/models/loyalty.rs

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;

// Limites aceitos na configuração de uma recompensa
pub const MAX_VALIDITY_DAYS: i32 = 3650;
pub const MAX_ACTIVATION_DELAY_HOURS: i32 = 8760;

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "reward_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    PercentageDiscount,
    FixedDiscount,
    Gift,
}

// No banco só existem active/used/canceled; pending e expired são derivados
// das datas no momento da leitura (ver `CouponStatus::effective`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "coupon_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CouponStatus {
    Active,
    Pending,
    Used,
    Expired,
    Canceled,
}

impl CouponStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CouponStatus::Active => "active",
            CouponStatus::Pending => "pending",
            CouponStatus::Used => "used",
            CouponStatus::Expired => "expired",
            CouponStatus::Canceled => "canceled",
        }
    }

    pub fn effective(
        stored: CouponStatus,
        valid_from: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> CouponStatus {
        match stored {
            CouponStatus::Used | CouponStatus::Canceled => stored,
            _ if now >= expires_at => CouponStatus::Expired,
            _ if now < valid_from => CouponStatus::Pending,
            _ => CouponStatus::Active,
        }
    }

    pub fn can_redeem(self) -> bool {
        self == CouponStatus::Active
    }

    pub fn can_cancel(self) -> bool {
        matches!(self, CouponStatus::Active | CouponStatus::Pending)
    }
}

// --- RECOMPENSA ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Sobremesa grátis")]
    pub name: String,
    pub description: Option<String>,
    pub reward_type: RewardType,
    #[schema(value_type = f64, example = 10.0)]
    pub value: Decimal,
    #[schema(example = 30)]
    pub validity_days: i32,
    #[schema(example = 24)]
    pub activation_delay_hours: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reward {
    /// Janela de validade de um cupom emitido em `issued_at`.
    pub fn coupon_window(
        &self,
        issued_at: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
        let valid_from = Duration::try_hours(self.activation_delay_hours as i64)
            .and_then(|delay| issued_at.checked_add_signed(delay));
        let expires_at = valid_from.and_then(|from| {
            Duration::try_days(self.validity_days as i64)
                .and_then(|validity| from.checked_add_signed(validity))
        });

        match (valid_from, expires_at) {
            (Some(valid_from), Some(expires_at)) => Ok((valid_from, expires_at)),
            _ => Err(AppError::InternalServerError(anyhow::anyhow!(
                "Janela de validade fora do intervalo de datas (recompensa {})",
                self.id
            ))),
        }
    }
}

// --- CUPOM ---

// Cupom com os nomes já resolvidos (join com recompensa e cliente)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "K7QM2XPA")]
    pub code: String,
    pub status: CouponStatus,
    pub reward_id: Uuid,
    #[schema(example = "Sobremesa grátis")]
    pub reward_name: String,
    pub reward_type: RewardType,
    #[schema(value_type = f64)]
    pub reward_value: Decimal,
    pub client_id: Uuid,
    pub client_name: String,
    pub client_phone: String,
    pub response_id: Option<Uuid>,
    pub valid_from: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub used_by: Option<Uuid>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    pub fn effective_status(&self, now: DateTime<Utc>) -> CouponStatus {
        CouponStatus::effective(self.status, self.valid_from, self.expires_at, now)
    }

    /// Baixa no caixa só para cupom efetivamente ativo.
    pub fn ensure_redeemable(&self) -> Result<(), AppError> {
        if self.status.can_redeem() {
            Ok(())
        } else {
            Err(AppError::CouponNotRedeemable(self.status.as_str().to_string()))
        }
    }

    pub fn ensure_cancelable(&self) -> Result<(), AppError> {
        if self.status.can_cancel() {
            Ok(())
        } else {
            Err(AppError::CouponNotCancelable(self.status.as_str().to_string()))
        }
    }

    /// Troca o status gravado pelo status efetivo antes de devolver à API.
    pub fn resolved(mut self, now: DateTime<Utc>) -> Self {
        self.status = self.effective_status(now);
        self
    }
}

// Alfabeto sem caracteres ambíguos (sem 0/O e 1/I)
pub const COUPON_CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";
pub const COUPON_CODE_LEN: usize = 8;

/// Gera um código a partir dos bytes aleatórios de um UUID v4.
pub fn generate_coupon_code() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    bytes
        .iter()
        .take(COUPON_CODE_LEN)
        .map(|b| COUPON_CODE_ALPHABET[*b as usize % COUPON_CODE_ALPHABET.len()] as char)
        .collect()
}

/// Normaliza o que o caixa digitou: sem espaços, maiúsculo.
pub fn normalize_coupon_code(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hours: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap() + Duration::hours(hours)
    }

    #[test]
    fn stored_terminal_states_are_kept() {
        for stored in [CouponStatus::Used, CouponStatus::Canceled] {
            assert_eq!(CouponStatus::effective(stored, at(0), at(1), at(100)), stored);
        }
    }

    #[test]
    fn active_coupon_is_pending_before_start_and_expired_after_end() {
        let (from, until) = (at(24), at(48));
        assert_eq!(CouponStatus::effective(CouponStatus::Active, from, until, at(0)), CouponStatus::Pending);
        assert_eq!(CouponStatus::effective(CouponStatus::Active, from, until, at(24)), CouponStatus::Active);
        assert_eq!(CouponStatus::effective(CouponStatus::Active, from, until, at(48)), CouponStatus::Expired);
    }

    #[test]
    fn only_active_coupons_are_redeemable() {
        assert!(CouponStatus::Active.can_redeem());
        for s in [CouponStatus::Pending, CouponStatus::Used, CouponStatus::Expired, CouponStatus::Canceled] {
            assert!(!s.can_redeem(), "{s:?}");
        }
    }

    #[test]
    fn cancel_is_allowed_for_active_and_pending() {
        assert!(CouponStatus::Active.can_cancel());
        assert!(CouponStatus::Pending.can_cancel());
        assert!(!CouponStatus::Used.can_cancel());
        assert!(!CouponStatus::Expired.can_cancel());
        assert!(!CouponStatus::Canceled.can_cancel());
    }

    fn gift(validity_days: i32, activation_delay_hours: i32) -> Reward {
        Reward {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Café".into(),
            description: None,
            reward_type: RewardType::Gift,
            value: Decimal::ZERO,
            validity_days,
            activation_delay_hours,
            is_active: true,
            created_at: at(0),
            updated_at: at(0),
        }
    }

    #[test]
    fn reward_window_applies_delay_then_validity() {
        let (from, until) = gift(2, 12).coupon_window(at(0)).unwrap();
        assert_eq!(from, at(12));
        assert_eq!(until, at(12 + 48));
    }

    #[test]
    fn reward_window_out_of_date_range_is_an_error() {
        let result = gift(2_000_000_000, 0).coupon_window(Utc::now());
        assert!(matches!(result, Err(AppError::InternalServerError(_))));

        let result = gift(1, i32::MAX).coupon_window(DateTime::<Utc>::MAX_UTC);
        assert!(result.is_err());
    }

    #[test]
    fn widest_accepted_reward_window_fits() {
        let result = gift(MAX_VALIDITY_DAYS, MAX_ACTIVATION_DELAY_HOURS).coupon_window(Utc::now());
        assert!(result.is_ok());
    }

    fn coupon(valid_from: DateTime<Utc>, expires_at: DateTime<Utc>, stored: CouponStatus) -> Coupon {
        Coupon {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            code: "K7QM2XPA".into(),
            status: stored,
            reward_id: Uuid::new_v4(),
            reward_name: "Café".into(),
            reward_type: RewardType::Gift,
            reward_value: Decimal::ZERO,
            client_id: Uuid::new_v4(),
            client_name: "Ana".into(),
            client_phone: "11999990000".into(),
            response_id: None,
            valid_from,
            expires_at,
            used_at: None,
            used_by: None,
            canceled_at: None,
            cancel_reason: None,
            created_at: at(0),
            updated_at: at(0),
        }
    }

    #[test]
    fn redeeming_a_non_active_coupon_is_a_conflict() {
        let now = at(30);
        let cases = [
            (coupon(at(40), at(48), CouponStatus::Active), "pending"),
            (coupon(at(0), at(48), CouponStatus::Used), "used"),
            (coupon(at(0), at(12), CouponStatus::Active), "expired"),
            (coupon(at(0), at(48), CouponStatus::Canceled), "canceled"),
        ];

        for (c, expected) in cases {
            let err = c.resolved(now).ensure_redeemable().unwrap_err();
            assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);
            assert!(matches!(err, AppError::CouponNotRedeemable(ref s) if s == expected), "{err:?}");
        }

        assert!(coupon(at(0), at(48), CouponStatus::Active).resolved(now).ensure_redeemable().is_ok());
    }

    #[test]
    fn only_open_coupons_can_be_canceled() {
        let now = at(30);
        assert!(coupon(at(40), at(48), CouponStatus::Active).resolved(now).ensure_cancelable().is_ok());
        let err = coupon(at(0), at(48), CouponStatus::Used)
            .resolved(now)
            .ensure_cancelable()
            .unwrap_err();
        assert!(matches!(err, AppError::CouponNotCancelable(ref s) if s == "used"));
    }

    #[test]
    fn generated_codes_use_the_unambiguous_alphabet() {
        for _ in 0..50 {
            let code = generate_coupon_code();
            assert_eq!(code.len(), COUPON_CODE_LEN);
            assert!(code.bytes().all(|b| COUPON_CODE_ALPHABET.contains(&b)), "{code}");
        }
    }

    #[test]
    fn typed_codes_are_normalized() {
        assert_eq!(normalize_coupon_code(" k7qm-2xpa "), "K7QM2XPA");
    }
}
