// src/models/client.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Cliente final do restaurante (identificado pelo telefone dentro da loja)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Maria da Silva")]
    pub name: String,
    #[schema(example = "+5511988887777")]
    pub phone: String,
    pub email: Option<String>,
    #[schema(value_type = Option<String>, format = Date, example = "1990-05-20")]
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Linha da listagem, com o histórico resumido
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientListEntry {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub birth_date: Option<NaiveDate>,
    pub responses_count: i64,
    pub coupons_count: i64,
    pub last_response_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
