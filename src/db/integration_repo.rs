// src/db/integration_repo.rs

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::integrations::{GmbReview, IntegrationProvider, IntegrationSettings, TemplateKind, WhatsAppTemplate},
};

const TEMPLATE_COLUMNS: &str = "id, tenant_id, name, kind, body, is_active, created_at, updated_at";
const REVIEW_COLUMNS: &str = r#"
    id, tenant_id, external_id, reviewer_name, star_rating, comment, reply,
    replied_at, review_created_at, synced_at
"#;

/// Avaliação como veio do Google, pronta para gravar.
#[derive(Debug, Clone)]
pub struct ReviewUpsert {
    pub external_id: String,
    pub reviewer_name: Option<String>,
    pub star_rating: i16,
    pub comment: Option<String>,
    pub reply: Option<String>,
    pub replied_at: Option<DateTime<Utc>>,
    pub review_created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct IntegrationRepository {
    pool: PgPool,
}

impl IntegrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  TEMPLATES DE WHATSAPP
    // =========================================================================

    pub async fn create_template(
        &self,
        tenant_id: Uuid,
        name: &str,
        kind: TemplateKind,
        body: &str,
        is_active: bool,
    ) -> Result<WhatsAppTemplate, AppError> {
        sqlx::query_as::<_, WhatsAppTemplate>(&format!(
            r#"
            INSERT INTO whatsapp_templates (tenant_id, name, kind, body, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TEMPLATE_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(name)
        .bind(kind)
        .bind(body)
        .bind(is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "whatsapp_templates_tenant_name_key", "template_name"))
    }

    pub async fn list_templates(&self, tenant_id: Uuid) -> Result<Vec<WhatsAppTemplate>, AppError> {
        let templates = sqlx::query_as::<_, WhatsAppTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM whatsapp_templates WHERE tenant_id = $1 ORDER BY name ASC"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(templates)
    }

    pub async fn find_template(&self, tenant_id: Uuid, id: Uuid) -> Result<WhatsAppTemplate, AppError> {
        sqlx::query_as::<_, WhatsAppTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM whatsapp_templates WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("template"))
    }

    pub async fn update_template(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        name: &str,
        kind: TemplateKind,
        body: &str,
        is_active: bool,
    ) -> Result<WhatsAppTemplate, AppError> {
        sqlx::query_as::<_, WhatsAppTemplate>(&format!(
            r#"
            UPDATE whatsapp_templates
            SET name = $3, kind = $4, body = $5, is_active = $6, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING {TEMPLATE_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(id)
        .bind(name)
        .bind(kind)
        .bind(body)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "whatsapp_templates_tenant_name_key", "template_name"))?
        .ok_or(AppError::NotFound("template"))
    }

    pub async fn delete_template(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM whatsapp_templates WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("template"));
        }
        Ok(())
    }

    // =========================================================================
    //  CONFIGURAÇÕES
    // =========================================================================

    pub async fn find_settings(
        &self,
        tenant_id: Uuid,
        provider: IntegrationProvider,
    ) -> Result<Option<IntegrationSettings>, AppError> {
        let settings = sqlx::query_as::<_, IntegrationSettings>(
            r#"
            SELECT tenant_id, provider, settings, is_enabled, updated_at
            FROM integration_settings
            WHERE tenant_id = $1 AND provider = $2
            "#,
        )
        .bind(tenant_id)
        .bind(provider)
        .fetch_optional(&self.pool)
        .await?;
        Ok(settings)
    }

    pub async fn upsert_settings(
        &self,
        tenant_id: Uuid,
        provider: IntegrationProvider,
        settings: &Value,
        is_enabled: bool,
    ) -> Result<IntegrationSettings, AppError> {
        let saved = sqlx::query_as::<_, IntegrationSettings>(
            r#"
            INSERT INTO integration_settings (tenant_id, provider, settings, is_enabled)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id, provider) DO UPDATE
            SET settings = EXCLUDED.settings,
                is_enabled = EXCLUDED.is_enabled,
                updated_at = NOW()
            RETURNING tenant_id, provider, settings, is_enabled, updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(provider)
        .bind(settings)
        .bind(is_enabled)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    // =========================================================================
    //  GOOGLE MY BUSINESS
    // =========================================================================

    pub async fn list_reviews(&self, tenant_id: Uuid) -> Result<Vec<GmbReview>, AppError> {
        let reviews = sqlx::query_as::<_, GmbReview>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM gmb_reviews WHERE tenant_id = $1 ORDER BY review_created_at DESC"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    pub async fn find_review(&self, tenant_id: Uuid, id: Uuid) -> Result<GmbReview, AppError> {
        sqlx::query_as::<_, GmbReview>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM gmb_reviews WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("review"))
    }

    /// Grava o lote sincronizado numa única transação. Retorna quantas linhas mudaram.
    pub async fn upsert_reviews(&self, tenant_id: Uuid, reviews: &[ReviewUpsert]) -> Result<u64, AppError> {
        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;
        let mut affected = 0;

        for review in reviews {
            let result = sqlx::query(
                r#"
                INSERT INTO gmb_reviews
                    (tenant_id, external_id, reviewer_name, star_rating, comment, reply, replied_at, review_created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT ON CONSTRAINT gmb_reviews_tenant_external_key DO UPDATE
                SET reviewer_name = EXCLUDED.reviewer_name,
                    star_rating = EXCLUDED.star_rating,
                    comment = EXCLUDED.comment,
                    reply = EXCLUDED.reply,
                    replied_at = EXCLUDED.replied_at,
                    synced_at = NOW()
                "#,
            )
            .bind(tenant_id)
            .bind(&review.external_id)
            .bind(&review.reviewer_name)
            .bind(review.star_rating)
            .bind(&review.comment)
            .bind(&review.reply)
            .bind(review.replied_at)
            .bind(review.review_created_at)
            .execute(&mut *tx)
            .await?;
            affected += result.rows_affected();
        }

        tx.commit().await?;
        Ok(affected)
    }

    pub async fn set_reply(&self, tenant_id: Uuid, id: Uuid, reply: &str) -> Result<GmbReview, AppError> {
        sqlx::query_as::<_, GmbReview>(&format!(
            r#"
            UPDATE gmb_reviews
            SET reply = $3, replied_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(id)
        .bind(reply)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("review"))
    }
}
