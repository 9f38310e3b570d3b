// src/services/integration_service.rs

use std::{collections::HashMap, sync::Arc};

use serde_json::Value;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{integration_repo::ReviewUpsert, IntegrationRepository},
    models::integrations::{
        merge_settings, missing_variables, render_template, GmbReview, IntegrationProvider, IntegrationSettings, TemplateKind,
        WhatsAppTemplate,
    },
    services::gateways::{GmbGateway, GmbLocation, WhatsAppGateway},
};

/// Resultado do disparo de teste de um template.
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateTestResult {
    pub message_id: String,
    pub rendered: String,
    /// Variáveis do template que não vieram no pedido
    pub missing_variables: Vec<String>,
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSyncResult {
    pub fetched: usize,
    pub upserted: u64,
}

#[derive(Clone)]
pub struct IntegrationService {
    repo: IntegrationRepository,
    whatsapp: Arc<dyn WhatsAppGateway>,
    gmb: Arc<dyn GmbGateway>,
}

impl IntegrationService {
    pub fn new(repo: IntegrationRepository, whatsapp: Arc<dyn WhatsAppGateway>, gmb: Arc<dyn GmbGateway>) -> Self {
        Self { repo, whatsapp, gmb }
    }

    /// Configuração habilitada do provedor, ou erro de "não configurado".
    async fn enabled_settings(
        &self,
        tenant_id: Uuid,
        provider: IntegrationProvider,
    ) -> Result<IntegrationSettings, AppError> {
        self.repo
            .find_settings(tenant_id, provider)
            .await?
            .filter(|s| s.is_enabled)
            .ok_or_else(|| AppError::IntegrationNotConfigured(provider.as_str().to_string()))
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
        self.repo
            .create_template(tenant_id, name.trim(), kind, body, is_active)
            .await
    }

    pub async fn list_templates(&self, tenant_id: Uuid) -> Result<Vec<WhatsAppTemplate>, AppError> {
        self.repo.list_templates(tenant_id).await
    }

    pub async fn get_template(&self, tenant_id: Uuid, id: Uuid) -> Result<WhatsAppTemplate, AppError> {
        self.repo.find_template(tenant_id, id).await
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
        self.repo
            .update_template(tenant_id, id, name.trim(), kind, body, is_active)
            .await
    }

    pub async fn delete_template(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.repo.delete_template(tenant_id, id).await
    }

    /// Renderiza o template e envia para `phone` com as credenciais da loja.
    pub async fn send_test(
        &self,
        tenant_id: Uuid,
        template_id: Uuid,
        phone: &str,
        variables: &HashMap<String, String>,
    ) -> Result<TemplateTestResult, AppError> {
        let template = self.repo.find_template(tenant_id, template_id).await?;
        let settings = self.enabled_settings(tenant_id, IntegrationProvider::Whatsapp).await?;

        let (Some(phone_number_id), Some(access_token)) =
            (settings.setting("phoneNumberId"), settings.setting("accessToken"))
        else {
            return Err(AppError::IntegrationNotConfigured(
                IntegrationProvider::Whatsapp.as_str().to_string(),
            ));
        };

        let rendered = render_template(&template.body, variables);
        let missing = missing_variables(&template.body, variables);
        if !missing.is_empty() {
            tracing::warn!(template_id = %template_id, missing = ?missing, "Template enviado com variáveis vazias");
        }
        let message_id = self
            .whatsapp
            .send_text(phone_number_id, access_token, phone.trim(), &rendered)
            .await?;

        tracing::info!(template_id = %template_id, message_id = %message_id, "Template de teste enviado");
        Ok(TemplateTestResult {
            message_id,
            rendered,
            missing_variables: missing,
        })
    }

    // =========================================================================
    //  CONFIGURAÇÕES
    // =========================================================================

    /// Configuração mascarada. Provedor nunca salvo volta vazio e desabilitado.
    pub async fn get_settings(
        &self,
        tenant_id: Uuid,
        provider: IntegrationProvider,
    ) -> Result<IntegrationSettings, AppError> {
        let settings = self.repo.find_settings(tenant_id, provider).await?;
        Ok(match settings {
            Some(s) => s.masked(),
            None => IntegrationSettings {
                tenant_id,
                provider,
                settings: Value::Object(Default::default()),
                is_enabled: false,
                updated_at: chrono::Utc::now(),
            },
        })
    }

    pub async fn put_settings(
        &self,
        tenant_id: Uuid,
        provider: IntegrationProvider,
        incoming: Value,
        is_enabled: bool,
    ) -> Result<IntegrationSettings, AppError> {
        let previous = self.repo.find_settings(tenant_id, provider).await?;
        let merged = merge_settings(previous.as_ref().map(|p| &p.settings), incoming);

        let saved = self
            .repo
            .upsert_settings(tenant_id, provider, &merged, is_enabled)
            .await?;

        tracing::info!(provider = provider.as_str(), enabled = is_enabled, "Integração atualizada");
        Ok(saved.masked())
    }

    // =========================================================================
    //  GOOGLE MY BUSINESS
    // =========================================================================

    pub async fn list_reviews(&self, tenant_id: Uuid) -> Result<Vec<GmbReview>, AppError> {
        self.repo.list_reviews(tenant_id).await
    }

    pub async fn sync_reviews(&self, tenant_id: Uuid) -> Result<ReviewSyncResult, AppError> {
        let settings = self
            .enabled_settings(tenant_id, IntegrationProvider::GoogleMyBusiness)
            .await?;
        let location = gmb_location(&settings)?;

        let reviews: Vec<ReviewUpsert> = self.gmb.fetch_reviews(&location).await?;
        let upserted = self.repo.upsert_reviews(tenant_id, &reviews).await?;

        tracing::info!(fetched = reviews.len(), upserted, "Avaliações do Google sincronizadas");
        Ok(ReviewSyncResult {
            fetched: reviews.len(),
            upserted,
        })
    }

    /// Publica a resposta no Google e só então grava localmente.
    pub async fn reply_review(&self, tenant_id: Uuid, id: Uuid, comment: &str) -> Result<GmbReview, AppError> {
        let review = self.repo.find_review(tenant_id, id).await?;
        let settings = self
            .enabled_settings(tenant_id, IntegrationProvider::GoogleMyBusiness)
            .await?;
        let location = gmb_location(&settings)?;

        let comment = comment.trim();
        self.gmb
            .post_reply(&location, &review.external_id, comment)
            .await?;

        self.repo.set_reply(tenant_id, id, comment).await
    }
}

fn gmb_location(settings: &IntegrationSettings) -> Result<GmbLocation<'_>, AppError> {
    match (
        settings.setting("accountId"),
        settings.setting("locationId"),
        settings.setting("accessToken"),
    ) {
        (Some(account_id), Some(location_id), Some(access_token)) => Ok(GmbLocation {
            account_id,
            location_id,
            access_token,
        }),
        _ => Err(AppError::IntegrationNotConfigured(
            IntegrationProvider::GoogleMyBusiness.as_str().to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn settings(value: Value) -> IntegrationSettings {
        IntegrationSettings {
            tenant_id: Uuid::nil(),
            provider: IntegrationProvider::GoogleMyBusiness,
            settings: value,
            is_enabled: true,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn gmb_location_requires_all_fields() {
        let complete = settings(json!({"accountId": "1", "locationId": "2", "accessToken": "t"}));
        let location = gmb_location(&complete).unwrap();
        assert_eq!(location.account_id, "1");
        assert_eq!(location.location_id, "2");

        let blank_token = settings(json!({"accountId": "1", "locationId": "2", "accessToken": " "}));
        assert!(matches!(
            gmb_location(&blank_token),
            Err(AppError::IntegrationNotConfigured(p)) if p == "google_my_business"
        ));
    }
}
