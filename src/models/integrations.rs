// src/models/integrations.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// =============================================================================
//  WHATSAPP
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "template_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    SurveyInvite,
    CouponIssued,
    Birthday,
    Custom,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppTemplate {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "cupom_emitido")]
    pub name: String,
    pub kind: TemplateKind,
    #[schema(example = "Olá {{nome}}! Seu cupom {{codigo}} já está disponível.")]
    pub body: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Substitui `{{variavel}}` pelos valores informados. Espaços dentro das
/// chaves são ignorados; variável sem valor vira texto vazio.
pub fn render_template(body: &str, variables: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(body.len());
    let mut rest = body;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                if let Some(value) = variables.get(name) {
                    out.push_str(value);
                }
                rest = &after[end + 2..];
            }
            None => {
                // "{{" sem fechamento fica como texto literal
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Nomes das variáveis usadas no corpo, na ordem em que aparecem.
pub fn template_variables(body: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut rest = body;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else { break };
        let name = after[..end].trim().to_string();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
        rest = &after[end + 2..];
    }
    names
}

/// Variáveis do corpo que ficaram sem valor (e saíram vazias no texto).
pub fn missing_variables(body: &str, variables: &HashMap<String, String>) -> Vec<String> {
    template_variables(body)
        .into_iter()
        .filter(|name| !variables.contains_key(name))
        .collect()
}

// =============================================================================
//  CONFIGURAÇÕES DE INTEGRAÇÃO
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "integration_provider", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IntegrationProvider {
    Whatsapp,
    GoogleMyBusiness,
    Ifood,
    Rappi,
    UberEats,
}

impl IntegrationProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            IntegrationProvider::Whatsapp => "whatsapp",
            IntegrationProvider::GoogleMyBusiness => "google_my_business",
            IntegrationProvider::Ifood => "ifood",
            IntegrationProvider::Rappi => "rappi",
            IntegrationProvider::UberEats => "uber_eats",
        }
    }
}

// Campos que nunca voltam em claro para o painel
const SECRET_KEYS: &[&str] = &["accessToken", "apiKey", "clientSecret", "webhookSecret"];
const MASK: &str = "********";

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationSettings {
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub provider: IntegrationProvider,
    #[schema(value_type = Object, example = json!({"phoneNumberId": "10987654321", "accessToken": "********"}))]
    pub settings: Value,
    pub is_enabled: bool,
    pub updated_at: DateTime<Utc>,
}

impl IntegrationSettings {
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings
            .get(key)
            .and_then(Value::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn masked(mut self) -> Self {
        if let Some(obj) = self.settings.as_object_mut() {
            for key in SECRET_KEYS {
                if let Some(v) = obj.get_mut(*key) {
                    if v.as_str().is_some_and(|s| !s.is_empty()) {
                        *v = json!(MASK);
                    }
                }
            }
        }
        self
    }
}

/// Ao salvar, um segredo que volta mascarado do painel (ou que nem veio no
/// corpo) mantém o valor antigo. Para apagar, o painel manda `""` ou `null`.
pub fn merge_settings(previous: Option<&Value>, incoming: Value) -> Value {
    let (Some(prev), Value::Object(mut next)) = (previous.and_then(Value::as_object), incoming.clone())
    else {
        return incoming;
    };

    for key in SECRET_KEYS {
        let keep_previous = match next.get(*key) {
            None => true,
            Some(v) => v.as_str() == Some(MASK),
        };
        if !keep_previous {
            continue;
        }
        match prev.get(*key) {
            Some(old) => {
                next.insert(key.to_string(), old.clone());
            }
            None => {
                next.remove(*key);
            }
        }
    }
    Value::Object(next)
}

// =============================================================================
//  GOOGLE MY BUSINESS
// =============================================================================

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GmbReview {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub external_id: String,
    pub reviewer_name: Option<String>,
    #[schema(example = 5)]
    pub star_rating: i16,
    pub comment: Option<String>,
    pub reply: Option<String>,
    pub replied_at: Option<DateTime<Utc>>,
    pub review_created_at: DateTime<Utc>,
    pub synced_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn renders_known_and_blanks_unknown_variables() {
        let body = "Olá {{nome}}! Cupom: {{ codigo }}. {{desconhecida}}Fim";
        let text = render_template(body, &vars(&[("nome", "Ana"), ("codigo", "K7QM2XPA")]));
        assert_eq!(text, "Olá Ana! Cupom: K7QM2XPA. Fim");
    }

    #[test]
    fn unterminated_braces_are_left_as_is() {
        assert_eq!(render_template("Oi {{nome", &vars(&[("nome", "Ana")])), "Oi {{nome");
    }

    #[test]
    fn lists_variables_once_in_order() {
        assert_eq!(
            template_variables("{{b}} {{a}} {{ b }}"),
            vec!["b".to_string(), "a".to_string()]
        );
    }

    #[test]
    fn reports_variables_left_without_value() {
        let body = "Olá {{nome}}, seu cupom {{codigo}} vence em {{validade}}";
        assert_eq!(
            missing_variables(body, &vars(&[("nome", "Ana")])),
            vec!["codigo".to_string(), "validade".to_string()]
        );
        assert!(missing_variables(body, &vars(&[("nome", "Ana"), ("codigo", "X"), ("validade", "1d")])).is_empty());
    }

    #[test]
    fn secrets_are_masked_on_read() {
        let settings = IntegrationSettings {
            tenant_id: Uuid::nil(),
            provider: IntegrationProvider::Whatsapp,
            settings: json!({"phoneNumberId": "123", "accessToken": "segredo"}),
            is_enabled: true,
            updated_at: Utc::now(),
        }
        .masked();

        assert_eq!(settings.settings["accessToken"], MASK);
        assert_eq!(settings.settings["phoneNumberId"], "123");
    }

    #[test]
    fn masked_secret_keeps_previous_value_on_save() {
        let previous = json!({"accessToken": "antigo", "phoneNumberId": "1"});
        let merged = merge_settings(
            Some(&previous),
            json!({"accessToken": MASK, "phoneNumberId": "2"}),
        );
        assert_eq!(merged, json!({"accessToken": "antigo", "phoneNumberId": "2"}));

        let replaced = merge_settings(Some(&previous), json!({"accessToken": "novo"}));
        assert_eq!(replaced["accessToken"], "novo");
    }

    #[test]
    fn omitted_secret_keeps_previous_value_on_save() {
        let previous = json!({"accessToken": "antigo", "phoneNumberId": "1"});
        let merged = merge_settings(Some(&previous), json!({"phoneNumberId": "2"}));
        assert_eq!(merged, json!({"accessToken": "antigo", "phoneNumberId": "2"}));
    }

    #[test]
    fn explicit_empty_secret_clears_it() {
        let previous = json!({"accessToken": "antigo", "apiKey": "chave"});
        let merged = merge_settings(Some(&previous), json!({"accessToken": "", "apiKey": null}));
        assert_eq!(merged, json!({"accessToken": "", "apiKey": null}));
    }
}
