// src/models/rbac.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// O que sai do banco (Tabela Roles)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(ignore)]
    pub tenant_id: Uuid,

    #[schema(example = "gerente")]
    pub key: String,

    #[schema(example = "Gerente")]
    pub name: String,

    #[schema(example = "Valida cupons e acompanha o painel")]
    pub description: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// O que sai do banco (Tabela Permissions)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: Uuid,

    #[schema(example = "coupons:validate")]
    pub slug: String,

    #[schema(example = "Validar cupons no caixa")]
    pub description: String,

    #[schema(example = "COUPONS")]
    pub module: String,
}

/// Catálogo de permissões do sistema: (slug, descrição, módulo).
pub const PERMISSION_CATALOGUE: &[(&str, &str, &str)] = &[
    ("tenants:manage", "Editar dados e logo da loja", "TENANTS"),
    ("users:read", "Ver usuários e cargos", "USERS"),
    ("users:write", "Gerenciar usuários e cargos", "USERS"),
    ("attendants:read", "Ver atendentes, metas e desempenho", "ATTENDANTS"),
    ("attendants:write", "Gerenciar atendentes, metas e premiações", "ATTENDANTS"),
    ("surveys:read", "Ver pesquisas", "SURVEYS"),
    ("surveys:write", "Gerenciar pesquisas", "SURVEYS"),
    ("responses:read", "Ver respostas e tratativas", "SURVEYS"),
    ("clients:read", "Ver clientes", "CLIENTS"),
    ("clients:write", "Gerenciar clientes", "CLIENTS"),
    ("coupons:read", "Ver cupons", "COUPONS"),
    ("coupons:write", "Emitir e cancelar cupons, gerenciar recompensas", "COUPONS"),
    ("coupons:validate", "Validar cupons no caixa", "COUPONS"),
    ("dashboard:read", "Ver o painel de indicadores", "DASHBOARD"),
    ("treatments:write", "Mover tratativas no quadro", "TREATMENTS"),
    ("integrations:write", "Configurar integrações e templates", "INTEGRATIONS"),
];

/// Chave de cargo: minúsculas, dígitos, `_` e `-`.
pub fn validate_role_key(key: &str) -> Result<(), ValidationError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_key"))
    }
}

// O Payload para criar um cargo
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRolePayload {
    #[validate(custom(function = "validate_role_key"))]
    #[schema(example = "caixa")]
    pub key: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Caixa")]
    pub name: String,

    #[schema(example = "Pode apenas validar cupons")]
    pub description: Option<String>,

    #[schema(example = json!(["coupons:read", "coupons:validate"]))]
    pub permissions: Vec<String>,
}

// Resposta completa (Cargo + Lista de Permissões)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    #[serde(flatten)]
    pub role: Role,

    #[schema(example = json!(["coupons:read", "coupons:validate"]))]
    pub permissions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_slugs_are_unique_and_namespaced() {
        let mut slugs: Vec<_> = PERMISSION_CATALOGUE.iter().map(|(slug, _, _)| *slug).collect();
        assert!(slugs.iter().all(|s| s.contains(':')));
        slugs.sort();
        slugs.dedup();
        assert_eq!(slugs.len(), PERMISSION_CATALOGUE.len());
    }

    #[test]
    fn role_keys_are_slug_like() {
        assert!(validate_role_key("caixa").is_ok());
        assert!(validate_role_key("gerente_2").is_ok());
        assert!(validate_role_key("").is_err());
        assert!(validate_role_key("Gerente").is_err());
        assert!(validate_role_key("com espaço").is_err());
    }
}
