// src/db/tenancy_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::tenancy::{Tenant, TenantMember},
};

const TENANT_COLUMNS: &str = "id, name, slug, logo_url, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verifica se um utilizador é membro ativo de uma loja ativa.
    /// Esta é a verificação de autorização mais importante.
    pub async fn check_user_tenancy(&self, user_id: Uuid, tenant_id: Uuid) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM tenant_members tm
                JOIN tenants t ON t.id = tm.tenant_id
                WHERE tm.user_id = $1 AND tm.tenant_id = $2
                  AND tm.is_active = true AND t.is_active = true
            )
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn tenant_exists(&self, tenant_id: Uuid) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tenants WHERE id = $1)")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn create_tenant<'e, E>(&self, executor: E, name: &str, slug: &str) -> Result<Tenant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Tenant>(&format!(
            "INSERT INTO tenants (name, slug) VALUES ($1, $2) RETURNING {TENANT_COLUMNS}"
        ))
        .bind(name)
        .bind(slug)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, "tenants_slug_key", "tenant_slug"))
    }

    pub async fn find_by_slug<'e, E>(&self, executor: E, slug: &str) -> Result<Option<Tenant>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(executor)
        .await?;
        Ok(tenant)
    }

    pub async fn find_by_id(&self, tenant_id: Uuid) -> Result<Tenant, AppError> {
        sqlx::query_as::<_, Tenant>(&format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1"))
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("tenant"))
    }

    pub async fn list_all(&self) -> Result<Vec<Tenant>, AppError> {
        let tenants = sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants ORDER BY name ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(tenants)
    }

    /// Lojas ativas em que o usuário é membro ativo.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Tenant>, AppError> {
        let tenants = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT t.id, t.name, t.slug, t.logo_url, t.is_active, t.created_at, t.updated_at
            FROM tenants t
            JOIN tenant_members tm ON tm.tenant_id = t.id
            WHERE tm.user_id = $1 AND tm.is_active = true AND t.is_active = true
            ORDER BY t.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tenants)
    }

    pub async fn update_tenant(
        &self,
        tenant_id: Uuid,
        name: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<Tenant, AppError> {
        sqlx::query_as::<_, Tenant>(&format!(
            r#"
            UPDATE tenants
            SET name = COALESCE($2, name),
                is_active = COALESCE($3, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TENANT_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(name)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("tenant"))
    }

    pub async fn update_logo(&self, tenant_id: Uuid, logo_url: &str) -> Result<Tenant, AppError> {
        sqlx::query_as::<_, Tenant>(&format!(
            "UPDATE tenants SET logo_url = $2, updated_at = NOW() WHERE id = $1 RETURNING {TENANT_COLUMNS}"
        ))
        .bind(tenant_id)
        .bind(logo_url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("tenant"))
    }

    /// Atribui um utilizador à loja com um cargo. Reativa se já existia.
    pub async fn add_member_to_tenant<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO tenant_members (tenant_id, user_id, role_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (tenant_id, user_id)
            DO UPDATE SET role_id = EXCLUDED.role_id, is_active = true
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(role_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn list_members(&self, tenant_id: Uuid) -> Result<Vec<TenantMember>, AppError> {
        let members = sqlx::query_as::<_, TenantMember>(
            r#"
            SELECT u.id AS user_id, u.email, u.full_name, u.profile_picture_url,
                   r.id AS role_id, r.key AS role_key, r.name AS role_name,
                   tm.is_active, tm.created_at
            FROM tenant_members tm
            JOIN users u ON u.id = tm.user_id
            JOIN roles r ON r.id = tm.role_id
            WHERE tm.tenant_id = $1
            ORDER BY u.full_name ASC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    pub async fn deactivate_member(&self, tenant_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE tenant_members SET is_active = false WHERE tenant_id = $1 AND user_id = $2",
        )
        .bind(tenant_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("member"));
        }
        Ok(())
    }
}
