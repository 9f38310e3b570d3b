// src/db/rbac_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::rbac::{Permission, Role},
};

const ROLE_COLUMNS: &str = "id, tenant_id, key, name, description, created_at, updated_at";

#[derive(Clone)]
pub struct RbacRepository {
    pool: PgPool,
}

impl RbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // 1. Criar o Cargo
    pub async fn create_role<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        key: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Role, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Role>(&format!(
            r#"
            INSERT INTO roles (tenant_id, key, name, description)
            VALUES ($1, $2, $3, $4)
            RETURNING {ROLE_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(key)
        .bind(name)
        .bind(description)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, "roles_tenant_key_key", "role_key"))
    }

    pub async fn find_role_by_key<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        key: &str,
    ) -> Result<Option<Role>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let role = sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE tenant_id = $1 AND key = $2"
        ))
        .bind(tenant_id)
        .bind(key)
        .fetch_optional(executor)
        .await?;
        Ok(role)
    }

    pub async fn find_role(&self, tenant_id: Uuid, role_id: Uuid) -> Result<Role, AppError> {
        sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant_id)
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("role"))
    }

    pub async fn list_roles(&self, tenant_id: Uuid) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE tenant_id = $1 ORDER BY name ASC"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    // 2. Buscar as permissões a partir dos slugs ("coupons:validate" -> UUID)
    pub async fn find_permissions_by_slugs<'e, E>(
        &self,
        executor: E,
        slugs: &[String],
    ) -> Result<Vec<Permission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let permissions = sqlx::query_as::<_, Permission>(
            "SELECT id, slug, description, module FROM permissions WHERE slug = ANY($1) ORDER BY slug",
        )
        .bind(slugs)
        .fetch_all(executor)
        .await?;
        Ok(permissions)
    }

    // 3. Vincular Cargo <-> Permissão (inserção em massa com UNNEST)
    pub async fn assign_permissions<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, unnest($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(permission_ids)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn upsert_permission<'e, E>(
        &self,
        executor: E,
        slug: &str,
        description: &str,
        module: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO permissions (slug, description, module)
            VALUES ($1, $2, $3)
            ON CONFLICT (slug) DO UPDATE SET description = EXCLUDED.description, module = EXCLUDED.module
            "#,
        )
        .bind(slug)
        .bind(description)
        .bind(module)
        .execute(executor)
        .await?;
        Ok(())
    }

    // 4. Listar todas as permissões (para o painel montar a tela)
    pub async fn list_all_permissions<'e, E>(&self, executor: E) -> Result<Vec<Permission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let permissions = sqlx::query_as::<_, Permission>(
            "SELECT id, slug, description, module FROM permissions ORDER BY module, slug",
        )
        .fetch_all(executor)
        .await?;
        Ok(permissions)
    }

    pub async fn role_permission_slugs(&self, role_id: Uuid) -> Result<Vec<String>, AppError> {
        let slugs = sqlx::query_scalar::<_, String>(
            r#"
            SELECT p.slug FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = $1
            ORDER BY p.slug
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(slugs)
    }

    pub async fn user_has_permission(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        permission_slug: &str,
    ) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM tenant_members tm
                JOIN role_permissions rp ON rp.role_id = tm.role_id
                JOIN permissions p ON p.id = rp.permission_id
                WHERE tm.user_id = $1
                  AND tm.tenant_id = $2
                  AND tm.is_active = true
                  AND p.slug = $3
            )
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .bind(permission_slug)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
