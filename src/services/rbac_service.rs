// src/services/rbac_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::RbacRepository,
    models::{
        auth::User,
        rbac::{Permission, RoleResponse, PERMISSION_CATALOGUE},
    },
};

#[derive(Clone)]
pub struct RbacService {
    repo: RbacRepository,
    pool: PgPool,
}

impl RbacService {
    pub fn new(repo: RbacRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    /// Grava o catálogo de permissões do sistema (idempotente, roda no boot).
    pub async fn sync_permission_catalogue(&self) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for (slug, description, module) in PERMISSION_CATALOGUE {
            self.repo.upsert_permission(&mut *tx, slug, description, module).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn create_role_with_permissions(
        &self,
        tenant_id: Uuid,
        key: &str,
        name: &str,
        description: Option<&str>,
        permission_slugs: &[String],
    ) -> Result<RoleResponse, AppError> {
        // 1. Inicia Transação
        let mut tx = self.pool.begin().await?;

        // 2. Cria o Cargo
        let role = self.repo.create_role(&mut *tx, tenant_id, key, name, description).await?;

        // 3. Resolve Slugs ("coupons:read") para IDs; slugs desconhecidos ficam de fora
        let permissions = self.repo.find_permissions_by_slugs(&mut *tx, permission_slugs).await?;

        let permission_ids: Vec<Uuid> = permissions.iter().map(|p| p.id).collect();
        let valid_slugs: Vec<String> = permissions.into_iter().map(|p| p.slug).collect();

        // 4. Salva o Vínculo
        if !permission_ids.is_empty() {
            self.repo.assign_permissions(&mut *tx, role.id, &permission_ids).await?;
        }

        // 5. Commit
        tx.commit().await?;

        Ok(RoleResponse {
            role,
            permissions: valid_slugs,
        })
    }

    pub async fn list_roles(&self, tenant_id: Uuid) -> Result<Vec<RoleResponse>, AppError> {
        let roles = self.repo.list_roles(tenant_id).await?;
        let mut response = Vec::with_capacity(roles.len());
        for role in roles {
            let permissions = self.repo.role_permission_slugs(role.id).await?;
            response.push(RoleResponse { role, permissions });
        }
        Ok(response)
    }

    pub async fn list_system_permissions(&self) -> Result<Vec<Permission>, AppError> {
        self.repo.list_all_permissions(&self.pool).await
    }

    /// Superadmin passa direto; os demais precisam da permissão pelo cargo na loja.
    pub async fn user_can(&self, user: &User, tenant_id: Uuid, slug: &str) -> Result<bool, AppError> {
        if user.is_superadmin {
            return Ok(true);
        }
        self.repo.user_has_permission(user.id, tenant_id, slug).await
    }
}
