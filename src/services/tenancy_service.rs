// src/services/tenancy_service.rs

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::{
    common::error::AppError,
    db::{RbacRepository, TenantRepository, UserRepository},
    models::{
        auth::User,
        rbac::Role,
        tenancy::{Tenant, TenantMember},
    },
    services::auth::hash_password,
};

pub const ADMIN_ROLE_KEY: &str = "admin";
const ADMIN_ROLE_NAME: &str = "Administrador";

/// "Cantina D'Itália 2" -> "cantina-d-italia-2"
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        let c = match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        };
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[derive(Clone)]
pub struct TenantService {
    tenant_repo: TenantRepository,
    rbac_repo: RbacRepository,
    user_repo: UserRepository,
    pool: PgPool, // Usamos a pool para iniciar transações
}

impl TenantService {
    pub fn new(
        tenant_repo: TenantRepository,
        rbac_repo: RbacRepository,
        user_repo: UserRepository,
        pool: PgPool,
    ) -> Self {
        Self {
            tenant_repo,
            rbac_repo,
            user_repo,
            pool,
        }
    }

    /// Cria a loja, o cargo "admin" com todas as permissões e vincula o
    /// criador como membro. Tudo ou nada.
    pub async fn create_tenant_with_owner(
        &self,
        name: &str,
        slug: Option<&str>,
        owner_id: Uuid,
    ) -> Result<Tenant, AppError> {
        let slug = slug
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(slugify)
            .unwrap_or_else(|| slugify(name));

        if slug.is_empty() {
            let mut errors = ValidationErrors::new();
            errors.add("slug", ValidationError::new("invalid_slug"));
            return Err(AppError::ValidationError(errors));
        }

        // 1. Inicia a transação
        let mut tx = self.pool.begin().await?;

        // 2. Cria a loja
        let new_tenant = self.tenant_repo.create_tenant(&mut *tx, name.trim(), &slug).await?;

        // 3. Cargo de administrador com o catálogo completo
        let admin_role = self.ensure_admin_role(&mut *tx, new_tenant.id).await?;

        // 4. O criador vira membro com esse cargo
        self.tenant_repo
            .add_member_to_tenant(&mut *tx, new_tenant.id, owner_id, admin_role.id)
            .await?;

        // 5. Commit
        tx.commit().await?;

        tracing::info!(tenant_id = %new_tenant.id, slug = %new_tenant.slug, "Loja criada");
        Ok(new_tenant)
    }

    /// Garante o cargo "admin" da loja com todas as permissões do sistema.
    /// Idempotente: reaproveita o cargo existente e só acrescenta vínculos.
    pub async fn ensure_admin_role(&self, conn: &mut PgConnection, tenant_id: Uuid) -> Result<Role, AppError> {
        let role = match self.rbac_repo.find_role_by_key(&mut *conn, tenant_id, ADMIN_ROLE_KEY).await? {
            Some(role) => role,
            None => {
                self.rbac_repo
                    .create_role(
                        &mut *conn,
                        tenant_id,
                        ADMIN_ROLE_KEY,
                        ADMIN_ROLE_NAME,
                        Some("Acesso total administrativo (gerado automaticamente)"),
                    )
                    .await?
            }
        };

        let all_permissions = self.rbac_repo.list_all_permissions(&mut *conn).await?;
        let all_perm_ids: Vec<Uuid> = all_permissions.iter().map(|p| p.id).collect();

        if !all_perm_ids.is_empty() {
            self.rbac_repo
                .assign_permissions(&mut *conn, role.id, &all_perm_ids)
                .await?;
        }
        Ok(role)
    }

    /// Superadmin enxerga todas as lojas; os demais, só as suas.
    pub async fn list_visible_tenants(&self, user: &User) -> Result<Vec<Tenant>, AppError> {
        if user.is_superadmin {
            self.tenant_repo.list_all().await
        } else {
            self.tenant_repo.list_for_user(user.id).await
        }
    }

    pub async fn update_tenant(
        &self,
        tenant_id: Uuid,
        name: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<Tenant, AppError> {
        self.tenant_repo
            .update_tenant(tenant_id, name.map(str::trim), is_active)
            .await
    }

    pub async fn set_logo(&self, tenant_id: Uuid, logo_url: &str) -> Result<Tenant, AppError> {
        self.tenant_repo.update_logo(tenant_id, logo_url).await
    }

    // =========================================================================
    //  MEMBROS
    // =========================================================================

    pub async fn list_members(&self, tenant_id: Uuid) -> Result<Vec<TenantMember>, AppError> {
        self.tenant_repo.list_members(tenant_id).await
    }

    /// Vincula um usuário à loja. Se o e-mail ainda não existe, cria a conta
    /// com a senha informada; se existe, apenas vincula (a senha é ignorada).
    pub async fn add_member(
        &self,
        tenant_id: Uuid,
        email: &str,
        full_name: &str,
        password: &str,
        role_id: Uuid,
    ) -> Result<TenantMember, AppError> {
        // O cargo precisa ser da própria loja
        let role = self.rbac_repo.find_role(tenant_id, role_id).await?;

        let user = match self.user_repo.find_by_email(email).await? {
            Some(user) => user,
            None => {
                let hashed = hash_password(password).await?;
                self.user_repo
                    .create_user(&self.pool, email, &hashed, full_name, false)
                    .await?
            }
        };

        self.tenant_repo
            .add_member_to_tenant(&self.pool, tenant_id, user.id, role.id)
            .await?;

        self.list_members(tenant_id)
            .await?
            .into_iter()
            .find(|m| m.user_id == user.id)
            .ok_or(AppError::NotFound("member"))
    }

    pub async fn remove_member(&self, tenant_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        self.tenant_repo.deactivate_member(tenant_id, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_ascii_and_dashed() {
        assert_eq!(slugify("Restaurante Demo"), "restaurante-demo");
        assert_eq!(slugify("  Cantina D'Itália 2 "), "cantina-d-italia-2");
        assert_eq!(slugify("Pão & Café!!"), "pao-cafe");
    }

    #[test]
    fn slug_of_symbols_only_is_empty() {
        assert_eq!(slugify("!!!"), "");
    }
}
