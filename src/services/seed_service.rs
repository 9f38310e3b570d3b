// src/services/seed_service.rs

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{TenantRepository, UserRepository},
    services::{auth::hash_password, rbac_service::RbacService, tenancy_service::TenantService},
};

pub const DEMO_TENANT_NAME: &str = "Restaurante Demo";
pub const DEMO_TENANT_SLUG: &str = "restaurante-demo";
pub const DEFAULT_ADMIN_EMAILS: &str = "admin@demo.com,suporte@demo.com";

/// Lista de e-mails separados por vírgula, normalizados e sem repetição.
pub fn parse_admin_emails(raw: &str) -> Vec<String> {
    let mut emails: Vec<String> = Vec::new();
    for email in raw.split(',').map(|e| e.trim().to_lowercase()) {
        if !email.is_empty() && !emails.contains(&email) {
            emails.push(email);
        }
    }
    emails
}

/// Popula a base de demonstração. Pode rodar a cada boot: nada é duplicado.
#[derive(Clone)]
pub struct SeedService {
    rbac_service: RbacService,
    tenant_service: TenantService,
    tenant_repo: TenantRepository,
    user_repo: UserRepository,
    pool: PgPool,
}

impl SeedService {
    pub fn new(
        rbac_service: RbacService,
        tenant_service: TenantService,
        tenant_repo: TenantRepository,
        user_repo: UserRepository,
        pool: PgPool,
    ) -> Self {
        Self {
            rbac_service,
            tenant_service,
            tenant_repo,
            user_repo,
            pool,
        }
    }

    pub async fn run(&self, admin_emails: &[String], admin_password: &str) -> Result<(), AppError> {
        tracing::info!("🌱 Rodando seed...");

        // 1. Catálogo de permissões
        self.rbac_service.sync_permission_catalogue().await?;

        // 2. Loja de demonstração
        let tenant = match self.tenant_repo.find_by_slug(&self.pool, DEMO_TENANT_SLUG).await? {
            Some(tenant) => tenant,
            None => {
                let tenant = self
                    .tenant_repo
                    .create_tenant(&self.pool, DEMO_TENANT_NAME, DEMO_TENANT_SLUG)
                    .await?;
                tracing::info!(tenant_id = %tenant.id, "Loja de demonstração criada");
                tenant
            }
        };

        // 3. Cargo admin com tudo
        let mut conn = self.pool.acquire().await?;
        let admin_role = self.tenant_service.ensure_admin_role(&mut conn, tenant.id).await?;
        drop(conn);

        // 4. Contas administrativas; a primeira é superadmin
        let mut hashed: Option<String> = None;
        for (index, email) in admin_emails.iter().enumerate() {
            let user = match self.user_repo.find_by_email(email).await? {
                Some(user) => user,
                None => {
                    let hash = match &hashed {
                        Some(h) => h.clone(),
                        None => {
                            let h = hash_password(admin_password).await?;
                            hashed = Some(h.clone());
                            h
                        }
                    };
                    let user = self
                        .user_repo
                        .create_user(&self.pool, email, &hash, "Administrador", index == 0)
                        .await?;
                    tracing::info!(email = %user.email, superadmin = user.is_superadmin, "Admin criado");
                    user
                }
            };

            self.tenant_repo
                .add_member_to_tenant(&self.pool, tenant.id, user.id, admin_role.id)
                .await?;
        }

        tracing::info!("✅ Seed concluído");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_emails_parse_to_two_admins() {
        assert_eq!(
            parse_admin_emails(DEFAULT_ADMIN_EMAILS),
            vec!["admin@demo.com".to_string(), "suporte@demo.com".to_string()]
        );
    }

    #[test]
    fn blanks_and_duplicates_are_dropped() {
        assert_eq!(
            parse_admin_emails(" A@x.com, ,a@x.com,b@x.com,"),
            vec!["a@x.com".to_string(), "b@x.com".to_string()]
        );
    }
}
