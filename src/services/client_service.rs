// src/services/client_service.rs

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{Page, Pagination},
    },
    db::ClientRepository,
    models::client::{Client, ClientListEntry},
};

#[derive(Clone)]
pub struct ClientService {
    repo: ClientRepository,
    pool: PgPool,
}

impl ClientService {
    pub fn new(repo: ClientRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        search: Option<&str>,
        pagination: Pagination,
    ) -> Result<Page<ClientListEntry>, AppError> {
        let (items, total) = self.repo.list(tenant_id, search, pagination).await?;
        Ok(Page::new(items, total, pagination))
    }

    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Client, AppError> {
        self.repo.find(&self.pool, tenant_id, id).await
    }

    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        name: &str,
        phone: &str,
        email: Option<&str>,
        birth_date: Option<NaiveDate>,
    ) -> Result<Client, AppError> {
        self.repo
            .update(tenant_id, id, name.trim(), phone.trim(), email, birth_date)
            .await
    }

    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.repo.delete(tenant_id, id).await
    }
}
