// src/services/treatment_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::TreatmentRepository,
    models::treatment::{place_card, Treatment, TreatmentBoard, TreatmentStatus},
};

#[derive(Clone)]
pub struct TreatmentService {
    repo: TreatmentRepository,
    pool: PgPool,
}

impl TreatmentService {
    pub fn new(repo: TreatmentRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    pub async fn board(&self, tenant_id: Uuid) -> Result<TreatmentBoard, AppError> {
        let cards = self.repo.list(tenant_id).await?;
        Ok(TreatmentBoard::from_cards(cards))
    }

    /// Move o cartão e renumera as colunas envolvidas (0..n, sem buracos).
    pub async fn move_card(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        status: TreatmentStatus,
        position: Option<i32>,
        notes: Option<&str>,
    ) -> Result<Treatment, AppError> {
        let mut tx = self.pool.begin().await?;
        self.repo.lock_board(&mut *tx, tenant_id).await?;

        let previous = self.repo.current_status(&mut *tx, tenant_id, id).await?;
        let target = self.repo.column_ids(&mut *tx, tenant_id, status).await?;
        let target = place_card(&target, id, position);

        self.repo.update_card(&mut *tx, tenant_id, id, status, notes).await?;

        if previous != status {
            // Fecha o buraco deixado na coluna de origem
            let source = self.repo.column_ids(&mut *tx, tenant_id, previous).await?;
            self.repo.renumber(&mut *tx, tenant_id, &source).await?;
        }
        self.repo.renumber(&mut *tx, tenant_id, &target).await?;

        tx.commit().await?;

        let card = self.repo.find(tenant_id, id).await?;
        tracing::info!(treatment_id = %id, status = ?status, position = card.position, "Tratativa movida");
        Ok(card)
    }
}
