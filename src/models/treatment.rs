// src/models/treatment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "treatment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TreatmentStatus {
    Pending,
    InProgress,
    Resolved,
}

impl TreatmentStatus {
    // Ordem fixa das colunas do quadro
    pub const COLUMNS: [TreatmentStatus; 3] = [
        TreatmentStatus::Pending,
        TreatmentStatus::InProgress,
        TreatmentStatus::Resolved,
    ];
}

// Cartão do quadro, já com os dados da resposta que o originou
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Treatment {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub response_id: Uuid,
    pub status: TreatmentStatus,
    pub position: i32,
    pub notes: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub survey_title: String,
    pub client_name: Option<String>,
    pub client_phone: Option<String>,
    pub attendant_name: Option<String>,
    pub nps_score: Option<i16>,
    pub comment: Option<String>,
    pub responded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentColumn {
    pub status: TreatmentStatus,
    pub cards: Vec<Treatment>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TreatmentBoard {
    pub columns: Vec<TreatmentColumn>,
}

impl TreatmentBoard {
    /// Sempre devolve as três colunas, mesmo vazias, ordenadas por posição.
    pub fn from_cards(cards: Vec<Treatment>) -> Self {
        let mut columns: Vec<TreatmentColumn> = TreatmentStatus::COLUMNS
            .iter()
            .map(|status| TreatmentColumn {
                status: *status,
                cards: Vec::new(),
            })
            .collect();

        for card in cards {
            if let Some(column) = columns.iter_mut().find(|c| c.status == card.status) {
                column.cards.push(card);
            }
        }

        for column in &mut columns {
            column
                .cards
                .sort_by(|a, b| a.position.cmp(&b.position).then(a.created_at.cmp(&b.created_at)));
        }

        Self { columns }
    }
}

/// Nova ordem de uma coluna depois de soltar `card` nela.
///
/// `position` é o índice final do cartão, limitado ao tamanho da coluna. Sem
/// posição, o cartão fica onde estava (mesma coluna) ou vai para o fim.
pub fn place_card(column: &[Uuid], card: Uuid, position: Option<i32>) -> Vec<Uuid> {
    let current = column.iter().position(|id| *id == card);
    let mut ordered: Vec<Uuid> = column.iter().copied().filter(|id| *id != card).collect();

    let index = match position {
        Some(p) => usize::try_from(p).unwrap_or(0),
        None => current.unwrap_or(ordered.len()),
    }
    .min(ordered.len());

    ordered.insert(index, card);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(status: TreatmentStatus, position: i32) -> Treatment {
        Treatment {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            response_id: Uuid::new_v4(),
            status,
            position,
            notes: None,
            resolved_at: None,
            survey_title: "Salão".into(),
            client_name: None,
            client_phone: None,
            attendant_name: None,
            nps_score: Some(3),
            comment: None,
            responded_at: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_board_has_three_columns_in_order() {
        let board = TreatmentBoard::from_cards(vec![]);
        let statuses: Vec<_> = board.columns.iter().map(|c| c.status).collect();
        assert_eq!(statuses, TreatmentStatus::COLUMNS);
    }

    #[test]
    fn cards_are_grouped_and_sorted_by_position() {
        let board = TreatmentBoard::from_cards(vec![
            card(TreatmentStatus::Resolved, 0),
            card(TreatmentStatus::Pending, 2),
            card(TreatmentStatus::Pending, 1),
        ]);

        let pending: Vec<_> = board.columns[0].cards.iter().map(|c| c.position).collect();
        assert_eq!(pending, [1, 2]);
        assert!(board.columns[1].cards.is_empty());
        assert_eq!(board.columns[2].cards.len(), 1);
    }

    #[test]
    fn dropping_on_top_puts_card_first() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        // b vem de outra coluna e é solto acima de todos
        assert_eq!(place_card(&[a, c], b, Some(0)), vec![b, a, c]);
    }

    #[test]
    fn reorder_within_column_shifts_neighbours() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(place_card(&[a, b, c], a, Some(2)), vec![b, c, a]);
        assert_eq!(place_card(&[a, b, c], c, Some(0)), vec![c, a, b]);
    }

    #[test]
    fn missing_position_keeps_place_or_appends() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(place_card(&[a, b, c], b, None), vec![a, b, c]);
        assert_eq!(place_card(&[a, c], b, None), vec![a, c, b]);
    }

    #[test]
    fn position_past_the_end_is_clamped() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(place_card(&[a], b, Some(50)), vec![a, b]);
        assert_eq!(place_card(&[], b, Some(3)), vec![b]);
    }
}
