use std::collections::HashMap;
use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use crate::models::seat::SeatRow;
use crate::models::{Category, ParseEnumError, Seat};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to load seats: {0}")]
    Database(#[from] sqlx::Error),
    #[error("malformed seat row: {0}")]
    InvalidRow(#[from] ParseEnumError),
}

/// Справочник мест зала. Загружается один раз при старте и дальше только читается.
#[derive(Debug, Clone, Default)]
pub struct SeatCatalog {
    seats: Arc<Vec<Seat>>,
    by_id: Arc<HashMap<i64, usize>>,
}

impl SeatCatalog {
    pub fn new(seats: impl IntoIterator<Item = Seat>) -> Self {
        let mut seats: Vec<Seat> = seats.into_iter().collect();
        seats.sort_by_key(|s| (s.block, s.row_number, s.seat_index, s.id));
        let by_id = seats.iter().enumerate().map(|(i, s)| (s.id, i)).collect();

        Self { seats: Arc::new(seats), by_id: Arc::new(by_id) }
    }

    pub async fn load(pool: &PgPool) -> Result<Self, CatalogError> {
        let rows = sqlx::query_as::<_, SeatRow>(
            "SELECT id, seat_number, block, row_number, seat_index, category FROM seats"
        )
        .fetch_all(pool)
        .await?;

        let seats = rows
            .into_iter()
            .map(Seat::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let catalog = Self::new(seats);
        info!(
            "Seat catalog loaded: {} seats ({} bookable)",
            catalog.len(),
            catalog.bookable_count()
        );
        Ok(catalog)
    }

    pub fn get(&self, seat_id: i64) -> Option<&Seat> {
        self.by_id.get(&seat_id).map(|&i| &self.seats[i])
    }

    /// Все места в порядке блок, ряд, позиция.
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn bookable_count(&self) -> usize {
        self.seats.iter().filter(|s| s.category == Category::Regular).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Block;

    fn seat(id: i64, block: Block, row: i32, index: i32, category: Category) -> Seat {
        Seat {
            id,
            seat_number: format!("{}-{}-{}", if block == Block::Left { "L" } else { "R" }, row, index),
            block,
            row_number: row,
            seat_index: index,
            category,
        }
    }

    #[test]
    fn seats_are_ordered_and_indexed() {
        let catalog = SeatCatalog::new(vec![
            seat(3, Block::Right, 1, 1, Category::Vip),
            seat(2, Block::Left, 3, 2, Category::Regular),
            seat(1, Block::Left, 3, 1, Category::Regular),
        ]);

        let ids: Vec<i64> = catalog.seats().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(catalog.get(3).map(|s| s.seat_number.as_str()), Some("R-1-1"));
        assert!(catalog.get(42).is_none());
        assert_eq!(catalog.bookable_count(), 2);
    }
}
