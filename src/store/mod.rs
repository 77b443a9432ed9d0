//! Хранилище бронирований.
//!
//! `LedgerStore` это всё, что `SeatLedger` требует от постоянного хранилища:
//! атомарная вставка бронирования с заявками, каскадное удаление,
//! поиск по коду билета и учёт сканов. Единственность пары (место, день)
//! обеспечивает реализация, а не вызывающий код.

pub mod memory;
pub mod postgres;

pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

use async_trait::async_trait;

use crate::models::{Attendee, Claim, Day, Reservation, Role};
use crate::services::{LedgerError, TicketCodeGenerator, TicketPayload};

/// Проверенный запрос, готовый к записи. Заявки идут в порядке запроса.
#[derive(Debug, Clone)]
pub struct ReservationDraft {
    pub attendee: Attendee,
    pub days: Vec<Day>,
    pub claims: Vec<Claim>,
}

impl ReservationDraft {
    pub fn qr_data(&self, ticket_code: &str) -> String {
        TicketPayload::encode(ticket_code, &self.attendee.email)
    }
}

/// Фильтр списка бронирований для админки.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReservationFilter {
    pub day: Option<Day>,
    pub role: Option<Role>,
    pub search: Option<String>,
}

impl ReservationFilter {
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn matches(&self, reservation: &Reservation) -> bool {
        if let Some(day) = self.day {
            if !reservation.days.contains(&day) {
                return false;
            }
        }
        if let Some(role) = self.role {
            if reservation.attendee.role != role {
                return false;
            }
        }
        if let Some(term) = self.search_term() {
            let term = term.to_lowercase();
            let a = &reservation.attendee;
            return [&a.first_name, &a.last_name, &a.email, &reservation.ticket_code]
                .iter()
                .any(|field| field.to_lowercase().contains(&term));
        }
        true
    }
}

#[derive(Debug, Clone)]
pub enum ScanOutcome {
    Unknown,
    AlreadyUsed(Reservation),
    /// Скан учтён; `is_used` выставлен, если его просили.
    Scanned(Reservation),
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Одна атомарная единица работы: либо бронирование и все заявки, либо ничего.
    /// Конфликт возвращается как `LedgerError::Conflict` с первой занятой парой
    /// в порядке `draft.claims`.
    async fn insert_reservation(
        &self,
        draft: &ReservationDraft,
        tickets: &TicketCodeGenerator,
    ) -> Result<Reservation, LedgerError>;

    /// Удаляет бронирование и его заявки, возвращает освобождённые пары.
    async fn delete_reservation(&self, reservation_id: i64) -> Result<Vec<Claim>, LedgerError>;

    async fn record_scan(&self, ticket_code: &str, mark_used: bool) -> Result<ScanOutcome, LedgerError>;

    async fn find_reservation(&self, reservation_id: i64) -> Result<Option<Reservation>, LedgerError>;

    async fn find_by_ticket(&self, ticket_code: &str) -> Result<Option<Reservation>, LedgerError>;

    async fn list_reservations(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, LedgerError>;

    async fn claimed_seat_ids(&self, day: Day) -> Result<Vec<i64>, LedgerError>;
}
