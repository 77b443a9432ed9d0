//! ledger.rs
//!
//! Учёт занятых пар (место, день) и допуск новых бронирований.
//!
//! Инвариант: на каждую пару (место, день) существует не больше одной заявки
//! (claim). Его держит хранилище (уникальный ключ или эксклюзивная блокировка),
//! `SeatLedger` только проверяет запрос до обращения к хранилищу и
//! интерпретирует результат.
//!
//! Операции:
//! - `try_reserve`: проверка запроса, затем одна атомарная единица работы в хранилище.
//! - `release_reservation`: удаление бронирования вместе с его заявками.
//! - `validate_ticket`: сканирование QR (предпросмотр или отметка о входе).

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use validator::Validate;

use crate::models::{describe_validation_errors, Claim, Day, Reservation, ReservationRequest};
use crate::services::{SeatCatalog, TicketCodeGenerator, TicketPayload};
use crate::store::{LedgerStore, ReservationDraft, ReservationFilter, ScanOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Некорректный ввод. Возвращается до любого обращения к хранилищу.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Пара уже занята другим бронированием.
    #[error("seat {seat_number} is already reserved for {day}")]
    Conflict { seat_id: i64, seat_number: String, day: Day },
    #[error("{0} not found")]
    NotFound(String),
    #[error("could not allocate a unique ticket code after {attempts} attempts")]
    TicketCodesExhausted { attempts: u32 },
    #[error("store error: {0}")]
    Store(String),
}

impl LedgerError {
    pub fn conflict(claim: &Claim) -> Self {
        LedgerError::Conflict {
            seat_id: claim.seat_id,
            seat_number: claim.seat_number.clone(),
            day: claim.day,
        }
    }
}

/// Результат сканирования билета.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationResult {
    /// Строку из QR не удалось разобрать. Хранилище не трогали.
    Invalid,
    /// Билета с таким кодом нет.
    Unknown,
    /// Билет действителен, вход не отмечен (предпросмотр). Скан учтён.
    Unused { reservation: Reservation },
    /// Билет только что отмечен как использованный.
    Used { reservation: Reservation },
    /// Билет уже использован ранее. Ничего не изменено.
    AlreadyUsed { reservation: Reservation },
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Unused { .. } | ValidationResult::Used { .. })
    }

    pub fn reservation(&self) -> Option<&Reservation> {
        match self {
            ValidationResult::Unused { reservation }
            | ValidationResult::Used { reservation }
            | ValidationResult::AlreadyUsed { reservation } => Some(reservation),
            ValidationResult::Invalid | ValidationResult::Unknown => None,
        }
    }
}

#[derive(Clone)]
pub struct SeatLedger {
    store: Arc<dyn LedgerStore>,
    catalog: SeatCatalog,
    tickets: TicketCodeGenerator,
}

impl SeatLedger {
    pub fn new(store: Arc<dyn LedgerStore>, catalog: SeatCatalog, tickets: TicketCodeGenerator) -> Self {
        Self { store, catalog, tickets }
    }

    pub fn catalog(&self) -> &SeatCatalog {
        &self.catalog
    }

    /// Проверяет запрос и фиксирует все заявки вместе с бронированием одной транзакцией.
    /// При конфликте не фиксируется ничего.
    pub async fn try_reserve(&self, request: ReservationRequest) -> Result<Reservation, LedgerError> {
        let draft = self.admit(request)?;

        match self.store.insert_reservation(&draft, &self.tickets).await {
            Ok(reservation) => {
                info!(
                    reservation_id = reservation.id,
                    ticket_code = %reservation.ticket_code,
                    claims = reservation.claims.len(),
                    "Reservation created"
                );
                Ok(reservation)
            }
            Err(e @ LedgerError::Conflict { .. }) => {
                info!(error = %e, "Reservation rejected");
                Err(e)
            }
            Err(e) => {
                error!(error = %e, "Reservation failed");
                Err(e)
            }
        }
    }

    /// Проверка запроса без обращения к хранилищу заявок.
    /// Возвращает черновик с заявками в том порядке, в котором их прислал клиент.
    pub fn admit(&self, request: ReservationRequest) -> Result<ReservationDraft, LedgerError> {
        let attendee = request.attendee.normalized();
        attendee
            .validate()
            .map_err(|e| LedgerError::Validation(describe_validation_errors(&e)))?;

        if request.days.is_empty() {
            return Err(LedgerError::Validation("at least one day must be selected".to_string()));
        }
        if request.seats.is_empty() {
            return Err(LedgerError::Validation("at least one seat must be selected".to_string()));
        }

        let mut days = request.days;
        days.sort();
        days.dedup();

        let mut seen = HashSet::new();
        let mut claims = Vec::with_capacity(request.seats.len());
        for selection in request.seats {
            if !days.contains(&selection.day) {
                return Err(LedgerError::Validation(format!(
                    "seat {} is selected for {}, which is not one of the requested days",
                    selection.seat_id, selection.day
                )));
            }

            let seat = self
                .catalog
                .get(selection.seat_id)
                .ok_or_else(|| LedgerError::NotFound(format!("seat {}", selection.seat_id)))?;

            if seat.is_vip() {
                return Err(LedgerError::Validation(format!(
                    "seat {} is a VIP seat and cannot be reserved",
                    seat.seat_number
                )));
            }
            if !seen.insert((selection.seat_id, selection.day)) {
                return Err(LedgerError::Validation(format!(
                    "seat {} is selected more than once for {}",
                    seat.seat_number, selection.day
                )));
            }

            claims.push(Claim {
                seat_id: seat.id,
                seat_number: seat.seat_number.clone(),
                day: selection.day,
            });
        }

        Ok(ReservationDraft { attendee, days, claims })
    }

    /// Удаляет бронирование и освобождает все его пары.
    pub async fn release_reservation(&self, reservation_id: i64) -> Result<(), LedgerError> {
        let released = self.store.delete_reservation(reservation_id).await?;
        info!(
            reservation_id,
            released = released.len(),
            "Reservation released"
        );
        Ok(())
    }

    /// Сканирование билета. `mark_used = false` только учитывает скан,
    /// `true` отмечает вход. Использованный билет повторно не допускается.
    pub async fn validate_ticket(&self, raw_payload: &str, mark_used: bool) -> Result<ValidationResult, LedgerError> {
        let Some(ticket_code) = TicketPayload::parse_code(raw_payload) else {
            warn!("Rejected malformed QR payload");
            return Ok(ValidationResult::Invalid);
        };

        let result = match self.store.record_scan(&ticket_code, mark_used).await? {
            ScanOutcome::Unknown => ValidationResult::Unknown,
            ScanOutcome::AlreadyUsed(reservation) => ValidationResult::AlreadyUsed { reservation },
            ScanOutcome::Scanned(reservation) if mark_used => ValidationResult::Used { reservation },
            ScanOutcome::Scanned(reservation) => ValidationResult::Unused { reservation },
        };

        match &result {
            ValidationResult::Used { reservation } => {
                info!(reservation_id = reservation.id, %ticket_code, "Ticket checked in")
            }
            ValidationResult::AlreadyUsed { reservation } => {
                warn!(reservation_id = reservation.id, %ticket_code, "Ticket already used")
            }
            _ => {}
        }
        Ok(result)
    }

    pub async fn reservation(&self, reservation_id: i64) -> Result<Reservation, LedgerError> {
        self.store
            .find_reservation(reservation_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("reservation {}", reservation_id)))
    }

    pub async fn reservation_by_ticket(&self, ticket_code: &str) -> Result<Reservation, LedgerError> {
        self.store
            .find_by_ticket(&ticket_code.trim().to_ascii_uppercase())
            .await?
            .ok_or_else(|| LedgerError::NotFound("ticket".to_string()))
    }

    pub async fn reservations(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, LedgerError> {
        self.store.list_reservations(filter).await
    }

    pub async fn claimed_seat_ids(&self, day: Day) -> Result<Vec<i64>, LedgerError> {
        self.store.claimed_seat_ids(day).await
    }
}
