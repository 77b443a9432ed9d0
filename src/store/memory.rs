use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

use super::{LedgerStore, ReservationDraft, ReservationFilter, ScanOutcome};
use crate::models::{Claim, Day, Reservation};
use crate::services::{LedgerError, TicketCodeGenerator};

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    reservations: BTreeMap<i64, Reservation>,
    // (seat_id, day) -> reservation_id
    claims: HashMap<(i64, Day), i64>,
    tickets: HashMap<String, i64>,
}

/// Хранилище в памяти процесса. Вся единица работы выполняется под одним
/// мьютексом, он и есть эксклюзивная блокировка пространства заявок.
#[derive(Default)]
pub struct MemoryLedgerStore {
    state: Mutex<MemoryState>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn claim_count(&self) -> usize {
        self.state.lock().await.claims.len()
    }

    pub async fn reservation_count(&self) -> usize {
        self.state.lock().await.reservations.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn insert_reservation(
        &self,
        draft: &ReservationDraft,
        tickets: &TicketCodeGenerator,
    ) -> Result<Reservation, LedgerError> {
        let mut state = self.state.lock().await;

        if let Some(taken) = draft
            .claims
            .iter()
            .find(|c| state.claims.contains_key(&(c.seat_id, c.day)))
        {
            return Err(LedgerError::conflict(taken));
        }

        let ticket_code = (0..tickets.max_attempts())
            .map(|_| tickets.generate())
            .find(|code| !state.tickets.contains_key(code))
            .ok_or(LedgerError::TicketCodesExhausted { attempts: tickets.max_attempts() })?;

        state.next_id += 1;
        let id = state.next_id;
        for claim in &draft.claims {
            state.claims.insert((claim.seat_id, claim.day), id);
        }
        state.tickets.insert(ticket_code.clone(), id);

        let reservation = Reservation {
            id,
            attendee: draft.attendee.clone(),
            days: draft.days.clone(),
            claims: draft.claims.clone(),
            qr_data: draft.qr_data(&ticket_code),
            ticket_code,
            is_used: false,
            scan_count: 0,
            last_scanned_at: None,
            created_at: Utc::now(),
        };
        state.reservations.insert(id, reservation.clone());
        Ok(reservation)
    }

    async fn delete_reservation(&self, reservation_id: i64) -> Result<Vec<Claim>, LedgerError> {
        let mut state = self.state.lock().await;

        let reservation = state
            .reservations
            .remove(&reservation_id)
            .ok_or_else(|| LedgerError::NotFound(format!("reservation {}", reservation_id)))?;

        for claim in &reservation.claims {
            state.claims.remove(&(claim.seat_id, claim.day));
        }
        state.tickets.remove(&reservation.ticket_code);
        Ok(reservation.claims)
    }

    async fn record_scan(&self, ticket_code: &str, mark_used: bool) -> Result<ScanOutcome, LedgerError> {
        let mut state = self.state.lock().await;

        let Some(id) = state.tickets.get(ticket_code).copied() else {
            return Ok(ScanOutcome::Unknown);
        };
        let Some(reservation) = state.reservations.get_mut(&id) else {
            return Ok(ScanOutcome::Unknown);
        };

        if reservation.is_used {
            return Ok(ScanOutcome::AlreadyUsed(reservation.clone()));
        }
        reservation.scan_count += 1;
        reservation.last_scanned_at = Some(Utc::now());
        reservation.is_used = mark_used;
        Ok(ScanOutcome::Scanned(reservation.clone()))
    }

    async fn find_reservation(&self, reservation_id: i64) -> Result<Option<Reservation>, LedgerError> {
        Ok(self.state.lock().await.reservations.get(&reservation_id).cloned())
    }

    async fn find_by_ticket(&self, ticket_code: &str) -> Result<Option<Reservation>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state
            .tickets
            .get(ticket_code)
            .and_then(|id| state.reservations.get(id))
            .cloned())
    }

    async fn list_reservations(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, LedgerError> {
        let state = self.state.lock().await;
        // новые сверху
        Ok(state
            .reservations
            .values()
            .rev()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn claimed_seat_ids(&self, day: Day) -> Result<Vec<i64>, LedgerError> {
        let state = self.state.lock().await;
        let mut ids: Vec<i64> = state
            .claims
            .keys()
            .filter(|(_, d)| *d == day)
            .map(|(seat_id, _)| *seat_id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attendee, Role};

    fn draft(seat_id: i64, day: Day) -> ReservationDraft {
        ReservationDraft {
            attendee: Attendee {
                first_name: "Imane".to_string(),
                last_name: "Berrada".to_string(),
                email: "imane@example.com".to_string(),
                phone: "0661000000".to_string(),
                role: Role::Employee,
                institution_name: None,
            },
            days: vec![day],
            claims: vec![Claim { seat_id, seat_number: format!("L-3-{}", seat_id), day }],
        }
    }

    fn same_code(_: usize) -> String {
        "SAMECODE".to_string()
    }

    #[tokio::test]
    async fn exhausted_ticket_codes_leave_nothing_behind() {
        let store = MemoryLedgerStore::new();
        let tickets = TicketCodeGenerator::with_source(8, 3, same_code);

        store.insert_reservation(&draft(1, Day::Day1), &tickets).await.unwrap();
        let err = store.insert_reservation(&draft(2, Day::Day1), &tickets).await.unwrap_err();

        assert_eq!(err, LedgerError::TicketCodesExhausted { attempts: 3 });
        assert_eq!(store.claim_count().await, 1);
        assert_eq!(store.reservation_count().await, 1);
    }

    #[tokio::test]
    async fn deleting_unknown_reservation_is_not_found() {
        let store = MemoryLedgerStore::new();
        let err = store.delete_reservation(7).await.unwrap_err();
        assert_eq!(err, LedgerError::NotFound("reservation 7".to_string()));
    }

    #[tokio::test]
    async fn filter_matches_search_case_insensitively() {
        let store = MemoryLedgerStore::new();
        let tickets = TicketCodeGenerator::default();
        store.insert_reservation(&draft(1, Day::Day1), &tickets).await.unwrap();
        store.insert_reservation(&draft(2, Day::Day2), &tickets).await.unwrap();

        let filter = ReservationFilter { search: Some("BERRADA".to_string()), day: Some(Day::Day2), role: None };
        let found = store.list_reservations(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].claims[0].seat_id, 2);
    }
}
