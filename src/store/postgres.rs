//! postgres.rs
//!
//! Основное хранилище на PostgreSQL.
//!
//! Единственность пары (место, день) держит ограничение `UNIQUE (seat_id, day)`
//! в таблице `claims`. Вставка идёт с `ON CONFLICT DO NOTHING`: пропущенная
//! строка и есть авторитетный сигнал конфликта, предварительная выборка
//! лишь быстрый путь для уже зафиксированных заявок.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::{LedgerStore, ReservationDraft, ReservationFilter, ScanOutcome};
use crate::models::{Attendee, Claim, Day, Reservation};
use crate::services::{LedgerError, TicketCodeGenerator};

const RESERVATION_COLUMNS: &str = "id, first_name, last_name, email, phone, role, institution_name, \
     days, ticket_code, qr_data, is_used, scan_count, last_scanned_at, created_at";

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::Store(e.to_string())
    }
}

#[derive(Debug, FromRow)]
struct ReservationRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    role: String,
    institution_name: Option<String>,
    days: Vec<String>,
    ticket_code: String,
    qr_data: String,
    is_used: bool,
    scan_count: i32,
    last_scanned_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ClaimRow {
    reservation_id: i64,
    seat_id: i64,
    seat_number: String,
    day: String,
}

impl ClaimRow {
    fn into_claim(self) -> Result<Claim, LedgerError> {
        Ok(Claim {
            seat_id: self.seat_id,
            seat_number: self.seat_number,
            day: parse_day(&self.day)?,
        })
    }
}

fn parse_day(raw: &str) -> Result<Day, LedgerError> {
    raw.parse().map_err(|e| LedgerError::Store(format!("corrupt row: {}", e)))
}

impl ReservationRow {
    fn into_reservation(self, claims: Vec<Claim>) -> Result<Reservation, LedgerError> {
        let role = self
            .role
            .parse()
            .map_err(|e| LedgerError::Store(format!("corrupt row: {}", e)))?;
        let days = self
            .days
            .iter()
            .map(|d| parse_day(d))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Reservation {
            id: self.id,
            attendee: Attendee {
                first_name: self.first_name,
                last_name: self.last_name,
                email: self.email,
                phone: self.phone,
                role,
                institution_name: self.institution_name,
            },
            days,
            claims,
            ticket_code: self.ticket_code,
            qr_data: self.qr_data,
            is_used: self.is_used,
            scan_count: self.scan_count,
            last_scanned_at: self.last_scanned_at,
            created_at: self.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Уже занятые пары из запроса, кроме заявок бронирования `exclude`.
    async fn taken_pairs(
        tx: &mut Transaction<'_, Postgres>,
        draft: &ReservationDraft,
        exclude: Option<i64>,
    ) -> Result<HashSet<(i64, Day)>, LedgerError> {
        let seat_ids: Vec<i64> = draft.claims.iter().map(|c| c.seat_id).collect();
        let days: Vec<String> = draft.claims.iter().map(|c| c.day.as_str().to_string()).collect();

        let rows: Vec<(i64, String)> = sqlx::query_as(
            r#"
            SELECT c.seat_id, c.day
            FROM claims c
            JOIN UNNEST($1::bigint[], $2::text[]) AS req(seat_id, day)
              ON req.seat_id = c.seat_id AND req.day = c.day
            WHERE $3::bigint IS NULL OR c.reservation_id <> $3
            "#
        )
        .bind(&seat_ids)
        .bind(&days)
        .bind(exclude)
        .fetch_all(&mut **tx)
        .await?;

        rows.into_iter()
            .map(|(seat_id, day)| parse_day(&day).map(|day| (seat_id, day)))
            .collect()
    }

    fn first_taken<'a>(draft: &'a ReservationDraft, taken: &HashSet<(i64, Day)>) -> Option<&'a Claim> {
        draft.claims.iter().find(|c| taken.contains(&(c.seat_id, c.day)))
    }

    async fn claims_for(&self, reservation_ids: &[i64]) -> Result<HashMap<i64, Vec<Claim>>, LedgerError> {
        let rows = sqlx::query_as::<_, ClaimRow>(
            r#"
            SELECT c.reservation_id, c.seat_id, s.seat_number, c.day
            FROM claims c
            JOIN seats s ON s.id = c.seat_id
            WHERE c.reservation_id = ANY($1)
            ORDER BY c.reservation_id, c.day, s.block, s.row_number, s.seat_index
            "#
        )
        .bind(reservation_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<Claim>> = HashMap::new();
        for row in rows {
            let reservation_id = row.reservation_id;
            grouped.entry(reservation_id).or_default().push(row.into_claim()?);
        }
        Ok(grouped)
    }

    async fn hydrate(&self, rows: Vec<ReservationRow>) -> Result<Vec<Reservation>, LedgerError> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut claims = self.claims_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let own = claims.remove(&row.id).unwrap_or_default();
                row.into_reservation(own)
            })
            .collect()
    }

    async fn hydrate_one(&self, row: Option<ReservationRow>) -> Result<Option<Reservation>, LedgerError> {
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn insert_reservation(
        &self,
        draft: &ReservationDraft,
        tickets: &TicketCodeGenerator,
    ) -> Result<Reservation, LedgerError> {
        let mut tx = self.pool.begin().await?;

        // 1) Быстрый путь: пары, уже занятые зафиксированными бронированиями
        let taken = Self::taken_pairs(&mut tx, draft, None).await?;
        if let Some(claim) = Self::first_taken(draft, &taken) {
            rollback(tx).await;
            return Err(LedgerError::conflict(claim));
        }

        // 2) Строка бронирования; при совпадении кода билета генерируем новый
        let days: Vec<String> = draft.days.iter().map(|d| d.as_str().to_string()).collect();
        let insert_sql = format!(
            r#"
            INSERT INTO reservations
                (first_name, last_name, email, phone, role, institution_name, days, ticket_code, qr_data)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (ticket_code) DO NOTHING
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        );

        let mut inserted = None;
        for attempt in 1..=tickets.max_attempts() {
            let ticket_code = tickets.generate();
            let row = sqlx::query_as::<_, ReservationRow>(&insert_sql)
                .bind(&draft.attendee.first_name)
                .bind(&draft.attendee.last_name)
                .bind(&draft.attendee.email)
                .bind(&draft.attendee.phone)
                .bind(draft.attendee.role.as_str())
                .bind(&draft.attendee.institution_name)
                .bind(&days)
                .bind(&ticket_code)
                .bind(draft.qr_data(&ticket_code))
                .fetch_optional(&mut *tx)
                .await?;

            if row.is_some() {
                inserted = row;
                break;
            }
            warn!(attempt, "Ticket code collision, regenerating");
        }

        let Some(row) = inserted else {
            rollback(tx).await;
            return Err(LedgerError::TicketCodesExhausted { attempts: tickets.max_attempts() });
        };

        // 3) Заявки в каноническом порядке (seat_id, day), чтобы пересекающиеся
        //    транзакции брали блокировки в одном порядке и не ловили deadlock
        let mut ordered: Vec<&Claim> = draft.claims.iter().collect();
        ordered.sort_by_key(|c| (c.seat_id, c.day));

        for claim in ordered {
            let result = sqlx::query(
                "INSERT INTO claims (reservation_id, seat_id, day)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (seat_id, day) DO NOTHING"
            )
            .bind(row.id)
            .bind(claim.seat_id)
            .bind(claim.day.as_str())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                // Проиграли гонку. Победитель уже зафиксирован (ON CONFLICT ждал его),
                // поэтому повторная выборка видит его заявки.
                let taken = Self::taken_pairs(&mut tx, draft, Some(row.id)).await?;
                let conflict = Self::first_taken(draft, &taken).unwrap_or(claim);
                debug!(seat_id = conflict.seat_id, day = %conflict.day, "Lost claim race");
                let err = LedgerError::conflict(conflict);
                rollback(tx).await;
                return Err(err);
            }
        }

        // 4) Коммитим
        tx.commit().await?;

        row.into_reservation(draft.claims.clone())
    }

    async fn delete_reservation(&self, reservation_id: i64) -> Result<Vec<Claim>, LedgerError> {
        let mut tx = self.pool.begin().await?;

        let released = sqlx::query_as::<_, ClaimRow>(
            r#"
            DELETE FROM claims c
            USING seats s
            WHERE c.reservation_id = $1 AND s.id = c.seat_id
            RETURNING c.reservation_id, c.seat_id, s.seat_number, c.day
            "#
        )
        .bind(reservation_id)
        .fetch_all(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(reservation_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            rollback(tx).await;
            return Err(LedgerError::NotFound(format!("reservation {}", reservation_id)));
        }

        tx.commit().await?;

        released.into_iter().map(ClaimRow::into_claim).collect()
    }

    async fn record_scan(&self, ticket_code: &str, mark_used: bool) -> Result<ScanOutcome, LedgerError> {
        // Условие NOT is_used делает отметку входа атомарной: из двух
        // одновременных сканов строку обновит только один
        let scanned = sqlx::query_as::<_, ReservationRow>(&format!(
            r#"
            UPDATE reservations
            SET scan_count = scan_count + 1,
                last_scanned_at = NOW(),
                is_used = $2
            WHERE ticket_code = $1 AND NOT is_used
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(ticket_code)
        .bind(mark_used)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(reservation) = self.hydrate_one(scanned).await? {
            return Ok(ScanOutcome::Scanned(reservation));
        }

        Ok(match self.find_by_ticket(ticket_code).await? {
            Some(reservation) => ScanOutcome::AlreadyUsed(reservation),
            None => ScanOutcome::Unknown,
        })
    }

    async fn find_reservation(&self, reservation_id: i64) -> Result<Option<Reservation>, LedgerError> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {} FROM reservations WHERE id = $1",
            RESERVATION_COLUMNS
        ))
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await?;

        self.hydrate_one(row).await
    }

    async fn find_by_ticket(&self, ticket_code: &str) -> Result<Option<Reservation>, LedgerError> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {} FROM reservations WHERE ticket_code = $1",
            RESERVATION_COLUMNS
        ))
        .bind(ticket_code)
        .fetch_optional(&self.pool)
        .await?;

        self.hydrate_one(row).await
    }

    async fn list_reservations(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, LedgerError> {
        let pattern = filter.search_term().map(|term| format!("%{}%", escape_like(term)));

        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            r#"
            SELECT {}
            FROM reservations
            WHERE ($1::text IS NULL OR $1 = ANY(days))
              AND ($2::text IS NULL OR role = $2)
              AND ($3::text IS NULL
                   OR first_name ILIKE $3 OR last_name ILIKE $3
                   OR email ILIKE $3 OR ticket_code ILIKE $3)
            ORDER BY created_at DESC, id DESC
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(filter.day.map(|d| d.as_str()))
        .bind(filter.role.map(|r| r.as_str()))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn claimed_seat_ids(&self, day: Day) -> Result<Vec<i64>, LedgerError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT seat_id FROM claims WHERE day = $1 ORDER BY seat_id"
        )
        .bind(day.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

async fn rollback(tx: Transaction<'_, Postgres>) {
    if let Err(e) = tx.rollback().await {
        warn!("Transaction rollback failed: {}", e);
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("amrani"), "amrani");
    }
}
