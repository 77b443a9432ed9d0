//! statistics.rs
//!
//! Сводка для админки.
//!
//! - Бронирования: всего, по дням, по ролям.
//! - Заполненность зала по дням (относительно мест, доступных для бронирования).
//! - Билеты: использованные, неиспользованные, сканирования за неделю,
//!   список отсканированных бронирований.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AdminUser;
use crate::models::{Day, Role};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/statistics", get(get_statistics))
        .route("/scan-statistics", get(get_scan_statistics))
}

const SCAN_HISTORY_DAYS: i64 = 7;
const DEFAULT_PER_PAGE: i64 = 50;
const MAX_PER_PAGE: i64 = 200;

// --- Вспомогательные функции ---

fn percentage(part: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (part as f64 * 1000.0 / total as f64).round() / 10.0
}

#[derive(Debug, Serialize, PartialEq)]
struct DayOccupancy {
    reserved: i64,
    available: i64,
    total: i64,
    percentage: f64,
}

fn occupancy(reserved: i64, bookable: i64) -> DayOccupancy {
    DayOccupancy {
        reserved,
        available: (bookable - reserved).max(0),
        total: bookable,
        percentage: percentage(reserved, bookable),
    }
}

// Обе роли всегда в ответе, даже с нулём
fn role_split(rows: Vec<(String, i64)>) -> BTreeMap<String, i64> {
    let mut split: BTreeMap<String, i64> = Role::ALL.iter().map(|r| (r.as_str().to_string(), 0)).collect();
    split.extend(rows);
    split
}

#[derive(Debug, Serialize, PartialEq)]
struct DailyScans {
    date: NaiveDate,
    count: i64,
}

// Последние SCAN_HISTORY_DAYS дней по возрастанию даты, пропуски нулями
fn daily_scans(today: NaiveDate, counts: &[(NaiveDate, i64)]) -> Vec<DailyScans> {
    let counts: HashMap<NaiveDate, i64> = counts.iter().copied().collect();
    (0..SCAN_HISTORY_DAYS)
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            DailyScans { date, count: counts.get(&date).copied().unwrap_or(0) }
        })
        .collect()
}

// --- GET /api/statistics ---

#[derive(Debug, Serialize)]
struct StatisticsResponse {
    total_reservations: i64,
    reservations_by_day: BTreeMap<Day, i64>,
    reservations_by_role: BTreeMap<String, i64>,
    seat_occupancy: BTreeMap<Day, DayOccupancy>,
    used_tickets: i64,
    unused_tickets: i64,
}

async fn get_statistics(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> ApiResult<Json<StatisticsResponse>> {
    let pool = &state.db.pool;

    let totals = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE is_used) AS used,
            COUNT(*) FILTER (WHERE 'day1' = ANY(days)) AS day1,
            COUNT(*) FILTER (WHERE 'day2' = ANY(days)) AS day2,
            COUNT(*) FILTER (WHERE 'day3' = ANY(days)) AS day3
        FROM reservations
        "#
    )
    .fetch_one(pool)
    .await?;

    let total: i64 = totals.get("total");
    let used: i64 = totals.get("used");
    let reservations_by_day = Day::ALL
        .iter()
        .map(|day| (*day, totals.get::<i64, _>(day.as_str())))
        .collect();

    let reservations_by_role = role_split(
        sqlx::query_as::<_, (String, i64)>("SELECT role, COUNT(*) FROM reservations GROUP BY role")
            .fetch_all(pool)
            .await?,
    );

    let claimed: BTreeMap<String, i64> =
        sqlx::query_as::<_, (String, i64)>("SELECT day, COUNT(*) FROM claims GROUP BY day")
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect();

    let bookable = state.ledger.catalog().bookable_count() as i64;
    let seat_occupancy = Day::ALL
        .iter()
        .map(|day| {
            let reserved = claimed.get(day.as_str()).copied().unwrap_or(0);
            (*day, occupancy(reserved, bookable))
        })
        .collect();

    Ok(Json(StatisticsResponse {
        total_reservations: total,
        reservations_by_day,
        reservations_by_role,
        seat_occupancy,
        used_tickets: used,
        unused_tickets: total - used,
    }))
}

// --- GET /api/scan-statistics ---

#[derive(Debug, Default, Deserialize)]
struct ScanListQuery {
    page: Option<String>,
    per_page: Option<String>,
}

fn positive(name: &str, raw: Option<&str>) -> ApiResult<Option<i64>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => match raw.parse::<i64>() {
            Ok(n) if n >= 1 => Ok(Some(n)),
            _ => Err(ApiError::Validation(format!("{} must be a positive integer", name))),
        },
    }
}

/// LIMIT/OFFSET для списка отсканированных. Без `page` список отдаётся целиком.
fn page_window(query: &ScanListQuery) -> ApiResult<(Option<i64>, i64)> {
    let per_page = positive("per_page", query.per_page.as_deref())?;
    if per_page.is_some_and(|n| n > MAX_PER_PAGE) {
        return Err(ApiError::Validation(format!("per_page must not exceed {}", MAX_PER_PAGE)));
    }

    match positive("page", query.page.as_deref())? {
        None => Ok((per_page, 0)),
        Some(page) => {
            let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE);
            Ok((Some(per_page), (page - 1) * per_page))
        }
    }
}

#[derive(Debug, Serialize, FromRow)]
struct ScannedReservation {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    ticket_code: String,
    days: Vec<String>,
    is_used: bool,
    scan_count: i32,
    last_scanned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct ScanStatisticsResponse {
    total_reservations: i64,
    total_scanned: i64,
    total_scans: i64,
    scan_rate: f64,
    scans_per_day: Vec<DailyScans>,
    scanned_reservations: Vec<ScannedReservation>,
}

async fn get_scan_statistics(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<ScanListQuery>,
) -> ApiResult<Json<ScanStatisticsResponse>> {
    let (limit, offset) = page_window(&query)?;
    let pool = &state.db.pool;

    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE scan_count > 0) AS scanned,
            COALESCE(SUM(scan_count), 0)::bigint AS scans
        FROM reservations
        "#
    )
    .fetch_one(pool)
    .await?;

    let total: i64 = row.get("total");
    let scanned: i64 = row.get("scanned");

    // Даты считаются в UTC и в базе, и здесь
    let today = Utc::now().date_naive();
    let per_day: Vec<(NaiveDate, i64)> = sqlx::query_as(
        r#"
        SELECT (last_scanned_at AT TIME ZONE 'UTC')::date AS day,
               COALESCE(SUM(scan_count), 0)::bigint
        FROM reservations
        WHERE last_scanned_at IS NOT NULL
          AND (last_scanned_at AT TIME ZONE 'UTC')::date >= $1
        GROUP BY 1
        "#
    )
    .bind(today - Duration::days(SCAN_HISTORY_DAYS - 1))
    .fetch_all(pool)
    .await?;

    // LIMIT NULL в Postgres означает "без ограничения"
    let scanned_reservations = sqlx::query_as::<_, ScannedReservation>(
        "SELECT id, first_name, last_name, email, ticket_code, days, is_used, scan_count, last_scanned_at
         FROM reservations
         WHERE last_scanned_at IS NOT NULL
         ORDER BY last_scanned_at DESC, id DESC
         LIMIT $1 OFFSET $2"
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(Json(ScanStatisticsResponse {
        total_reservations: total,
        total_scanned: scanned,
        total_scans: row.get("scans"),
        scan_rate: percentage(scanned, total),
        scans_per_day: daily_scans(today, &per_day),
        scanned_reservations,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_to_one_decimal() {
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(80, 80), 100.0);
    }

    #[test]
    fn occupancy_counts_against_bookable_seats() {
        assert_eq!(
            occupancy(20, 80),
            DayOccupancy { reserved: 20, available: 60, total: 80, percentage: 25.0 }
        );
    }

    #[test]
    fn role_split_reports_both_roles() {
        let split = role_split(vec![("employee".to_string(), 4)]);
        assert_eq!(split.get("student"), Some(&0));
        assert_eq!(split.get("employee"), Some(&4));
        assert_eq!(role_split(Vec::new()).values().sum::<i64>(), 0);
    }

    #[test]
    fn daily_scans_cover_last_week_with_zeros() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let week_start = NaiveDate::from_ymd_opt(2026, 2, 24).unwrap();
        let too_old = NaiveDate::from_ymd_opt(2026, 2, 23).unwrap();
        let days = daily_scans(
            today,
            &[(today, 3), (NaiveDate::from_ymd_opt(2026, 2, 28).unwrap(), 5), (week_start, 9), (too_old, 100)],
        );

        assert_eq!(days.len(), 7);
        assert_eq!(days[0].date, week_start);
        assert_eq!(days[6], DailyScans { date: today, count: 3 });
        let counts: Vec<i64> = days.iter().map(|d| d.count).collect();
        assert_eq!(counts, vec![9, 0, 0, 0, 5, 0, 3]);
    }

    fn window(page: Option<&str>, per_page: Option<&str>) -> ApiResult<(Option<i64>, i64)> {
        page_window(&ScanListQuery {
            page: page.map(str::to_string),
            per_page: per_page.map(str::to_string),
        })
    }

    #[test]
    fn scanned_list_is_whole_unless_paged() {
        assert_eq!(window(None, None).unwrap(), (None, 0));
        assert_eq!(window(Some(""), Some("")).unwrap(), (None, 0));
        assert_eq!(window(Some("3"), None).unwrap(), (Some(DEFAULT_PER_PAGE), 2 * DEFAULT_PER_PAGE));
        assert_eq!(window(Some("2"), Some("25")).unwrap(), (Some(25), 25));
    }

    #[test]
    fn bad_page_values_are_validation_errors() {
        for (page, per_page) in [(Some("0"), None), (Some("x"), None), (Some("1"), Some("201")), (None, Some("-5"))] {
            assert!(matches!(window(page, per_page), Err(ApiError::Validation(_))));
        }
    }
}
