use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::models::{Block, Day, Seat};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/seats", get(get_seats))
        .route("/seats/availability", get(get_availability))
}

fn parse_day(raw: &str) -> ApiResult<Day> {
    raw.parse().map_err(|e: crate::models::ParseEnumError| ApiError::Validation(e.to_string()))
}

// Пустой или отсутствующий день значит первый день
fn requested_day(raw: Option<&str>) -> ApiResult<Day> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_day(raw),
        None => Ok(Day::Day1),
    }
}

#[derive(Debug, Deserialize)]
struct SeatsQuery {
    day: Option<String>,
}

#[derive(Debug, Serialize)]
struct SeatView {
    #[serde(flatten)]
    seat: Seat,
    is_available: bool,
    selectable: bool,
}

#[derive(Debug, Serialize)]
struct SeatsResponse {
    day: Day,
    seats: Vec<SeatView>,
    // блок -> ряд -> места ряда
    blocks: BTreeMap<Block, BTreeMap<i32, Vec<i64>>>,
}

fn seat_map(day: Day, seats: &[Seat], claimed: &HashSet<i64>) -> SeatsResponse {
    let mut blocks: BTreeMap<Block, BTreeMap<i32, Vec<i64>>> = BTreeMap::new();
    let views = seats
        .iter()
        .map(|seat| {
            blocks
                .entry(seat.block)
                .or_default()
                .entry(seat.row_number)
                .or_default()
                .push(seat.id);

            let is_available = !claimed.contains(&seat.id);
            SeatView {
                seat: seat.clone(),
                is_available,
                selectable: is_available && !seat.is_vip(),
            }
        })
        .collect();

    SeatsResponse { day, seats: views, blocks }
}

// GET /api/seats?day=day1
async fn get_seats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SeatsQuery>,
) -> ApiResult<Json<SeatsResponse>> {
    let day = requested_day(params.day.as_deref())?;

    let claimed: HashSet<i64> = state.ledger.claimed_seat_ids(day).await?.into_iter().collect();
    Ok(Json(seat_map(day, state.ledger.catalog().seats(), &claimed)))
}

#[derive(Debug, Deserialize)]
struct AvailabilityQuery {
    days: Option<String>,
}

// GET /api/seats/availability?days=day1,day2 -> { day: [занятые seat_id] }
async fn get_availability(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AvailabilityQuery>,
) -> ApiResult<Json<BTreeMap<Day, Vec<i64>>>> {
    let days = match params.days.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw.split(',').map(parse_day).collect::<ApiResult<Vec<_>>>()?,
        None => Day::ALL.to_vec(),
    };

    let claimed = try_join_all(days.iter().map(|day| state.ledger.claimed_seat_ids(*day))).await?;
    Ok(Json(days.into_iter().zip(claimed).collect()))
}
