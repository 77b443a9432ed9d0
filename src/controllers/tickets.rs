use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::models::Reservation;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/tickets/{code}", get(get_ticket))
}

#[derive(Debug, Serialize)]
struct TicketResponse {
    ticket_code: String,
    qr_data: String,
    attendee_name: String,
    reservation: Reservation,
}

// GET /api/tickets/{code}: данные для билета, PDF собирает клиент
async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<Json<TicketResponse>> {
    let reservation = state.ledger.reservation_by_ticket(&code).await?;

    Ok(Json(TicketResponse {
        ticket_code: reservation.ticket_code.clone(),
        qr_data: reservation.qr_data.clone(),
        attendee_name: reservation.attendee.full_name(),
        reservation,
    }))
}
