//! reservations.rs
//!
//! Бронирование мест и работа с билетами на входе.
//!
//! - `POST /reservations`: создание бронирования (публично).
//! - `GET /reservations`, `GET/DELETE /reservations/{id}`: админка.
//! - `POST /reservations/validate-qr`: сканирование билета на входе.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AdminUser;
use crate::models::{Attendee, Day, Reservation, ReservationRequest, Role, SeatSelection};
use crate::services::ValidationResult;
use crate::store::ReservationFilter;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reservations", post(create_reservation).get(list_reservations))
        .route("/reservations/validate-qr", post(validate_qr))
        .route("/reservations/{id}", get(get_reservation).delete(delete_reservation))
}

/* ---------- CREATE ---------- */

// Роль и дни приходят строками и разбираются здесь,
// чтобы неизвестное значение было ошибкой валидации (422), а не 400 от serde.
#[derive(Debug, Deserialize)]
pub struct CreateReservationBody {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub institution_name: Option<String>,
    pub days: Vec<String>,
    pub seats: Vec<SeatSelectionBody>,
}

#[derive(Debug, Deserialize)]
pub struct SeatSelectionBody {
    pub seat_id: i64,
    pub day: String,
}

impl TryFrom<CreateReservationBody> for ReservationRequest {
    type Error = ApiError;

    fn try_from(body: CreateReservationBody) -> Result<Self, Self::Error> {
        let invalid = |e: crate::models::ParseEnumError| ApiError::Validation(e.to_string());

        let role: Role = body.role.parse().map_err(invalid)?;
        let days = body
            .days
            .iter()
            .map(|d| d.parse::<Day>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;
        let seats = body
            .seats
            .iter()
            .map(|s| s.day.parse::<Day>().map(|day| SeatSelection { seat_id: s.seat_id, day }))
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;

        Ok(ReservationRequest {
            attendee: Attendee {
                first_name: body.first_name,
                last_name: body.last_name,
                email: body.email,
                phone: body.phone,
                role,
                institution_name: body.institution_name,
            },
            days,
            seats,
        })
    }
}

#[derive(Debug, Serialize)]
struct ReservationResponse {
    success: bool,
    message: String,
    ticket_code: String,
    qr_data: String,
    reservation: Reservation,
}

// POST /api/reservations
async fn create_reservation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateReservationBody>,
) -> ApiResult<impl IntoResponse> {
    let request = ReservationRequest::try_from(body)?;
    let reservation = state.ledger.try_reserve(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ReservationResponse {
            success: true,
            message: "Reservation created".to_string(),
            ticket_code: reservation.ticket_code.clone(),
            qr_data: reservation.qr_data.clone(),
            reservation,
        }),
    ))
}

/* ---------- ADMIN ---------- */

// Админка всегда шлёт все ключи, пустое значение значит "без фильтра"
#[derive(Debug, Default, Deserialize)]
pub struct ReservationQuery {
    pub day: Option<String>,
    pub role: Option<String>,
    pub search: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl TryFrom<ReservationQuery> for ReservationFilter {
    type Error = ApiError;

    fn try_from(query: ReservationQuery) -> Result<Self, Self::Error> {
        let invalid = |e: crate::models::ParseEnumError| ApiError::Validation(e.to_string());

        Ok(ReservationFilter {
            day: non_blank(&query.day).map(str::parse::<Day>).transpose().map_err(invalid)?,
            role: non_blank(&query.role).map(str::parse::<Role>).transpose().map_err(invalid)?,
            search: non_blank(&query.search).map(str::to_string),
        })
    }
}

// GET /api/reservations?day=&role=&search=
async fn list_reservations(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<ReservationQuery>,
) -> ApiResult<Json<Vec<Reservation>>> {
    let filter = ReservationFilter::try_from(query)?;
    Ok(Json(state.ledger.reservations(&filter).await?))
}

async fn get_reservation(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Reservation>> {
    Ok(Json(state.ledger.reservation(id).await?))
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    success: bool,
    message: String,
}

// DELETE /api/reservations/{id}: освобождает все места бронирования
async fn delete_reservation(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.ledger.release_reservation(id).await?;
    tracing::info!(reservation_id = id, admin = %admin.email, "Reservation deleted by admin");

    Ok(Json(MessageResponse {
        success: true,
        message: "Reservation deleted".to_string(),
    }))
}

/* ---------- CHECK-IN ---------- */

#[derive(Debug, Deserialize)]
struct ValidateQrBody {
    qr_data: String,
    #[serde(default)]
    mark_as_used: bool,
}

#[derive(Debug, Serialize)]
struct ValidateQrResponse {
    success: bool,
    message: &'static str,
    #[serde(flatten)]
    result: ValidationResult,
}

fn describe(result: &ValidationResult) -> &'static str {
    match result {
        ValidationResult::Invalid => "Invalid QR code",
        ValidationResult::Unknown => "Ticket not found",
        ValidationResult::Unused { .. } => "Ticket is valid",
        ValidationResult::Used { .. } => "Ticket validated, entry recorded",
        ValidationResult::AlreadyUsed { .. } => "Ticket has already been used",
    }
}

// POST /api/reservations/validate-qr
async fn validate_qr(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(body): Json<ValidateQrBody>,
) -> ApiResult<Json<ValidateQrResponse>> {
    let result = state.ledger.validate_ticket(&body.qr_data, body.mark_as_used).await?;

    Ok(Json(ValidateQrResponse {
        success: result.is_valid(),
        message: describe(&result),
        result,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(role: &str, days: &[&str], seat_day: &str) -> CreateReservationBody {
        CreateReservationBody {
            first_name: "Nadia".to_string(),
            last_name: "Benali".to_string(),
            email: "nadia@example.com".to_string(),
            phone: "0611223344".to_string(),
            role: role.to_string(),
            institution_name: None,
            days: days.iter().map(|d| d.to_string()).collect(),
            seats: vec![SeatSelectionBody { seat_id: 11, day: seat_day.to_string() }],
        }
    }

    #[test]
    fn body_parses_wire_strings() {
        let request = ReservationRequest::try_from(body("employee", &["day1", "day3"], "day3")).unwrap();
        assert_eq!(request.attendee.role, Role::Employee);
        assert_eq!(request.days, vec![Day::Day1, Day::Day3]);
        assert_eq!(request.seats, vec![SeatSelection { seat_id: 11, day: Day::Day3 }]);
    }

    #[test]
    fn unknown_enum_values_are_validation_errors() {
        for bad in [body("Student", &["day1"], "day1"), body("employee", &["day9"], "day1"), body("employee", &["day1"], "")] {
            assert!(matches!(ReservationRequest::try_from(bad), Err(ApiError::Validation(_))));
        }
    }

    fn filter_from(uri: &str) -> ApiResult<ReservationFilter> {
        let uri: axum::http::Uri = uri.parse().unwrap();
        let Query(query) = Query::<ReservationQuery>::try_from_uri(&uri).unwrap();
        ReservationFilter::try_from(query)
    }

    #[test]
    fn blank_list_filters_mean_no_filter() {
        assert_eq!(filter_from("/api/reservations?day=&role=&search=").unwrap(), ReservationFilter::default());
        assert_eq!(filter_from("/api/reservations").unwrap(), ReservationFilter::default());
    }

    #[test]
    fn list_filters_parse_set_values() {
        let filter = filter_from("/api/reservations?day=day2&role=&search=").unwrap();
        assert_eq!(filter.day, Some(Day::Day2));
        assert_eq!(filter.role, None);

        let filter = filter_from("/api/reservations?day=&role=student&search=%20amrani%20").unwrap();
        assert_eq!(filter.role, Some(Role::Student));
        assert_eq!(filter.search.as_deref(), Some("amrani"));
    }

    #[test]
    fn unknown_list_filter_is_validation_error() {
        assert!(matches!(filter_from("/api/reservations?day=day7"), Err(ApiError::Validation(_))));
        assert!(matches!(filter_from("/api/reservations?role=Admin"), Err(ApiError::Validation(_))));
    }

    #[test]
    fn validate_response_flattens_status() {
        let response = ValidateQrResponse {
            success: false,
            message: describe(&ValidationResult::Unknown),
            result: ValidationResult::Unknown,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "unknown");
        assert_eq!(json["success"], false);
    }
}
