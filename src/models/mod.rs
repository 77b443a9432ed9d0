pub mod admin;
pub mod program;
pub mod reservation;
pub mod seat;
pub mod speaker;

pub use admin::Admin;
pub use program::{group_by_day, Program, ProgramInput};
pub use reservation::{Attendee, Claim, Day, Reservation, ReservationRequest, Role, SeatSelection};
pub use seat::{Block, Category, Seat};
pub use speaker::{Speaker, SpeakerInput};

use thiserror::Error;

/// Строковое значение не совпало ни с одним вариантом перечисления.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} `{value}`")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

// Склеивает ошибки validator в одну строку для ответа клиенту
pub fn describe_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}
