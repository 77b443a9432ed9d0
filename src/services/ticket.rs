//! ticket.rs
//!
//! Коды билетов и содержимое QR.
//!
//! - Код билета: заглавные латинские буквы и цифры, длина не меньше 8.
//! - QR содержит JSON `{"ticket_code": "...", "email": "..."}`. Сканер
//!   присылает эту строку обратно как есть.

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const TICKET_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const MIN_TICKET_CODE_LENGTH: usize = 8;
const MAX_TICKET_CODE_LENGTH: usize = 64;

/// Генератор кодов билетов с ограниченным числом попыток на одно бронирование.
#[derive(Debug, Clone, Copy)]
pub struct TicketCodeGenerator {
    length: usize,
    max_attempts: u32,
    source: fn(usize) -> String,
}

impl TicketCodeGenerator {
    pub fn new(length: usize, max_attempts: u32) -> Self {
        Self::with_source(length, max_attempts, random_code)
    }

    /// Генератор с подменённым источником кодов (например, детерминированным).
    pub fn with_source(length: usize, max_attempts: u32, source: fn(usize) -> String) -> Self {
        Self {
            length: length.clamp(MIN_TICKET_CODE_LENGTH, MAX_TICKET_CODE_LENGTH),
            max_attempts: max_attempts.max(1),
            source,
        }
    }

    pub fn generate(&self) -> String {
        (self.source)(self.length)
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for TicketCodeGenerator {
    fn default() -> Self {
        Self::new(10, 5)
    }
}

fn random_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| TICKET_ALPHABET[rng.gen_range(0..TICKET_ALPHABET.len())] as char)
        .collect()
}

pub fn is_well_formed(code: &str) -> bool {
    (MIN_TICKET_CODE_LENGTH..=MAX_TICKET_CODE_LENGTH).contains(&code.len())
        && code.bytes().all(|b| TICKET_ALPHABET.contains(&b))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketPayload {
    pub ticket_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl TicketPayload {
    pub fn encode(ticket_code: &str, email: &str) -> String {
        serde_json::json!({ "ticket_code": ticket_code, "email": email }).to_string()
    }

    /// Достаёт код билета из отсканированной строки.
    /// `None` для всего, что не является JSON-объектом с корректным `ticket_code`.
    pub fn parse_code(raw: &str) -> Option<String> {
        let payload: TicketPayload = serde_json::from_str(raw.trim()).ok()?;
        let code = payload.ticket_code.trim().to_ascii_uppercase();
        is_well_formed(&code).then_some(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn length_is_clamped_to_minimum() {
        let generator = TicketCodeGenerator::new(4, 0);
        assert_eq!(generator.length(), MIN_TICKET_CODE_LENGTH);
        assert_eq!(generator.max_attempts(), 1);
        assert_eq!(generator.generate().len(), MIN_TICKET_CODE_LENGTH);
    }

    #[test]
    fn parse_rejects_malformed_payloads() {
        assert_eq!(TicketPayload::parse_code("ABCDEFGH"), None);
        assert_eq!(TicketPayload::parse_code("{\"email\":\"a@b.c\"}"), None);
        assert_eq!(TicketPayload::parse_code("{\"ticket_code\":\"short\"}"), None);
        assert_eq!(TicketPayload::parse_code("{\"ticket_code\":\"ABC-DEFGH\"}"), None);
        assert_eq!(TicketPayload::parse_code("{\"ticket_code\":42}"), None);
    }

    #[test]
    fn parse_accepts_lowercase_manual_entry() {
        let raw = "{\"ticket_code\":\" k3j9x2mq7p \"}";
        assert_eq!(TicketPayload::parse_code(raw), Some("K3J9X2MQ7P".to_string()));
    }

    proptest! {
        #[test]
        fn generated_codes_are_well_formed(length in 0usize..80) {
            let generator = TicketCodeGenerator::new(length, 5);
            let code = generator.generate();
            prop_assert_eq!(code.len(), generator.length());
            prop_assert!(is_well_formed(&code));
        }

        #[test]
        fn encoded_payload_yields_its_code(email in "[a-z]{1,10}@[a-z]{1,10}\\.com") {
            let code = TicketCodeGenerator::default().generate();
            let raw = TicketPayload::encode(&code, &email);
            prop_assert_eq!(TicketPayload::parse_code(&raw), Some(code));
        }

        #[test]
        fn arbitrary_input_never_panics(raw in ".*") {
            let _ = TicketPayload::parse_code(&raw);
        }
    }
}
