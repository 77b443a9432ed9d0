use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

use super::ParseEnumError;

/// День конференции. В потоке бронирования это непрозрачное перечисление, а не дата.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Day1,
    Day2,
    Day3,
}

impl Day {
    pub const ALL: [Day; 3] = [Day::Day1, Day::Day2, Day::Day3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Day1 => "day1",
            Day::Day2 => "day2",
            Day::Day3 => "day3",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Day {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "day1" => Ok(Day::Day1),
            "day2" => Ok(Day::Day2),
            "day3" => Ok(Day::Day3),
            other => Err(ParseEnumError::new("day", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Employee,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Student, Role::Employee];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Employee => "employee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "student" => Ok(Role::Student),
            "employee" => Ok(Role::Employee),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

/// Контактные данные участника.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_institution"))]
pub struct Attendee {
    #[validate(length(min = 1, max = 255, message = "first_name is required (max 255 characters)"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 255, message = "last_name is required (max 255 characters)"))]
    pub last_name: String,
    #[validate(
        email(message = "email must be a valid address"),
        length(max = 255, message = "email must be at most 255 characters")
    )]
    pub email: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    pub role: Role,
    #[validate(length(max = 255, message = "institution_name must be at most 255 characters"))]
    pub institution_name: Option<String>,
}

impl Attendee {
    /// Обрезает пробелы; пустое название учреждения считается отсутствующим.
    pub fn normalized(self) -> Self {
        let institution_name = self
            .institution_name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            role: self.role,
            institution_name,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'));
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();

    if allowed && (6..=20).contains(&phone.len()) && digits >= 6 {
        Ok(())
    } else {
        Err(ValidationError::new("phone")
            .with_message("phone must be 6-20 characters of digits, spaces, +, -, ( or )".into()))
    }
}

// Студенту название учреждения обязательно
fn validate_institution(attendee: &Attendee) -> Result<(), ValidationError> {
    let has_institution = attendee
        .institution_name
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty());

    if attendee.role == Role::Student && !has_institution {
        return Err(ValidationError::new("institution_name")
            .with_message("institution_name is required for students".into()));
    }
    Ok(())
}

/// Выбор места на конкретный день.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeatSelection {
    pub seat_id: i64,
    pub day: Day,
}

/// Запрос на бронирование после разбора строковых полей.
#[derive(Debug, Clone)]
pub struct ReservationRequest {
    pub attendee: Attendee,
    pub days: Vec<Day>,
    pub seats: Vec<SeatSelection>,
}

/// Пара (место, день), закреплённая за бронированием.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claim {
    pub seat_id: i64,
    pub seat_number: String,
    pub day: Day,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reservation {
    pub id: i64,
    #[serde(flatten)]
    pub attendee: Attendee,
    pub days: Vec<Day>,
    pub claims: Vec<Claim>,
    pub ticket_code: String,
    pub qr_data: String,
    pub is_used: bool,
    pub scan_count: i32,
    pub last_scanned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
