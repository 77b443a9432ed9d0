use chrono::NaiveTime;
use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use super::{Day, ParseEnumError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramSpeaker {
    pub id: i64,
    pub name: String,
    pub job_title: String,
    pub photo: Option<String>,
}

/// Сессия программы конференции.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: i64,
    pub title: String,
    pub day: Day,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub speaker: Option<ProgramSpeaker>,
}

// programs LEFT JOIN speakers
#[derive(Debug, FromRow)]
pub struct ProgramRow {
    pub id: i64,
    pub title: String,
    pub day: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub speaker_id: Option<i64>,
    pub speaker_name: Option<String>,
    pub speaker_job_title: Option<String>,
    pub speaker_photo: Option<String>,
}

impl TryFrom<ProgramRow> for Program {
    type Error = ParseEnumError;

    fn try_from(row: ProgramRow) -> Result<Self, Self::Error> {
        let speaker = match (row.speaker_id, row.speaker_name, row.speaker_job_title) {
            (Some(id), Some(name), Some(job_title)) => Some(ProgramSpeaker {
                id,
                name,
                job_title,
                photo: row.speaker_photo,
            }),
            _ => None,
        };

        Ok(Program {
            id: row.id,
            title: row.title,
            day: row.day.parse()?,
            start_time: row.start_time,
            end_time: row.end_time,
            speaker,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_time_range"))]
pub struct ProgramInput {
    #[validate(length(min = 1, max = 255, message = "title is required (max 255 characters)"))]
    pub title: String,
    pub day: Day,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub speaker_id: Option<i64>,
}

fn validate_time_range(input: &ProgramInput) -> Result<(), ValidationError> {
    if input.end_time <= input.start_time {
        return Err(ValidationError::new("time_range")
            .with_message("end_time must be after start_time".into()));
    }
    Ok(())
}

const PROGRAM_SELECT: &str = "SELECT p.id, p.title, p.day, p.start_time, p.end_time,
        s.id AS speaker_id, s.name AS speaker_name, s.job_title AS speaker_job_title, s.photo AS speaker_photo
     FROM programs p
     LEFT JOIN speakers s ON s.id = p.speaker_id";

fn decode(row: ProgramRow) -> Result<Program, sqlx::Error> {
    Program::try_from(row).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

impl Program {
    pub async fn list(pool: &sqlx::PgPool) -> Result<Vec<Program>, sqlx::Error> {
        sqlx::query_as::<_, ProgramRow>(&format!("{} ORDER BY p.day, p.start_time, p.id", PROGRAM_SELECT))
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn find(id: i64, pool: &sqlx::PgPool) -> Result<Option<Program>, sqlx::Error> {
        sqlx::query_as::<_, ProgramRow>(&format!("{} WHERE p.id = $1", PROGRAM_SELECT))
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn create(input: &ProgramInput, pool: &sqlx::PgPool) -> Result<Program, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO programs (title, day, start_time, end_time, speaker_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id"
        )
        .bind(input.title.trim())
        .bind(input.day.as_str())
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(input.speaker_id)
        .fetch_one(pool)
        .await?;

        Program::find(id, pool).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn update(id: i64, input: &ProgramInput, pool: &sqlx::PgPool) -> Result<Option<Program>, sqlx::Error> {
        let updated = sqlx::query(
            "UPDATE programs
             SET title = $2, day = $3, start_time = $4, end_time = $5, speaker_id = $6, updated_at = NOW()
             WHERE id = $1"
        )
        .bind(id)
        .bind(input.title.trim())
        .bind(input.day.as_str())
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(input.speaker_id)
        .execute(pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Ok(None);
        }
        Program::find(id, pool).await
    }

    pub async fn delete(id: i64, pool: &sqlx::PgPool) -> Result<bool, sqlx::Error> {
        let deleted = sqlx::query("DELETE FROM programs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }
}

/// Программа, сгруппированная по дням, в порядке начала сессий.
pub fn group_by_day(programs: &[Program]) -> BTreeMap<Day, Vec<Program>> {
    let mut grouped: BTreeMap<Day, Vec<Program>> = Day::ALL.iter().map(|day| (*day, Vec::new())).collect();
    for program in programs {
        grouped.entry(program.day).or_default().push(program.clone());
    }
    for sessions in grouped.values_mut() {
        sessions.sort_by_key(|p| (p.start_time, p.id));
    }
    grouped
}
