use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Speaker {
    pub id: i64,
    pub name: String,
    pub job_title: String,
    pub bio: String,
    pub photo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Тело запроса на создание/изменение спикера.
/// `photo` хранится как ссылка, загрузка файлов сюда не входит.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SpeakerInput {
    #[validate(length(min = 1, max = 255, message = "name is required (max 255 characters)"))]
    pub name: String,
    #[validate(length(min = 1, max = 255, message = "job_title is required (max 255 characters)"))]
    pub job_title: String,
    #[validate(length(min = 1, message = "bio is required"))]
    pub bio: String,
    #[validate(length(max = 2048, message = "photo must be at most 2048 characters"))]
    pub photo: Option<String>,
}

const SPEAKER_COLUMNS: &str = "id, name, job_title, bio, photo, created_at, updated_at";

impl Speaker {
    pub async fn list(pool: &sqlx::PgPool) -> Result<Vec<Speaker>, sqlx::Error> {
        sqlx::query_as::<_, Speaker>(&format!("SELECT {} FROM speakers ORDER BY name, id", SPEAKER_COLUMNS))
            .fetch_all(pool)
            .await
    }

    pub async fn find(id: i64, pool: &sqlx::PgPool) -> Result<Option<Speaker>, sqlx::Error> {
        sqlx::query_as::<_, Speaker>(&format!("SELECT {} FROM speakers WHERE id = $1", SPEAKER_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(input: &SpeakerInput, pool: &sqlx::PgPool) -> Result<Speaker, sqlx::Error> {
        sqlx::query_as::<_, Speaker>(&format!(
            "INSERT INTO speakers (name, job_title, bio, photo)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            SPEAKER_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(input.job_title.trim())
        .bind(input.bio.trim())
        .bind(input.photo.as_deref())
        .fetch_one(pool)
        .await
    }

    pub async fn update(id: i64, input: &SpeakerInput, pool: &sqlx::PgPool) -> Result<Option<Speaker>, sqlx::Error> {
        sqlx::query_as::<_, Speaker>(&format!(
            "UPDATE speakers
             SET name = $2, job_title = $3, bio = $4, photo = $5, updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            SPEAKER_COLUMNS
        ))
        .bind(id)
        .bind(input.name.trim())
        .bind(input.job_title.trim())
        .bind(input.bio.trim())
        .bind(input.photo.as_deref())
        .fetch_optional(pool)
        .await
    }

    // Сессии спикера остаются в программе без спикера (ON DELETE SET NULL)
    pub async fn delete(id: i64, pool: &sqlx::PgPool) -> Result<bool, sqlx::Error> {
        let deleted = sqlx::query("DELETE FROM speakers WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }
}
