use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Admin {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Admin {
    // Найти администратора по email
    pub async fn find_by_email(email: &str, pool: &sqlx::PgPool) -> Result<Option<Admin>, sqlx::Error> {
        sqlx::query_as::<_, Admin>(
            "SELECT id, name, email, password_hash, created_at FROM admins WHERE email = $1"
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Проверка пароля bcrypt. Ошибка разбора хеша считается неверным паролем.
    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }
}
