use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::config::AdminBootstrapConfig;

#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Postgres>,
}

impl Database {
    pub async fn new(database_url: &str, pool_size: u32, acquire_timeout_seconds: u64) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(acquire_timeout_seconds))
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("./src/migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed");
        Ok(())
    }

    /// Создаёт администратора из конфигурации, если такого email ещё нет.
    pub async fn bootstrap_admin(&self, admin: &AdminBootstrapConfig) -> anyhow::Result<()> {
        let password = admin.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
            .await??;

        let created = sqlx::query(
            "INSERT INTO admins (name, email, password_hash)
             VALUES ($1, $2, $3)
             ON CONFLICT (email) DO NOTHING"
        )
        .bind(&admin.name)
        .bind(&admin.email)
        .bind(password_hash)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if created > 0 {
            info!("Bootstrap admin {} created", admin.email);
        }
        Ok(())
    }
}
