use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub admin: Option<AdminBootstrapConfig>,
    pub tickets: TicketConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
    pub cors_allowed_origin: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("unknown log format `{}` (expected pretty or json)", other),
        }
    }
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub acquire_timeout_seconds: u64,
}

// Настройки Redis (кеш публичных страниц)
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub cache_ttl_seconds: u64,
}

// Настройки JWT для админки
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_hours: i64,
}

// Администратор, которого создаём при старте, если его ещё нет
#[derive(Debug, Clone, Deserialize)]
pub struct AdminBootstrapConfig {
    pub name: String,
    pub email: String,
    pub password: String,
}

// Генерация кодов билетов
#[derive(Debug, Clone, Deserialize)]
pub struct TicketConfig {
    pub code_length: usize,
    pub code_attempts: u32,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{} must be set", key))
}

fn parsed_or<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .map_err(|e| anyhow::anyhow!("{} must be a valid value, got `{}`: {}", key, raw, e))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let admin = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(AdminBootstrapConfig {
                name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Admin".to_string()),
                email,
                password,
            }),
            _ => None,
        };

        Ok(Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parsed_or("PORT", "8000")?,
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "conference_registration=debug,tower_http=debug".to_string()),
                log_format: parsed_or("LOG_FORMAT", "pretty")?,
                cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN").ok(),
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: parsed_or("DB_POOL_SIZE", "20")?,
                acquire_timeout_seconds: parsed_or("DB_ACQUIRE_TIMEOUT_SECONDS", "5")?,
            },
            redis: RedisConfig {
                url: required("REDIS_URL")?,
                cache_ttl_seconds: parsed_or("CACHE_TTL_SECONDS", "3600")?,
            },
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
                expires_in_hours: parsed_or("JWT_EXPIRES_IN_HOURS", "24")?,
            },
            admin,
            tickets: TicketConfig {
                code_length: parsed_or("TICKET_CODE_LENGTH", "10")?,
                code_attempts: parsed_or("TICKET_CODE_ATTEMPTS", "5")?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
