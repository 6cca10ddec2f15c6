use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub booking: BookingConfig,
    pub notify: NotifyConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
    pub cors_allowed_origin: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub acquire_timeout_seconds: u64,
}

// Настройки Redis
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub availability_ttl_seconds: u64,
}

// Настройки оформления брони
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    pub transaction_timeout_ms: u64,
}

impl BookingConfig {
    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_millis(self.transaction_timeout_ms)
    }
}

// Куда отправлять подтверждения брони
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    pub webhook_url: Option<String>,
    pub timeout_seconds: u64,
}

fn var_or<T>(name: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("{} must be a valid value", name))
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{} must be set", name))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: var_or("PORT", "8000")?,
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "cinema_booking=debug,tower_http=debug".to_string()),
                log_format,
                cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: var_or("DB_POOL_SIZE", "20")?,
                acquire_timeout_seconds: var_or("DB_ACQUIRE_TIMEOUT_SECONDS", "5")?,
            },
            redis: RedisConfig {
                url: required("REDIS_URL")?,
                availability_ttl_seconds: var_or("AVAILABILITY_CACHE_TTL_SECONDS", "30")?,
            },
            booking: BookingConfig {
                transaction_timeout_ms: var_or("BOOKING_TX_TIMEOUT_MS", "5000")?,
            },
            notify: NotifyConfig {
                webhook_url: env::var("NOTIFY_WEBHOOK_URL").ok().filter(|u| !u.trim().is_empty()),
                timeout_seconds: var_or("NOTIFY_TIMEOUT_SECONDS", "5")?,
            },
        })
    }
}
