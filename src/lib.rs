pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use services::{LogNotifier, Notifier, Services, WebhookNotifier};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub db: database::Database,
    pub cache: cache::CacheService,
    pub services: Services,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database).await?;
        db.run_migrations().await?;

        let redis = redis_client::RedisClient::new(&config.redis.url).await?;
        let cache = cache::CacheService::new(redis, config.redis.availability_ttl_seconds);

        let tx_timeout = config.booking.transaction_timeout();
        let store = Arc::new(store::PgStore::new(db.pool.clone()));
        let services = Services::new(store, build_notifier(&config.notify)?, tx_timeout);

        Ok(Arc::new(Self {
            config,
            db,
            cache,
            services,
        }))
    }
}

fn build_notifier(config: &config::NotifyConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    match &config.webhook_url {
        Some(url) => {
            info!("Booking confirmations go to {}", url);
            let notifier =
                WebhookNotifier::new(url.clone(), Duration::from_secs(config.timeout_seconds))?;
            Ok(Arc::new(notifier))
        }
        None => {
            info!("NOTIFY_WEBHOOK_URL not set, booking confirmations are only logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}
