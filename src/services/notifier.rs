use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub booking_id: Uuid,
    pub customer_id: String,
    pub showtime_id: i64,
    pub seats: Vec<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("webhook responded with status {0}")]
    Status(reqwest::StatusCode),
}

/// Отправка подтверждения брони. Доставкой (email и т.п.) занимается
/// внешний сервис; ошибка здесь никогда не отменяет бронь.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn booking_confirmed(&self, confirmation: &BookingConfirmation) -> Result<(), NotifyError>;
}

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn booking_confirmed(&self, confirmation: &BookingConfirmation) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(confirmation).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status()));
        }
        info!("Confirmation for booking {} delivered", confirmation.booking_id);
        Ok(())
    }
}

/// Используется, когда вебхук не настроен.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn booking_confirmed(&self, confirmation: &BookingConfirmation) -> Result<(), NotifyError> {
        info!(
            "Booking {} confirmed for customer {}: seats {:?}, total {}",
            confirmation.booking_id, confirmation.customer_id, confirmation.seats, confirmation.total
        );
        Ok(())
    }
}

/// Fire-and-forget после коммита: ошибка только логируется.
pub fn dispatch(notifier: Arc<dyn Notifier>, confirmation: BookingConfirmation) {
    tokio::spawn(async move {
        if let Err(e) = notifier.booking_confirmed(&confirmation).await {
            warn!(
                "Failed to send confirmation for booking {}: {}",
                confirmation.booking_id, e
            );
        }
    });
}
