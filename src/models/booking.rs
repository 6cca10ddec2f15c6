use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::seat::SeatLabel;
use super::ticket::{Ticket, TicketType};
use crate::error::AppError;

/// Других состояний брони система не моделирует.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BookingStatus {
    Confirmed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "Confirmed",
        }
    }
}

impl TryFrom<String> for BookingStatus {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Confirmed" => Ok(BookingStatus::Confirmed),
            other => Err(AppError::invalid(format!("unknown booking status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: String,
    pub showtime_id: i64,
    #[sqlx(try_from = "String")]
    pub status: BookingStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub promotion_id: Option<i64>,
    pub card_id: String,
    pub created_at: DateTime<Utc>,
}

/// Бронь вместе с билетами.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub tickets: Vec<Ticket>,
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub id: Uuid,
    pub seat: SeatLabel,
    pub price: Decimal,
    pub ticket_type: TicketType,
}

/// Всё, что нужно записать одной транзакцией.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub id: Uuid,
    pub customer_id: String,
    pub showtime_id: i64,
    pub showroom_id: i64,
    pub total_price: Decimal,
    pub promotion_id: Option<i64>,
    pub card_id: String,
    pub tickets: Vec<NewTicket>,
}

impl NewBooking {
    pub fn seat_ids(&self) -> Vec<String> {
        self.tickets.iter().map(|t| t.seat.seat_id()).collect()
    }
}
