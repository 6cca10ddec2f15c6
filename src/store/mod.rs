//! Узкие контракты хранилища, от которых зависят сервисы.
//!
//! `PgStore` реализует их поверх Postgres; `MemoryStore` держит те же
//! инварианты уникальности и атомарности в памяти процесса.

pub mod memory;
pub mod postgres;

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use futures::stream::BoxStream;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    BookingView, NewBooking, NewPromotion, NewShowtime, Promotion, Showroom, ShowtimeView,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn slot_taken(
        &self,
        showroom_id: i64,
        show_date: NaiveDate,
        show_time: NaiveTime,
    ) -> AppResult<bool>;

    /// Условная вставка: `None`, если слот уже занят.
    async fn insert_showtime(&self, showtime: &NewShowtime) -> AppResult<Option<i64>>;

    /// Ленивая последовательность сеансов фильма по возрастанию времени.
    fn showtimes_by_movie(&self, movie_id: i64) -> BoxStream<'_, AppResult<ShowtimeView>>;

    async fn find_showtime(&self, showtime_id: i64) -> AppResult<Option<ShowtimeView>>;

    async fn find_showroom(&self, showroom_id: i64) -> AppResult<Option<Showroom>>;

    async fn showrooms(&self) -> AppResult<Vec<Showroom>>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn booked_seats(&self, showtime_id: i64) -> AppResult<BTreeSet<String>>;

    /// Записывает бронь и все билеты целиком либо ничего.
    /// Занятое место даёт `AppError::Conflict(SeatsTaken)`.
    ///
    /// `deadline` ограничивает работу до COMMIT: по его истечении транзакция
    /// откатывается и возвращается `AppError::Timeout`. Сам COMMIT таймером
    /// не прерывается, поэтому зафиксированная бронь не может оказаться ошибкой.
    async fn commit_booking(&self, booking: &NewBooking, deadline: Duration) -> AppResult<Uuid>;

    async fn find_booking(&self, booking_id: Uuid, customer_id: &str)
        -> AppResult<Option<BookingView>>;

    async fn bookings_for_customer(&self, customer_id: &str) -> AppResult<Vec<BookingView>>;
}

#[async_trait]
pub trait PromotionStore: Send + Sync {
    async fn find_by_code(&self, code: &str) -> AppResult<Option<Promotion>>;

    /// `None`, если код уже занят.
    async fn insert_promotion(&self, promotion: &NewPromotion) -> AppResult<Option<i64>>;

    async fn promotions(&self) -> AppResult<Vec<Promotion>>;
}

/// Карты хранит профильная подсистема; ядру нужен только владелец.
#[async_trait]
pub trait CardDirectory: Send + Sync {
    async fn card_belongs_to(&self, customer_id: &str, card_id: &str) -> AppResult<bool>;
}
