use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use futures::{stream::BoxStream, StreamExt, TryStreamExt};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use super::{BookingStore, CardDirectory, PromotionStore, ScheduleStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    Booking, BookingStatus, BookingView, NewBooking, NewPromotion, NewShowtime, Promotion,
    Showroom, ShowtimeView, Ticket,
};

const TICKET_SEAT_CONSTRAINT: &str = "tickets_showtime_seat_key";
// query_canceled: сработал statement_timeout
const QUERY_CANCELED: &str = "57014";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn tickets_for(&self, booking_ids: &[Uuid]) -> AppResult<Vec<Ticket>> {
        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT id, booking_id, showtime_id, seat_id, price, ticket_type
             FROM tickets
             WHERE booking_id = ANY($1)
             ORDER BY seat_id",
        )
        .bind(booking_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }

    /// Все записи брони без COMMIT. Транзакция откатывается при drop,
    /// в том числе на любом `?` ниже.
    async fn write_booking(
        &self,
        booking: &NewBooking,
        statement_timeout: Duration,
    ) -> AppResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;

        // SET LOCAL не принимает bind-параметры
        sqlx::query(&format!(
            "SET LOCAL statement_timeout = {}",
            statement_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        // 1) Бронь
        sqlx::query(
            "INSERT INTO bookings
                (id, customer_id, showtime_id, status, total_price, promotion_id, card_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(booking.id)
        .bind(&booking.customer_id)
        .bind(booking.showtime_id)
        .bind(BookingStatus::Confirmed.as_str())
        .bind(booking.total_price)
        .bind(booking.promotion_id)
        .bind(&booking.card_id)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        let seat_ids = booking.seat_ids();
        let row_labels: Vec<String> = booking.tickets.iter().map(|t| t.seat.row_label.clone()).collect();
        let seat_numbers: Vec<i32> = booking.tickets.iter().map(|t| t.seat.seat_number).collect();

        // 2) Места создаются лениво
        sqlx::query(
            "INSERT INTO seats (showroom_id, seat_id, row_label, seat_number)
             SELECT $1, u.seat_id, u.row_label, u.seat_number
             FROM UNNEST($2::text[], $3::text[], $4::int4[]) AS u(seat_id, row_label, seat_number)
             ORDER BY u.seat_id
             ON CONFLICT DO NOTHING",
        )
        .bind(booking.showroom_id)
        .bind(&seat_ids)
        .bind(&row_labels)
        .bind(&seat_numbers)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        // 3) Все билеты одним запросом; уникальность (showtime_id, seat_id) решает гонки.
        // Одинаковый порядок вставки во всех транзакциях исключает взаимные блокировки
        let ticket_ids: Vec<Uuid> = booking.tickets.iter().map(|t| t.id).collect();
        let prices: Vec<rust_decimal::Decimal> = booking.tickets.iter().map(|t| t.price).collect();
        let types: Vec<&str> = booking.tickets.iter().map(|t| t.ticket_type.as_str()).collect();

        let inserted = sqlx::query(
            "INSERT INTO tickets (id, booking_id, showtime_id, showroom_id, seat_id, price, ticket_type)
             SELECT t.id, $1, $2, $3, t.seat_id, t.price, t.ticket_type
             FROM UNNEST($4::uuid[], $5::text[], $6::numeric[], $7::text[])
                  AS t(id, seat_id, price, ticket_type)
             ORDER BY t.seat_id",
        )
        .bind(booking.id)
        .bind(booking.showtime_id)
        .bind(booking.showroom_id)
        .bind(&ticket_ids)
        .bind(&seat_ids)
        .bind(&prices)
        .bind(&types)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        if inserted.rows_affected() != booking.tickets.len() as u64 {
            // drop(tx) откатит бронь
            return Err(AppError::Storage(sqlx::Error::Protocol(format!(
                "expected {} tickets, inserted {}",
                booking.tickets.len(),
                inserted.rows_affected()
            ))));
        }

        Ok(tx)
    }
}

fn map_write_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.constraint() == Some(TICKET_SEAT_CONSTRAINT) {
            return AppError::seats_taken(Vec::new());
        }
        if db.code().as_deref() == Some(QUERY_CANCELED) {
            return AppError::Timeout;
        }
    }
    AppError::Storage(e)
}

#[async_trait]
impl ScheduleStore for PgStore {
    async fn slot_taken(
        &self,
        showroom_id: i64,
        show_date: NaiveDate,
        show_time: NaiveTime,
    ) -> AppResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM showtimes
                WHERE showroom_id = $1 AND show_date = $2 AND show_time = $3
             )",
        )
        .bind(showroom_id)
        .bind(show_date)
        .bind(show_time)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn insert_showtime(&self, showtime: &NewShowtime) -> AppResult<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO showtimes (movie_id, showroom_id, show_date, show_time)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT ON CONSTRAINT showtimes_slot_key DO NOTHING
             RETURNING id",
        )
        .bind(showtime.movie_id)
        .bind(showtime.showroom_id)
        .bind(showtime.show_date)
        .bind(showtime.show_time)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            let unknown_room = matches!(&e, sqlx::Error::Database(db) if db.is_foreign_key_violation());
            if unknown_room {
                AppError::invalid(format!("unknown showroom {}", showtime.showroom_id))
            } else {
                AppError::Storage(e)
            }
        })?;
        Ok(id)
    }

    fn showtimes_by_movie(&self, movie_id: i64) -> BoxStream<'_, AppResult<ShowtimeView>> {
        sqlx::query_as::<_, ShowtimeView>(
            "SELECT s.id, s.movie_id, s.showroom_id, s.show_date, s.show_time,
                    r.name AS showroom_name, r.seat_count
             FROM showtimes s
             JOIN showrooms r ON r.id = s.showroom_id
             WHERE s.movie_id = $1
             ORDER BY s.show_date, s.show_time",
        )
        .bind(movie_id)
        .fetch(&self.pool)
        .map_err(AppError::from)
        .boxed()
    }

    async fn find_showtime(&self, showtime_id: i64) -> AppResult<Option<ShowtimeView>> {
        let showtime = sqlx::query_as::<_, ShowtimeView>(
            "SELECT s.id, s.movie_id, s.showroom_id, s.show_date, s.show_time,
                    r.name AS showroom_name, r.seat_count
             FROM showtimes s
             JOIN showrooms r ON r.id = s.showroom_id
             WHERE s.id = $1",
        )
        .bind(showtime_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(showtime)
    }

    async fn find_showroom(&self, showroom_id: i64) -> AppResult<Option<Showroom>> {
        let room = sqlx::query_as::<_, Showroom>(
            "SELECT id, name, seat_count, num_rows, num_cols, theatre_id
             FROM showrooms WHERE id = $1",
        )
        .bind(showroom_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(room)
    }

    async fn showrooms(&self) -> AppResult<Vec<Showroom>> {
        let rooms = sqlx::query_as::<_, Showroom>(
            "SELECT id, name, seat_count, num_rows, num_cols, theatre_id
             FROM showrooms ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rooms)
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn booked_seats(&self, showtime_id: i64) -> AppResult<BTreeSet<String>> {
        let seats = sqlx::query_scalar::<_, String>(
            "SELECT seat_id FROM tickets WHERE showtime_id = $1",
        )
        .bind(showtime_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(seats.into_iter().collect())
    }

    async fn commit_booking(&self, booking: &NewBooking, deadline: Duration) -> AppResult<Uuid> {
        // Таймер покрывает только работу до COMMIT: по истечении транзакция
        // дропается и откатывается, а начатый COMMIT уже не прерывается
        let tx = tokio::time::timeout(deadline, self.write_booking(booking, deadline))
            .await
            .map_err(|_| AppError::Timeout)??;

        tx.commit().await.map_err(map_write_error)?;

        info!(
            "Booking {} committed: {} tickets for showtime {}",
            booking.id,
            booking.tickets.len(),
            booking.showtime_id
        );
        Ok(booking.id)
    }

    async fn find_booking(
        &self,
        booking_id: Uuid,
        customer_id: &str,
    ) -> AppResult<Option<BookingView>> {
        // Владелец проверяется в самом запросе
        let booking = sqlx::query_as::<_, Booking>(
            "SELECT id, customer_id, showtime_id, status, total_price, promotion_id, card_id, created_at
             FROM bookings
             WHERE id = $1 AND customer_id = $2",
        )
        .bind(booking_id)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(booking) = booking else {
            return Ok(None);
        };
        let tickets = self.tickets_for(&[booking.id]).await?;
        Ok(Some(BookingView { booking, tickets }))
    }

    async fn bookings_for_customer(&self, customer_id: &str) -> AppResult<Vec<BookingView>> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT id, customer_id, showtime_id, status, total_price, promotion_id, card_id, created_at
             FROM bookings
             WHERE customer_id = $1
             ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        if bookings.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = bookings.iter().map(|b| b.id).collect();
        let mut by_booking: HashMap<Uuid, Vec<Ticket>> = HashMap::new();
        for ticket in self.tickets_for(&ids).await? {
            by_booking.entry(ticket.booking_id).or_default().push(ticket);
        }
        debug!("Loaded {} bookings for customer {}", bookings.len(), customer_id);

        Ok(bookings
            .into_iter()
            .map(|booking| {
                let tickets = by_booking.remove(&booking.id).unwrap_or_default();
                BookingView { booking, tickets }
            })
            .collect())
    }
}

#[async_trait]
impl PromotionStore for PgStore {
    async fn find_by_code(&self, code: &str) -> AppResult<Option<Promotion>> {
        let promo = sqlx::query_as::<_, Promotion>(
            "SELECT id, code, discount_percent, valid_from, valid_to
             FROM promotions WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(promo)
    }

    async fn insert_promotion(&self, promotion: &NewPromotion) -> AppResult<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO promotions (code, discount_percent, valid_from, valid_to)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT ON CONSTRAINT promotions_code_key DO NOTHING
             RETURNING id",
        )
        .bind(&promotion.code)
        .bind(promotion.discount_percent)
        .bind(promotion.valid_from)
        .bind(promotion.valid_to)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn promotions(&self) -> AppResult<Vec<Promotion>> {
        let promos = sqlx::query_as::<_, Promotion>(
            "SELECT id, code, discount_percent, valid_from, valid_to
             FROM promotions ORDER BY valid_from DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(promos)
    }
}

#[async_trait]
impl CardDirectory for PgStore {
    async fn card_belongs_to(&self, customer_id: &str, card_id: &str) -> AppResult<bool> {
        let owned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM payment_cards WHERE id = $1 AND customer_id = $2)",
        )
        .bind(card_id)
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(owned)
    }
}
