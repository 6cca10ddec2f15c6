use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use futures::{stream::BoxStream, StreamExt};
use uuid::Uuid;

use super::{BookingStore, CardDirectory, PromotionStore, ScheduleStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    Booking, BookingStatus, BookingView, NewBooking, NewPromotion, NewShowtime, Promotion,
    Showroom, Showtime, ShowtimeView, Ticket,
};

#[derive(Default)]
struct MemoryState {
    showrooms: BTreeMap<i64, Showroom>,
    showtimes: BTreeMap<i64, Showtime>,
    next_showtime_id: i64,
    seats: BTreeSet<(i64, String)>,
    promotions: BTreeMap<i64, Promotion>,
    next_promotion_id: i64,
    // card_id -> customer_id
    cards: HashMap<String, String>,
    bookings: Vec<Booking>,
    tickets: Vec<Ticket>,
}

impl MemoryState {
    fn view(&self, showtime: &Showtime) -> Option<ShowtimeView> {
        let room = self.showrooms.get(&showtime.showroom_id)?;
        Some(ShowtimeView {
            id: showtime.id,
            movie_id: showtime.movie_id,
            showroom_id: showtime.showroom_id,
            show_date: showtime.show_date,
            show_time: showtime.show_time,
            showroom_name: room.name.clone(),
            seat_count: room.seat_count,
        })
    }

    fn booking_view(&self, booking: &Booking) -> BookingView {
        let mut tickets: Vec<Ticket> = self
            .tickets
            .iter()
            .filter(|t| t.booking_id == booking.id)
            .cloned()
            .collect();
        tickets.sort_by(|a, b| a.seat_id.cmp(&b.seat_id));
        BookingView {
            booking: booking.clone(),
            tickets,
        }
    }
}

/// Хранилище в памяти процесса с теми же гарантиями, что и `PgStore`:
/// слот зала и пара (сеанс, место) уникальны, бронь пишется целиком
/// под одной блокировкой или не пишется вовсе.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    faults: Faults,
}

/// Внедряемые сбои; включаются только из тестов.
#[derive(Default)]
struct Faults {
    // задержка до записи, внутри дедлайна
    commit_delay: Mutex<Option<Duration>>,
    // задержка ответа после записи, вне дедлайна
    ack_delay: Mutex<Option<Duration>>,
    fail_next_commit: AtomicBool,
    fail_seat_reads: AtomicBool,
}

fn read_delay(slot: &Mutex<Option<Duration>>) -> Option<Duration> {
    *slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_showroom(&self, showroom: Showroom) {
        self.lock().showrooms.insert(showroom.id, showroom);
    }

    pub fn add_card(&self, customer_id: &str, card_id: &str) {
        self.lock()
            .cards
            .insert(card_id.to_string(), customer_id.to_string());
    }

    pub fn booking_count(&self) -> usize {
        self.lock().bookings.len()
    }

    pub fn ticket_count(&self) -> usize {
        self.lock().tickets.len()
    }

    /// Сколько мест уже материализовано в зале.
    pub fn seat_rows(&self, showroom_id: i64) -> usize {
        self.lock()
            .seats
            .iter()
            .filter(|(room, _)| *room == showroom_id)
            .count()
    }

    pub fn showtime_count(&self) -> usize {
        self.lock().showtimes.len()
    }

    pub fn tickets_for_seat(&self, showtime_id: i64, seat_id: &str) -> usize {
        self.lock()
            .tickets
            .iter()
            .filter(|t| t.showtime_id == showtime_id && t.seat_id == seat_id)
            .count()
    }

    /// Пишет бронь целиком или не пишет ничего.
    fn write_booking(&self, booking: &NewBooking) -> AppResult<()> {
        let mut state = self.lock();
        if !state.showtimes.contains_key(&booking.showtime_id) {
            return Err(AppError::Storage(sqlx::Error::Protocol(format!(
                "showtime {} does not exist",
                booking.showtime_id
            ))));
        }

        // Проверка и запись под одной блокировкой: аналог уникального индекса
        let seat_ids = booking.seat_ids();
        let mut requested = BTreeSet::new();
        for seat_id in &seat_ids {
            let sold = state
                .tickets
                .iter()
                .any(|t| t.showtime_id == booking.showtime_id && &t.seat_id == seat_id);
            if sold || !requested.insert(seat_id.clone()) {
                return Err(AppError::seats_taken(Vec::new()));
            }
        }

        state.bookings.push(Booking {
            id: booking.id,
            customer_id: booking.customer_id.clone(),
            showtime_id: booking.showtime_id,
            status: BookingStatus::Confirmed,
            total_price: booking.total_price,
            promotion_id: booking.promotion_id,
            card_id: booking.card_id.clone(),
            created_at: Utc::now(),
        });
        for (ticket, seat_id) in booking.tickets.iter().zip(seat_ids) {
            state.seats.insert((booking.showroom_id, seat_id.clone()));
            state.tickets.push(Ticket {
                id: ticket.id,
                booking_id: booking.id,
                showtime_id: booking.showtime_id,
                seat_id,
                price: ticket.price,
                ticket_type: ticket.ticket_type,
            });
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-util"))]
impl MemoryStore {
    /// Следующий коммит брони завершится ошибкой хранилища.
    pub fn fail_next_commit(&self) {
        self.faults.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Задержка перед записью брони, чтобы проверить таймауты.
    pub fn set_commit_delay(&self, delay: Option<Duration>) {
        *self
            .faults
            .commit_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = delay;
    }

    /// Задержка ответа уже после записи брони: медленный COMMIT.
    pub fn set_ack_delay(&self, delay: Option<Duration>) {
        *self
            .faults
            .ack_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = delay;
    }

    /// Чтение занятых мест завершается ошибкой, пока флаг поднят.
    pub fn fail_seat_reads(&self, fail: bool) {
        self.faults.fail_seat_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn slot_taken(
        &self,
        showroom_id: i64,
        show_date: NaiveDate,
        show_time: NaiveTime,
    ) -> AppResult<bool> {
        Ok(self.lock().showtimes.values().any(|s| {
            s.showroom_id == showroom_id && s.show_date == show_date && s.show_time == show_time
        }))
    }

    async fn insert_showtime(&self, showtime: &NewShowtime) -> AppResult<Option<i64>> {
        let mut state = self.lock();
        if !state.showrooms.contains_key(&showtime.showroom_id) {
            return Err(AppError::invalid(format!(
                "unknown showroom {}",
                showtime.showroom_id
            )));
        }
        let taken = state.showtimes.values().any(|s| {
            s.showroom_id == showtime.showroom_id
                && s.show_date == showtime.show_date
                && s.show_time == showtime.show_time
        });
        if taken {
            return Ok(None);
        }

        state.next_showtime_id += 1;
        let id = state.next_showtime_id;
        state.showtimes.insert(
            id,
            Showtime {
                id,
                movie_id: showtime.movie_id,
                showroom_id: showtime.showroom_id,
                show_date: showtime.show_date,
                show_time: showtime.show_time,
            },
        );
        Ok(Some(id))
    }

    fn showtimes_by_movie(&self, movie_id: i64) -> BoxStream<'_, AppResult<ShowtimeView>> {
        let mut views: Vec<ShowtimeView> = {
            let state = self.lock();
            state
                .showtimes
                .values()
                .filter(|s| s.movie_id == movie_id)
                .filter_map(|s| state.view(s))
                .collect()
        };
        views.sort_by_key(|v| (v.show_date, v.show_time));
        futures::stream::iter(views.into_iter().map(Ok)).boxed()
    }

    async fn find_showtime(&self, showtime_id: i64) -> AppResult<Option<ShowtimeView>> {
        let state = self.lock();
        Ok(state
            .showtimes
            .get(&showtime_id)
            .and_then(|s| state.view(s)))
    }

    async fn find_showroom(&self, showroom_id: i64) -> AppResult<Option<Showroom>> {
        Ok(self.lock().showrooms.get(&showroom_id).cloned())
    }

    async fn showrooms(&self) -> AppResult<Vec<Showroom>> {
        Ok(self.lock().showrooms.values().cloned().collect())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn booked_seats(&self, showtime_id: i64) -> AppResult<BTreeSet<String>> {
        if self.faults.fail_seat_reads.load(Ordering::SeqCst) {
            return Err(injected("seat read"));
        }
        Ok(self
            .lock()
            .tickets
            .iter()
            .filter(|t| t.showtime_id == showtime_id)
            .map(|t| t.seat_id.clone())
            .collect())
    }

    async fn commit_booking(&self, booking: &NewBooking, deadline: Duration) -> AppResult<Uuid> {
        // Работа до записи ограничена дедлайном, как транзакция в PgStore
        let prepare = async {
            if let Some(delay) = read_delay(&self.faults.commit_delay) {
                tokio::time::sleep(delay).await;
            }
            if self.faults.fail_next_commit.swap(false, Ordering::SeqCst) {
                return Err(injected("commit"));
            }
            Ok::<_, AppError>(())
        };
        tokio::time::timeout(deadline, prepare)
            .await
            .map_err(|_| AppError::Timeout)??;

        self.write_booking(booking)?;

        if let Some(delay) = read_delay(&self.faults.ack_delay) {
            tokio::time::sleep(delay).await;
        }
        Ok(booking.id)
    }

    async fn find_booking(
        &self,
        booking_id: Uuid,
        customer_id: &str,
    ) -> AppResult<Option<BookingView>> {
        let state = self.lock();
        Ok(state
            .bookings
            .iter()
            .find(|b| b.id == booking_id && b.customer_id == customer_id)
            .map(|b| state.booking_view(b)))
    }

    async fn bookings_for_customer(&self, customer_id: &str) -> AppResult<Vec<BookingView>> {
        let state = self.lock();
        let mut views: Vec<BookingView> = state
            .bookings
            .iter()
            .filter(|b| b.customer_id == customer_id)
            .map(|b| state.booking_view(b))
            .collect();
        // Новые сверху; при равных метках времени позже вставленные
        views.reverse();
        views.sort_by(|a, b| b.booking.created_at.cmp(&a.booking.created_at));
        Ok(views)
    }
}

#[async_trait]
impl PromotionStore for MemoryStore {
    async fn find_by_code(&self, code: &str) -> AppResult<Option<Promotion>> {
        Ok(self
            .lock()
            .promotions
            .values()
            .find(|p| p.code == code)
            .cloned())
    }

    async fn insert_promotion(&self, promotion: &NewPromotion) -> AppResult<Option<i64>> {
        let mut state = self.lock();
        if state.promotions.values().any(|p| p.code == promotion.code) {
            return Ok(None);
        }
        state.next_promotion_id += 1;
        let id = state.next_promotion_id;
        state.promotions.insert(
            id,
            Promotion {
                id,
                code: promotion.code.clone(),
                discount_percent: promotion.discount_percent,
                valid_from: promotion.valid_from,
                valid_to: promotion.valid_to,
            },
        );
        Ok(Some(id))
    }

    async fn promotions(&self) -> AppResult<Vec<Promotion>> {
        let mut promos: Vec<Promotion> = self.lock().promotions.values().cloned().collect();
        promos.sort_by(|a, b| b.valid_from.cmp(&a.valid_from).then(b.id.cmp(&a.id)));
        Ok(promos)
    }
}

#[async_trait]
impl CardDirectory for MemoryStore {
    async fn card_belongs_to(&self, customer_id: &str, card_id: &str) -> AppResult<bool> {
        Ok(self
            .lock()
            .cards
            .get(card_id)
            .is_some_and(|owner| owner == customer_id))
    }
}

fn injected(what: &str) -> AppError {
    AppError::Storage(sqlx::Error::Protocol(format!("injected {} failure", what)))
}
