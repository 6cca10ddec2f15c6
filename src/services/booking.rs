//! booking.rs
//!
//! Оформление брони: единственный компонент, который создаёт брони и билеты.
//!
//! Попытка проходит фазы `Validating -> Pricing -> Reserving -> Committed`
//! и может быть отклонена на любой из них. Запись брони и всех её билетов
//! идёт одной транзакцией. Проверка занятых мест перед записью лишь даёт
//! быструю ошибку: от двойной продажи защищает уникальный индекс
//! `(showtime_id, seat_id)`, и проигравшая гонку транзакция откатывается целиком.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::notifier::{self, BookingConfirmation, Notifier};
use super::pricing::{unit_price, PricingResolver, Quote};
use crate::error::{AppError, AppResult, Conflict};
use crate::models::{
    BookingView, NewBooking, NewTicket, SeatLabel, Showroom, ShowtimeView, TicketSelection,
    TicketType,
};
use crate::store::{BookingStore, CardDirectory, ScheduleStore};

/// Фаза, на которой находится попытка брони.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingPhase {
    Validating,
    Pricing,
    Reserving,
    Committed,
}

impl fmt::Display for BookingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookingPhase::Validating => "validating",
            BookingPhase::Pricing => "pricing",
            BookingPhase::Reserving => "reserving",
            BookingPhase::Committed => "committed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub customer_id: String,
    /// Если указан, должен совпадать с фильмом сеанса.
    pub movie_id: Option<i64>,
    pub showtime_id: i64,
    pub tickets: Vec<TicketSelection>,
    pub promo_code: Option<String>,
    pub card_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingReceipt {
    pub booking_id: Uuid,
    pub showtime_id: i64,
    pub seats: Vec<String>,
    #[serde(flatten)]
    pub quote: Quote,
}

struct ValidatedRequest {
    showtime: ShowtimeView,
    seats: Vec<SeatLabel>,
}

#[derive(Clone)]
pub struct BookingEngine {
    schedule: Arc<dyn ScheduleStore>,
    bookings: Arc<dyn BookingStore>,
    cards: Arc<dyn CardDirectory>,
    pricing: PricingResolver,
    notifier: Arc<dyn Notifier>,
    tx_timeout: Duration,
}

impl BookingEngine {
    pub fn new(
        schedule: Arc<dyn ScheduleStore>,
        bookings: Arc<dyn BookingStore>,
        cards: Arc<dyn CardDirectory>,
        pricing: PricingResolver,
        notifier: Arc<dyn Notifier>,
        tx_timeout: Duration,
    ) -> Self {
        Self {
            schedule,
            bookings,
            cards,
            pricing,
            notifier,
            tx_timeout,
        }
    }

    pub async fn booked_seats(&self, showtime_id: i64) -> AppResult<BTreeSet<String>> {
        self.bookings.booked_seats(showtime_id).await
    }

    /// Чужая бронь неотличима от несуществующей.
    pub async fn booking_by_id(&self, booking_id: Uuid, customer_id: &str) -> AppResult<BookingView> {
        self.bookings
            .find_booking(booking_id, customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("booking {}", booking_id)))
    }

    pub async fn create_booking(&self, request: BookingRequest) -> AppResult<BookingReceipt> {
        let mut phase = BookingPhase::Validating;
        let result = self.process(&request, &mut phase).await;

        match &result {
            Ok(receipt) => info!(
                "Booking {} created for customer {}: {} seats, total {}",
                receipt.booking_id,
                request.customer_id,
                receipt.seats.len(),
                receipt.quote.total
            ),
            Err(e) => warn!(
                "Booking for customer {} on showtime {} rejected while {}: {}",
                request.customer_id, request.showtime_id, phase, e
            ),
        }
        result
    }

    async fn process(
        &self,
        request: &BookingRequest,
        phase: &mut BookingPhase,
    ) -> AppResult<BookingReceipt> {
        let ValidatedRequest { showtime, seats } = self.validate(request).await?;

        *phase = BookingPhase::Pricing;
        let types: Vec<TicketType> = request.tickets.iter().map(|t| t.ticket_type).collect();
        let quote = self
            .pricing
            .quote(&types, request.promo_code.as_deref())
            .await?;

        *phase = BookingPhase::Reserving;
        let seat_ids: Vec<String> = seats.iter().map(SeatLabel::seat_id).collect();

        // Быстрая проверка; окончательное решение за уникальным индексом
        let booked = self.bookings.booked_seats(showtime.id).await?;
        let taken: Vec<String> = seat_ids.iter().filter(|s| booked.contains(*s)).cloned().collect();
        if !taken.is_empty() {
            return Err(AppError::seats_taken(taken));
        }

        let new_booking = NewBooking {
            id: Uuid::new_v4(),
            customer_id: request.customer_id.clone(),
            showtime_id: showtime.id,
            showroom_id: showtime.showroom_id,
            total_price: quote.total,
            promotion_id: quote.applied_promo_id,
            card_id: request.card_id.clone(),
            tickets: seats
                .into_iter()
                .zip(&types)
                .map(|(seat, ticket_type)| NewTicket {
                    id: Uuid::new_v4(),
                    seat,
                    price: unit_price(*ticket_type),
                    ticket_type: *ticket_type,
                })
                .collect(),
        };

        let booking_id = self.commit(&new_booking, &seat_ids).await?;
        *phase = BookingPhase::Committed;

        notifier::dispatch(
            self.notifier.clone(),
            BookingConfirmation {
                booking_id,
                customer_id: request.customer_id.clone(),
                showtime_id: showtime.id,
                seats: seat_ids.clone(),
                total: quote.total,
            },
        );

        Ok(BookingReceipt {
            booking_id,
            showtime_id: showtime.id,
            seats: seat_ids,
            quote,
        })
    }

    async fn commit(&self, booking: &NewBooking, seat_ids: &[String]) -> AppResult<Uuid> {
        // Таймаут до COMMIT откатывает транзакцию внутри хранилища
        let outcome = self.bookings.commit_booking(booking, self.tx_timeout).await;

        match outcome {
            Err(AppError::Conflict(Conflict::SeatsTaken { seats })) if seats.is_empty() => {
                // Индекс не говорит, какие места заняты, перечитаем
                let booked = match self.bookings.booked_seats(booking.showtime_id).await {
                    Ok(booked) => booked,
                    Err(e) => {
                        warn!(
                            "Failed to re-read booked seats for showtime {}: {}",
                            booking.showtime_id, e
                        );
                        BTreeSet::new()
                    }
                };
                let taken = seat_ids.iter().filter(|s| booked.contains(*s)).cloned().collect();
                Err(AppError::seats_taken(taken))
            }
            other => other,
        }
    }

    async fn validate(&self, request: &BookingRequest) -> AppResult<ValidatedRequest> {
        if request.customer_id.trim().is_empty() {
            return Err(AppError::invalid("customer id is required"));
        }
        if request.showtime_id <= 0 {
            return Err(AppError::invalid("showtimeId is required"));
        }
        if request.tickets.is_empty() {
            return Err(AppError::invalid("at least one ticket is required"));
        }
        if request.card_id.trim().is_empty() {
            return Err(AppError::invalid("cardId is required"));
        }

        let mut seen = HashSet::new();
        let mut seats = Vec::with_capacity(request.tickets.len());
        for selection in &request.tickets {
            let seat = SeatLabel::parse(&selection.seat_id)?;
            if !seen.insert(seat.seat_id()) {
                return Err(AppError::invalid(format!(
                    "seat {} selected more than once",
                    seat.seat_id()
                )));
            }
            seats.push(seat);
        }

        let showtime = self
            .schedule
            .find_showtime(request.showtime_id)
            .await?
            .ok_or_else(|| AppError::invalid(format!("unknown showtime {}", request.showtime_id)))?;

        if let Some(movie_id) = request.movie_id {
            if movie_id != showtime.movie_id {
                return Err(AppError::invalid(format!(
                    "showtime {} does not belong to movie {}",
                    showtime.id, movie_id
                )));
            }
        }

        let showroom: Showroom = self
            .schedule
            .find_showroom(showtime.showroom_id)
            .await?
            .ok_or_else(|| AppError::invalid(format!("unknown showroom {}", showtime.showroom_id)))?;
        if let Some(outside) = seats.iter().find(|s| !showroom.contains(s)) {
            return Err(AppError::invalid(format!(
                "seat {} is outside showroom {}",
                outside.seat_id(),
                showroom.name
            )));
        }

        let owns_card = self
            .cards
            .card_belongs_to(&request.customer_id, &request.card_id)
            .await?;
        if !owns_card {
            return Err(AppError::invalid("payment card does not belong to the customer"));
        }

        Ok(ValidatedRequest { showtime, seats })
    }
}
