use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AppResult, Conflict};
use crate::middleware::{ApiJson, CustomerId};
use crate::models::{TicketSelection, TicketType};
use crate::services::{pricing, BookingReceipt, BookingRequest, Quote};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/booking/quote", post(quote))
        .route("/booking/create", post(create_booking))
        .route("/booking/prices", get(prices))
        .route("/booking/availability/{showtime_id}", get(availability))
        .route("/booking/seats/{showtime_id}", get(seat_layout))
        .route("/booking/{booking_id}", get(get_booking))
        .route("/orders", get(list_orders))
}

/* ---------- PRICING ---------- */

// POST /api/booking/quote
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRequest {
    #[serde(default)]
    tickets: Vec<TicketSelection>,
    promo_code: Option<String>,
}

async fn quote(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<QuoteRequest>,
) -> AppResult<impl IntoResponse> {
    if req.tickets.is_empty() {
        return Err(AppError::invalid("at least one ticket is required"));
    }
    let types: Vec<TicketType> = req.tickets.iter().map(|t| t.ticket_type).collect();
    let quote = state
        .services
        .pricing
        .quote(&types, req.promo_code.as_deref())
        .await?;

    Ok(Json(QuoteResponse {
        success: true,
        quote,
    }))
}

#[derive(Debug, Serialize)]
struct QuoteResponse {
    success: bool,
    #[serde(flatten)]
    quote: Quote,
}

// GET /api/booking/prices
async fn prices() -> impl IntoResponse {
    Json(json!({ "success": true, "prices": pricing::rate_table() }))
}

/* ---------- BOOKINGS ---------- */

// POST /api/booking/create
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBookingRequest {
    movie_id: Option<i64>,
    #[serde(default)]
    showtime_id: i64,
    #[serde(default)]
    tickets: Vec<TicketSelection>,
    promo_code: Option<String>,
    #[serde(default)]
    card_id: String,
}

#[derive(Debug, Serialize)]
struct CreateBookingResponse {
    success: bool,
    #[serde(flatten)]
    receipt: BookingReceipt,
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    CustomerId(customer_id): CustomerId,
    ApiJson(req): ApiJson<CreateBookingRequest>,
) -> AppResult<impl IntoResponse> {
    let showtime_id = req.showtime_id;
    let outcome = state
        .services
        .booking
        .create_booking(BookingRequest {
            customer_id,
            movie_id: req.movie_id,
            showtime_id,
            tickets: req.tickets,
            promo_code: req.promo_code,
            card_id: req.card_id,
        })
        .await;

    // После коммита и после проигранной гонки кеш доступности устарел
    if availability_changed(&outcome) {
        state.cache.invalidate_booked_seats(showtime_id).await;
    }
    let receipt = outcome?;

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            success: true,
            receipt,
        }),
    ))
}

fn availability_changed(outcome: &AppResult<BookingReceipt>) -> bool {
    matches!(
        outcome,
        Ok(_) | Err(AppError::Conflict(Conflict::SeatsTaken { .. }))
    )
}

// GET /api/booking/{booking_id}
async fn get_booking(
    State(state): State<Arc<AppState>>,
    CustomerId(customer_id): CustomerId,
    Path(booking_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    // Кривой id ничем не отличается от чужой брони
    let booking_id = Uuid::parse_str(booking_id.trim())
        .map_err(|_| AppError::NotFound(format!("booking {}", booking_id)))?;

    let booking = state
        .services
        .booking
        .booking_by_id(booking_id, &customer_id)
        .await?;

    Ok(Json(json!({ "success": true, "booking": booking })))
}

// GET /api/orders
async fn list_orders(
    State(state): State<Arc<AppState>>,
    CustomerId(customer_id): CustomerId,
) -> AppResult<impl IntoResponse> {
    let bookings = state.services.orders.list_bookings(&customer_id).await?;
    Ok(Json(json!({
        "success": true,
        "count": bookings.len(),
        "bookings": bookings,
    })))
}

/* ---------- SEATS ---------- */

// GET /api/booking/availability/{showtime_id}
async fn availability(
    State(state): State<Arc<AppState>>,
    Path(showtime_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let booked = state
        .cache
        .booked_seats(&state.services.booking, showtime_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "showtimeId": showtime_id,
        "bookedSeats": booked,
    })))
}

// GET /api/booking/seats/{showtime_id}
async fn seat_layout(
    State(state): State<Arc<AppState>>,
    Path(showtime_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let showtime = state.services.scheduler.showtime(showtime_id).await?;
    let showroom = state.services.scheduler.showroom(showtime.showroom_id).await?;
    let booked = state
        .cache
        .booked_seats(&state.services.booking, showtime_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "showtime": showtime,
        "showroom": showroom,
        "bookedSeats": booked,
    })))
}
