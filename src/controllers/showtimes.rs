use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, NaiveTime};
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{AdminUser, ApiJson};
use crate::models::ShowtimeView;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/showtimes", post(add_showtime))
        .route("/admin/showtimes/{movie_id}", get(admin_showtimes))
        .route("/admin/showrooms", get(list_showrooms))
        .route("/showtimes/{movie_id}", get(public_showtimes))
}

/* ---------- helpers ---------- */

fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::invalid(format!("showDate {} must be YYYY-MM-DD", raw)))
}

// Принимаем и HH:MM, и HH:MM:SS
fn parse_time(raw: &str) -> AppResult<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| AppError::invalid(format!("showTime {} must be HH:MM", raw)))
}

async fn collect_showtimes(state: &AppState, movie_id: i64) -> AppResult<Vec<ShowtimeView>> {
    state
        .services
        .scheduler
        .showtimes_by_movie(movie_id)
        .try_collect()
        .await
}

/* ---------- ADMIN ---------- */

// POST /api/admin/showtimes
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateShowtimeRequest {
    #[validate(range(min = 1, message = "movieId must be > 0"))]
    movie_id: i64,
    #[validate(range(min = 1, message = "showroomId must be > 0"))]
    showroom_id: i64,
    #[validate(length(min = 1, message = "showDate is required"))]
    show_date: String,
    #[validate(length(min = 1, message = "showTime is required"))]
    show_time: String,
}

async fn add_showtime(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<CreateShowtimeRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;
    let show_date = parse_date(&req.show_date)?;
    let show_time = parse_time(&req.show_time)?;

    let showtime_id = state
        .services
        .scheduler
        .add_showtime(req.movie_id, req.showroom_id, show_date, show_time)
        .await?;
    tracing::debug!("Showtime {} scheduled by {}", showtime_id, admin);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "showtimeId": showtime_id })),
    ))
}

// GET /api/admin/showtimes/{movie_id}
async fn admin_showtimes(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(movie_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let showtimes = collect_showtimes(&state, movie_id).await?;
    Ok(Json(json!({ "success": true, "showtimes": showtimes })))
}

// GET /api/admin/showrooms
async fn list_showrooms(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    let showrooms = state.services.scheduler.all_showrooms().await?;
    Ok(Json(json!({ "success": true, "showrooms": showrooms })))
}

/* ---------- PUBLIC ---------- */

// GET /api/showtimes/{movie_id}
async fn public_showtimes(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let showtimes = collect_showtimes(&state, movie_id).await?;
    Ok(Json(json!({
        "success": true,
        "movieId": movie_id,
        "showtimes": showtimes,
    })))
}
