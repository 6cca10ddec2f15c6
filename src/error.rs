use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use thiserror::Error;

/// Какой инвариант уникальности нарушен.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// Зал уже занят в этот слот.
    ShowtimeTaken {
        showroom_id: i64,
        show_date: NaiveDate,
        show_time: NaiveTime,
    },
    /// Места уже проданы на этот сеанс. Список может быть пустым,
    /// если конфликт обнаружен только при коммите.
    SeatsTaken { seats: Vec<String> },
    /// Промокод с таким кодом уже существует.
    PromotionCode(String),
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Conflict::ShowtimeTaken { showroom_id, show_date, show_time } => write!(
                f,
                "showroom {} is already booked on {} at {}",
                showroom_id, show_date, show_time
            ),
            Conflict::SeatsTaken { seats } if seats.is_empty() => {
                write!(f, "seats are no longer available")
            }
            Conflict::SeatsTaken { seats } => {
                write!(f, "seats already booked: {}", seats.join(", "))
            }
            Conflict::PromotionCode(code) => write!(f, "promotion code {} already exists", code),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid promotion: {0}")]
    InvalidPromotion(String),

    #[error("conflict: {0}")]
    Conflict(Conflict),

    #[error("{0} not found")]
    NotFound(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("access denied")]
    Forbidden,

    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("operation timed out")]
    Timeout,
}

impl AppError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::InvalidRequest(msg.into())
    }

    pub fn seats_taken(seats: Vec<String>) -> Self {
        AppError::Conflict(Conflict::SeatsTaken { seats })
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidPromotion(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::InvalidRequest(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Детали ошибок БД наружу не отдаём
        let message = match &self {
            AppError::Storage(e) => {
                tracing::error!("storage error: {:?}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = match &self {
            AppError::Conflict(Conflict::SeatsTaken { seats }) => json!({
                "success": false,
                "message": message,
                "seatsTaken": seats,
            }),
            _ => json!({ "success": false, "message": message }),
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_conflicts_are_distinguished_from_storage_failures() {
        let taken = AppError::seats_taken(vec!["A1".into(), "A2".into()]);
        assert_eq!(taken.status(), StatusCode::CONFLICT);
        assert_eq!(taken.to_string(), "conflict: seats already booked: A1, A2");

        let storage = AppError::Storage(sqlx::Error::PoolTimedOut);
        assert_eq!(storage.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn commit_time_conflict_without_seat_list_still_reads_well() {
        let taken = AppError::seats_taken(Vec::new());
        assert_eq!(taken.to_string(), "conflict: seats are no longer available");
    }
}
