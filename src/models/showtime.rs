use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Showtime {
    pub id: i64,
    pub movie_id: i64,
    pub showroom_id: i64,
    pub show_date: NaiveDate,
    pub show_time: NaiveTime,
}

/// Сеанс вместе с данными зала для отображения.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowtimeView {
    pub id: i64,
    pub movie_id: i64,
    pub showroom_id: i64,
    pub show_date: NaiveDate,
    pub show_time: NaiveTime,
    pub showroom_name: String,
    pub seat_count: i32,
}

#[derive(Debug, Clone)]
pub struct NewShowtime {
    pub movie_id: i64,
    pub showroom_id: i64,
    pub show_date: NaiveDate,
    pub show_time: NaiveTime,
}
