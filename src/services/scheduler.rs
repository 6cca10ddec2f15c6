use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use futures::stream::BoxStream;
use tracing::{info, warn};

use crate::error::{AppError, AppResult, Conflict};
use crate::models::{NewShowtime, Showroom, ShowtimeView};
use crate::store::ScheduleStore;

/// Расписание сеансов. Слот зала уникален на уровне хранилища;
/// `check_conflict` нужен только для быстрой и понятной ошибки.
#[derive(Clone)]
pub struct ShowtimeScheduler {
    store: Arc<dyn ScheduleStore>,
}

impl ShowtimeScheduler {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self { store }
    }

    pub async fn check_conflict(
        &self,
        showroom_id: i64,
        show_date: NaiveDate,
        show_time: NaiveTime,
    ) -> AppResult<bool> {
        let taken = self.store.slot_taken(showroom_id, show_date, show_time).await?;
        if taken {
            info!(
                "Conflict detected: showroom {} is already booked on {} at {}",
                showroom_id, show_date, show_time
            );
        }
        Ok(taken)
    }

    pub async fn add_showtime(
        &self,
        movie_id: i64,
        showroom_id: i64,
        show_date: NaiveDate,
        show_time: NaiveTime,
    ) -> AppResult<i64> {
        if movie_id <= 0 || showroom_id <= 0 {
            return Err(AppError::invalid("movieId and showroomId must be > 0"));
        }

        let conflict = || {
            AppError::Conflict(Conflict::ShowtimeTaken {
                showroom_id,
                show_date,
                show_time,
            })
        };

        if self.check_conflict(showroom_id, show_date, show_time).await? {
            return Err(conflict());
        }

        let new = NewShowtime {
            movie_id,
            showroom_id,
            show_date,
            show_time,
        };
        match self.store.insert_showtime(&new).await? {
            Some(id) => {
                info!(
                    "Showtime {} added: movie {} in showroom {} on {} at {}",
                    id, movie_id, showroom_id, show_date, show_time
                );
                Ok(id)
            }
            None => {
                // Проиграли гонку: слот заняли между проверкой и вставкой
                warn!(
                    "Showtime slot for showroom {} on {} at {} taken concurrently",
                    showroom_id, show_date, show_time
                );
                Err(conflict())
            }
        }
    }

    pub fn showtimes_by_movie(&self, movie_id: i64) -> BoxStream<'_, AppResult<ShowtimeView>> {
        self.store.showtimes_by_movie(movie_id)
    }

    pub async fn showtime(&self, showtime_id: i64) -> AppResult<ShowtimeView> {
        self.store
            .find_showtime(showtime_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("showtime {}", showtime_id)))
    }

    pub async fn showroom(&self, showroom_id: i64) -> AppResult<Showroom> {
        self.store
            .find_showroom(showroom_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("showroom {}", showroom_id)))
    }

    pub async fn all_showrooms(&self) -> AppResult<Vec<Showroom>> {
        self.store.showrooms().await
    }
}
