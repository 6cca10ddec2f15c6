use std::collections::BTreeSet;

use redis::AsyncCommands;
use tracing::{debug, info};

use crate::cache::CacheService;
use crate::error::AppResult;
use crate::services::BookingEngine;

fn booked_key(showtime_id: i64) -> String {
    format!("booked:{}", showtime_id)
}

impl CacheService {
    /// Занятые места для UI: сначала кеш, при промахе БД.
    /// Кеш только подсказка, при бронировании он не используется.
    pub async fn booked_seats(
        &self,
        engine: &BookingEngine,
        showtime_id: i64,
    ) -> AppResult<BTreeSet<String>> {
        if let Some(seats) = self.get_booked_seats(showtime_id).await {
            return Ok(seats);
        }

        let seats = engine.booked_seats(showtime_id).await?;
        self.save_booked_seats(showtime_id, &seats).await;
        Ok(seats)
    }

    // Инвалидировать после каждой подтверждённой брони
    pub async fn invalidate_booked_seats(&self, showtime_id: i64) {
        let mut conn = self.redis.conn.clone();
        let _: Result<(), _> = conn.del(booked_key(showtime_id)).await;
        info!("Invalidated booked seats cache for showtime {}", showtime_id);
    }

    async fn get_booked_seats(&self, showtime_id: i64) -> Option<BTreeSet<String>> {
        let mut conn = self.redis.conn.clone();
        // Redis недоступен: просто промах
        let data: Option<String> = conn.get(booked_key(showtime_id)).await.ok()?;
        let seats = serde_json::from_str(&data?).ok()?;
        debug!("Booked seats cache hit for showtime {}", showtime_id);
        Some(seats)
    }

    async fn save_booked_seats(&self, showtime_id: i64, seats: &BTreeSet<String>) {
        let Ok(data) = serde_json::to_string(seats) else {
            return;
        };
        let mut conn = self.redis.conn.clone();
        let _: Result<(), _> = conn
            .set_ex(booked_key(showtime_id), data, self.availability_ttl_seconds)
            .await;
    }
}
