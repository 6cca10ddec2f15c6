use std::sync::Arc;

use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::BookingView;
use crate::store::BookingStore;

/// История заказов покупателя. Фильтр по владельцу стоит в самом запросе.
#[derive(Clone)]
pub struct OrderHistory {
    bookings: Arc<dyn BookingStore>,
}

impl OrderHistory {
    pub fn new(bookings: Arc<dyn BookingStore>) -> Self {
        Self { bookings }
    }

    pub async fn list_bookings(&self, customer_id: &str) -> AppResult<Vec<BookingView>> {
        if customer_id.trim().is_empty() {
            return Err(AppError::invalid("customer id is required"));
        }
        let bookings = self.bookings.bookings_for_customer(customer_id).await?;
        debug!("Customer {} has {} bookings", customer_id, bookings.len());
        Ok(bookings)
    }
}
