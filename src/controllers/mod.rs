pub mod bookings;
pub mod promotions;
pub mod showtimes;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(bookings::routes())
        .merge(showtimes::routes())
        .merge(promotions::routes())
}
