pub mod booking;
pub mod notifier;
pub mod orders;
pub mod pricing;
pub mod promotions;
pub mod scheduler;

use std::sync::Arc;
use std::time::Duration;

pub use booking::{BookingEngine, BookingReceipt, BookingRequest};
pub use notifier::{LogNotifier, Notifier, WebhookNotifier};
pub use orders::OrderHistory;
pub use pricing::{PricingResolver, Quote};
pub use promotions::PromotionService;
pub use scheduler::ShowtimeScheduler;

use crate::store::{BookingStore, CardDirectory, PromotionStore, ScheduleStore};

/// Все сервисы ядра поверх одного хранилища.
#[derive(Clone)]
pub struct Services {
    pub scheduler: ShowtimeScheduler,
    pub pricing: PricingResolver,
    pub booking: BookingEngine,
    pub orders: OrderHistory,
    pub promotions: PromotionService,
}

impl Services {
    pub fn new<S>(store: Arc<S>, notifier: Arc<dyn Notifier>, tx_timeout: Duration) -> Self
    where
        S: ScheduleStore + BookingStore + PromotionStore + CardDirectory + 'static,
    {
        let pricing = PricingResolver::new(store.clone());
        let booking = BookingEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            pricing.clone(),
            notifier,
            tx_timeout,
        );

        Self {
            scheduler: ShowtimeScheduler::new(store.clone()),
            pricing,
            booking,
            orders: OrderHistory::new(store.clone()),
            promotions: PromotionService::new(store),
        }
    }
}
