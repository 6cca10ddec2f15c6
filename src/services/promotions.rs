use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::error::{AppError, AppResult, Conflict};
use crate::models::{NewPromotion, Promotion};
use crate::store::PromotionStore;

/// Администрирование промокодов. Проверка при покупке живёт в `PricingResolver`.
#[derive(Clone)]
pub struct PromotionService {
    store: Arc<dyn PromotionStore>,
}

impl PromotionService {
    pub fn new(store: Arc<dyn PromotionStore>) -> Self {
        Self { store }
    }

    pub async fn create_promotion(
        &self,
        code: &str,
        discount_percent: i32,
        valid_from: NaiveDate,
        valid_to: NaiveDate,
    ) -> AppResult<i64> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::invalid("promotion code is required"));
        }
        if !(1..=100).contains(&discount_percent) {
            return Err(AppError::invalid("discount percent must be between 1 and 100"));
        }
        if valid_from > valid_to {
            return Err(AppError::invalid("validFrom must not be after validTo"));
        }

        let new = NewPromotion {
            code: code.to_string(),
            discount_percent,
            valid_from,
            valid_to,
        };
        let id = self
            .store
            .insert_promotion(&new)
            .await?
            .ok_or_else(|| AppError::Conflict(Conflict::PromotionCode(new.code.clone())))?;

        info!(
            "Promotion {} created: {}% from {} to {}",
            new.code, discount_percent, valid_from, valid_to
        );
        Ok(id)
    }

    pub async fn all_promotions(&self) -> AppResult<Vec<Promotion>> {
        self.store.promotions().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn duplicate_codes_conflict() {
        let service = PromotionService::new(Arc::new(MemoryStore::new()));
        service
            .create_promotion("SPRING", 15, date(2025, 3, 1), date(2025, 5, 31))
            .await
            .unwrap();

        let err = service
            .create_promotion(" SPRING ", 30, date(2025, 3, 1), date(2025, 5, 31))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(Conflict::PromotionCode(_))));
        assert_eq!(service.all_promotions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejects_bad_percent_and_inverted_window() {
        let service = PromotionService::new(Arc::new(MemoryStore::new()));
        for percent in [0, 101] {
            let err = service
                .create_promotion("X", percent, date(2025, 1, 1), date(2025, 1, 2))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidRequest(_)));
        }
        let err = service
            .create_promotion("X", 10, date(2025, 1, 2), date(2025, 1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn lists_newest_window_first() {
        let service = PromotionService::new(Arc::new(MemoryStore::new()));
        service
            .create_promotion("WINTER", 10, date(2025, 1, 1), date(2025, 2, 1))
            .await
            .unwrap();
        service
            .create_promotion("SUMMER", 10, date(2025, 6, 1), date(2025, 8, 1))
            .await
            .unwrap();

        let codes: Vec<String> = service
            .all_promotions()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.code)
            .collect();
        assert_eq!(codes, vec!["SUMMER", "WINTER"]);
    }
}
