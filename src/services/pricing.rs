//! Расчёт стоимости билетов и применение промокодов.
//!
//! `price_tickets` единственное место, где считаются деньги: им пользуются
//! и предварительный расчёт (`/booking/quote`), и оформление брони.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{Promotion, TicketType};
use crate::store::PromotionStore;

pub fn unit_price(ticket_type: TicketType) -> Decimal {
    match ticket_type {
        TicketType::Adult => Decimal::new(1200, 2),
        TicketType::Senior => Decimal::new(1000, 2),
        TicketType::Child => Decimal::new(800, 2),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(rename = "discount", with = "rust_decimal::serde::float")]
    pub discount_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(rename = "promoId", skip_serializing_if = "Option::is_none")]
    pub applied_promo_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RateTable {
    #[serde(with = "rust_decimal::serde::float")]
    pub adult: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub senior: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub child: Decimal,
}

pub fn rate_table() -> RateTable {
    RateTable {
        adult: unit_price(TicketType::Adult),
        senior: unit_price(TicketType::Senior),
        child: unit_price(TicketType::Child),
    }
}

/// Чистая функция: промокод уже проверен вызывающей стороной.
pub fn price_tickets(ticket_types: &[TicketType], promotion: Option<&Promotion>) -> Quote {
    let subtotal: Decimal = ticket_types.iter().copied().map(unit_price).sum();

    let (discount_amount, applied_promo_id) = match promotion {
        Some(promo) => {
            let discount = (subtotal * Decimal::from(promo.discount_percent) / Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            (discount, Some(promo.id))
        }
        None => (Decimal::ZERO, None),
    };

    Quote {
        subtotal,
        discount_amount,
        total: subtotal - discount_amount,
        applied_promo_id,
    }
}

#[derive(Clone)]
pub struct PricingResolver {
    promotions: Arc<dyn PromotionStore>,
}

impl PricingResolver {
    pub fn new(promotions: Arc<dyn PromotionStore>) -> Self {
        Self { promotions }
    }

    pub async fn quote(
        &self,
        ticket_types: &[TicketType],
        promo_code: Option<&str>,
    ) -> AppResult<Quote> {
        self.quote_on(ticket_types, promo_code, Local::now().date_naive())
            .await
    }

    pub async fn quote_on(
        &self,
        ticket_types: &[TicketType],
        promo_code: Option<&str>,
        today: NaiveDate,
    ) -> AppResult<Quote> {
        // Пустой код равносилен отсутствию кода
        let promotion = match promo_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => Some(self.active_promotion(code, today).await?),
            None => None,
        };
        let quote = price_tickets(ticket_types, promotion.as_ref());
        debug!(
            "Quoted {} tickets: subtotal={} discount={} total={}",
            ticket_types.len(),
            quote.subtotal,
            quote.discount_amount,
            quote.total
        );
        Ok(quote)
    }

    async fn active_promotion(&self, code: &str, today: NaiveDate) -> AppResult<Promotion> {
        let promo = self
            .promotions
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::InvalidPromotion(format!("unknown promotion code {}", code)))?;

        if !promo.is_active_on(today) {
            return Err(AppError::InvalidPromotion(format!(
                "promotion {} is not active on {}",
                code, today
            )));
        }
        Ok(promo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPromotion;
    use crate::store::MemoryStore;
    use chrono::Duration;
    use proptest::prelude::*;

    fn promo(percent: i32) -> Promotion {
        Promotion {
            id: 7,
            code: "SAVE".into(),
            discount_percent: percent,
            valid_from: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            valid_to: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
        }
    }

    #[test]
    fn two_adults_and_a_child_without_promo() {
        let q = price_tickets(
            &[TicketType::Adult, TicketType::Adult, TicketType::Child],
            None,
        );
        assert_eq!(q.subtotal, Decimal::new(3200, 2));
        assert_eq!(q.discount_amount, Decimal::ZERO);
        assert_eq!(q.total, Decimal::new(3200, 2));
        assert_eq!(q.applied_promo_id, None);
    }

    #[test]
    fn twenty_percent_promo_discounts_the_subtotal() {
        let q = price_tickets(
            &[TicketType::Adult, TicketType::Adult, TicketType::Child],
            Some(&promo(20)),
        );
        assert_eq!(q.discount_amount, Decimal::new(640, 2));
        assert_eq!(q.total, Decimal::new(2560, 2));
        assert_eq!(q.applied_promo_id, Some(7));
    }

    #[test]
    fn discount_is_rounded_to_cents() {
        // 10.00 * 33% = 3.30; 8.00 * 33% = 2.64; 18.00 * 33% = 5.94
        let q = price_tickets(&[TicketType::Senior, TicketType::Child], Some(&promo(33)));
        assert_eq!(q.discount_amount, Decimal::new(594, 2));
        assert_eq!(q.total, Decimal::new(1206, 2));
    }

    #[test]
    fn quote_serializes_as_numbers() {
        let q = price_tickets(&[TicketType::Adult], Some(&promo(50)));
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["subtotal"], serde_json::json!(12.0));
        assert_eq!(json["discount"], serde_json::json!(6.0));
        assert_eq!(json["total"], serde_json::json!(6.0));
        assert_eq!(json["promoId"], serde_json::json!(7));
    }

    async fn resolver_with(code: &str, from: NaiveDate, to: NaiveDate) -> PricingResolver {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_promotion(&NewPromotion {
                code: code.into(),
                discount_percent: 20,
                valid_from: from,
                valid_to: to,
            })
            .await
            .unwrap();
        PricingResolver::new(store)
    }

    #[tokio::test]
    async fn expired_promotion_is_rejected() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let resolver = resolver_with("OLD", today - Duration::days(30), today - Duration::days(1)).await;

        let err = resolver
            .quote_on(&[TicketType::Adult], Some("OLD"), today)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidPromotion(_)));
    }

    #[tokio::test]
    async fn unknown_code_is_rejected_but_blank_code_is_ignored() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let resolver = resolver_with("SAVE20", today, today).await;

        let err = resolver
            .quote_on(&[TicketType::Adult], Some("NOPE"), today)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidPromotion(_)));

        let q = resolver
            .quote_on(&[TicketType::Adult], Some("  "), today)
            .await
            .unwrap();
        assert_eq!(q.total, Decimal::new(1200, 2));
    }

    #[tokio::test]
    async fn promotion_valid_only_today_applies() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let resolver = resolver_with("TODAY", today, today).await;

        let q = resolver
            .quote_on(
                &[TicketType::Adult, TicketType::Adult, TicketType::Child],
                Some("TODAY"),
                today,
            )
            .await
            .unwrap();
        assert_eq!(q.total, Decimal::new(2560, 2));
        assert_eq!(q.applied_promo_id, Some(1));
    }

    fn ticket_type() -> impl Strategy<Value = TicketType> {
        prop_oneof![
            Just(TicketType::Adult),
            Just(TicketType::Senior),
            Just(TicketType::Child),
        ]
    }

    proptest! {
        #[test]
        fn totals_stay_consistent(
            types in prop::collection::vec(ticket_type(), 0..20),
            percent in 1i32..=100,
        ) {
            let q = price_tickets(&types, Some(&promo(percent)));
            prop_assert_eq!(q.total + q.discount_amount, q.subtotal);
            prop_assert!(q.discount_amount <= q.subtotal);
            prop_assert!(q.total >= Decimal::ZERO);
            prop_assert!(q.total.scale() <= 2);
        }

        #[test]
        fn quote_is_deterministic(types in prop::collection::vec(ticket_type(), 0..20)) {
            prop_assert_eq!(price_tickets(&types, None), price_tickets(&types, None));
        }
    }
}
