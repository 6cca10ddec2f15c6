use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: i64,
    pub code: String,
    pub discount_percent: i32,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
}

impl Promotion {
    /// Окно действия включает обе границы.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.valid_from <= date && date <= self.valid_to
    }
}

#[derive(Debug, Clone)]
pub struct NewPromotion {
    pub code: String,
    pub discount_percent: i32,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn window_is_inclusive_on_both_ends() {
        let promo = Promotion {
            id: 1,
            code: "SAVE20".into(),
            discount_percent: 20,
            valid_from: date("2025-03-01"),
            valid_to: date("2025-03-31"),
        };
        assert!(promo.is_active_on(date("2025-03-01")));
        assert!(promo.is_active_on(date("2025-03-31")));
        assert!(!promo.is_active_on(date("2025-02-28")));
        assert!(!promo.is_active_on(date("2025-04-01")));
    }
}
