use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Тип билета. Неизвестные и пустые значения считаются взрослым билетом.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
pub enum TicketType {
    Adult,
    Senior,
    Child,
}

impl TicketType {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "senior" => TicketType::Senior,
            "child" => TicketType::Child,
            _ => TicketType::Adult,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketType::Adult => "adult",
            TicketType::Senior => "senior",
            TicketType::Child => "child",
        }
    }
}

impl From<String> for TicketType {
    fn from(tag: String) -> Self {
        TicketType::from_tag(&tag)
    }
}

impl From<Option<String>> for TicketType {
    fn from(tag: Option<String>) -> Self {
        tag.as_deref().map(TicketType::from_tag).unwrap_or(TicketType::Adult)
    }
}

/// Выбор одного места в запросе на покупку.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSelection {
    pub seat_id: String,
    #[serde(rename = "type", default = "default_ticket_type")]
    pub ticket_type: TicketType,
}

fn default_ticket_type() -> TicketType {
    TicketType::Adult
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub showtime_id: i64,
    pub seat_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(rename = "type")]
    #[sqlx(try_from = "String")]
    pub ticket_type: TicketType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_or_missing_tags_fall_back_to_adult() {
        assert_eq!(TicketType::from_tag("senior"), TicketType::Senior);
        assert_eq!(TicketType::from_tag(" Child "), TicketType::Child);
        assert_eq!(TicketType::from_tag("student"), TicketType::Adult);
        assert_eq!(TicketType::from(None), TicketType::Adult);
    }

    #[test]
    fn selection_deserializes_with_lenient_type() {
        let sel: TicketSelection =
            serde_json::from_str(r#"{"seatId":"B4","type":"vip"}"#).unwrap();
        assert_eq!(sel.seat_id, "B4");
        assert_eq!(sel.ticket_type, TicketType::Adult);

        let sel: TicketSelection = serde_json::from_str(r#"{"seatId":"B5"}"#).unwrap();
        assert_eq!(sel.ticket_type, TicketType::Adult);

        let sel: TicketSelection =
            serde_json::from_str(r#"{"seatId":"B6","type":"child"}"#).unwrap();
        assert_eq!(sel.ticket_type, TicketType::Child);
    }
}
