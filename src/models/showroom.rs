use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::seat::SeatLabel;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Showroom {
    pub id: i64,
    pub name: String,
    pub seat_count: i32,
    pub num_rows: i32,
    pub num_cols: i32,
    pub theatre_id: String,
}

impl Showroom {
    // Место должно попадать в сетку зала
    pub fn contains(&self, seat: &SeatLabel) -> bool {
        seat.row_index() <= i64::from(self.num_rows) && seat.seat_number <= self.num_cols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_bounds_are_inclusive() {
        let room = Showroom {
            id: 1,
            name: "Hall 1".into(),
            seat_count: 20,
            num_rows: 4,
            num_cols: 5,
            theatre_id: "main".into(),
        };
        assert!(room.contains(&SeatLabel::parse("D5").unwrap()));
        assert!(!room.contains(&SeatLabel::parse("E1").unwrap()));
        assert!(!room.contains(&SeatLabel::parse("A6").unwrap()));
    }
}
