use crate::error::AppError;

// Не больше трёх букв в метке ряда: до ZZZ, то есть 18 278 рядов
const MAX_ROW_LETTERS: usize = 3;

/// Разобранная метка места вида `A7`: буквы ряда + номер места.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatLabel {
    pub row_label: String,
    pub seat_number: i32,
}

impl SeatLabel {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let raw = raw.trim();
        let split = raw
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(raw.len());
        let (row, number) = raw.split_at(split);

        if row.is_empty() || row.len() > MAX_ROW_LETTERS || number.is_empty() {
            return Err(AppError::invalid(format!("malformed seat id '{}'", raw)));
        }
        let seat_number: i32 = number
            .parse()
            .map_err(|_| AppError::invalid(format!("malformed seat id '{}'", raw)))?;
        if seat_number <= 0 {
            return Err(AppError::invalid(format!("malformed seat id '{}'", raw)));
        }

        Ok(SeatLabel {
            row_label: row.to_ascii_uppercase(),
            seat_number,
        })
    }

    /// Номер ряда с единицы: A=1, Z=26, AA=27.
    pub fn row_index(&self) -> i64 {
        self.row_label
            .bytes()
            .fold(0i64, |acc, b| acc * 26 + i64::from(b - b'A' + 1))
    }

    pub fn seat_id(&self) -> String {
        format!("{}{}", self.row_label, self.seat_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_row_letters_and_number() {
        let label = SeatLabel::parse("c12").unwrap();
        assert_eq!(label.row_label, "C");
        assert_eq!(label.seat_number, 12);
        assert_eq!(label.row_index(), 3);
        assert_eq!(label.seat_id(), "C12");
    }

    #[test]
    fn multi_letter_rows_continue_after_z() {
        assert_eq!(SeatLabel::parse("Z1").unwrap().row_index(), 26);
        assert_eq!(SeatLabel::parse("AA1").unwrap().row_index(), 27);
        assert_eq!(SeatLabel::parse("ZZZ1").unwrap().row_index(), 18_278);
    }

    #[test]
    fn rejects_malformed_labels() {
        for raw in ["", "A", "12", "A0", "A-1", "A1B", "AAAA1", "AAAAAAAAAAAAAAAA1"] {
            assert!(SeatLabel::parse(raw).is_err(), "{raw} should be rejected");
        }
    }
}
