//! Display formatting for amounts and dates.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

/// Prefix the amount with the currency symbol.
///
/// No rounding or locale formatting; callers pre-round where needed.
pub fn format_currency(amount: Decimal) -> String {
    format!("${}", amount)
}

/// Render a date as `YYYY/M/D`, month and day not zero-padded.
pub fn format_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.year(), date.month(), date.day())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn currency_keeps_numeric_text_unchanged() {
        assert_eq!(format_currency(Decimal::from_str("19.99").unwrap()), "$19.99");
        assert_eq!(format_currency(Decimal::from(0)), "$0");
        assert_eq!(format_currency(Decimal::from_str("5").unwrap()), "$5");
    }

    #[test]
    fn date_has_no_zero_padding() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(format_date(date), "2024/3/5");

        let date = NaiveDate::from_ymd_opt(2024, 11, 25).unwrap();
        assert_eq!(format_date(date), "2024/11/25");
    }
}
