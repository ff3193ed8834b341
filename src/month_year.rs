//! Month/year extraction from date-like cells.
//!
//! A cell may hold a real date, a date serial number, or text that starts with
//! `month/day/year`. The first of those that yields a month wins, in that order.

use crate::cell::{serial_to_datetime, CellValue, Worksheet, MISSING};
use anyhow::Result;
use chrono::Datelike;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

const SHORT_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const LONG_MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Output format for a month/year placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonthYearFormat {
    /// `Mar 2024`
    #[default]
    MonYyyy,
    /// `March 2024`
    MonthYyyy,
    /// `03/2024`
    MmYyyy,
}

impl MonthYearFormat {
    pub fn pattern(self) -> &'static str {
        match self {
            Self::MonYyyy => "Mon YYYY",
            Self::MonthYyyy => "MMMM YYYY",
            Self::MmYyyy => "MM/YYYY",
        }
    }

    pub fn parse(pattern: &str) -> Option<Self> {
        match pattern.trim() {
            "Mon YYYY" => Some(Self::MonYyyy),
            "MMMM YYYY" => Some(Self::MonthYyyy),
            "MM/YYYY" => Some(Self::MmYyyy),
            _ => None,
        }
    }

    /// Render a 1-based month and a year. Out-of-range months yield `None`.
    pub fn render(self, month: u32, year: i32) -> Option<String> {
        let idx = month.checked_sub(1).filter(|m| *m < 12)? as usize;
        let rendered = match self {
            Self::MonYyyy => format!("{} {:04}", SHORT_MONTHS[idx], year),
            Self::MonthYyyy => format!("{} {:04}", LONG_MONTHS[idx], year),
            Self::MmYyyy => format!("{:02}/{:04}", month, year),
        };
        Some(rendered)
    }
}

impl FromStr for MonthYearFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown month/year format '{}' (expected Mon YYYY, MMMM YYYY or MM/YYYY)",
                s
            )
        })
    }
}

impl fmt::Display for MonthYearFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pattern())
    }
}

/// Formatted month and year of a cell, or [`MISSING`].
pub fn month_year(sheet: &Worksheet, reference: &str, format: MonthYearFormat) -> String {
    extract_month_year(sheet, reference)
        .and_then(|(month, year)| format.render(month, year))
        .unwrap_or_else(|| MISSING.to_string())
}

/// `(month, year)` of a cell, trying its date value, then its serial number,
/// then its display text.
pub fn extract_month_year(sheet: &Worksheet, reference: &str) -> Option<(u32, i32)> {
    let cell = sheet.lookup(reference)?;
    match &cell.raw {
        CellValue::Date(dt) => return Some((dt.month(), dt.year())),
        CellValue::Number(serial) => {
            if let Some(found) = serial_month_year(*serial) {
                return Some(found);
            }
        }
        CellValue::Text(_) | CellValue::Empty => {}
    }
    parse_date_text(&cell.display)
}

/// Month and year of a 1900-system date serial.
///
/// Serials below 1 sit in "day 0" of January 1900, and serial 60 is the
/// system's 1900-02-29; neither has a real calendar date but both have a month.
fn serial_month_year(serial: f64) -> Option<(u32, i32)> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    match serial.floor() as i64 {
        0 => Some((1, 1900)),
        60 => Some((2, 1900)),
        _ => serial_to_datetime(serial).map(|dt| (dt.month(), dt.year())),
    }
}

/// Parse a leading `m/d/yy` or `m/d/yyyy`, ignoring whatever follows
/// (typically a time of day). Two-digit years are 20xx.
fn parse_date_text(text: &str) -> Option<(u32, i32)> {
    lazy_static::lazy_static! {
        static ref DATE_PREFIX: Regex =
            Regex::new(r"^\s*(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})(?:\D|$)").unwrap();
    }

    let caps = DATE_PREFIX.captures(text)?;
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    let year_digits = &caps[3];
    let mut year: i32 = year_digits.parse().ok()?;
    if year_digits.len() == 2 {
        year += 2000;
    }
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some((month, year))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::SpreadsheetCell;
    use chrono::NaiveDate;

    fn date_cell(y: i32, m: u32, d: u32) -> SpreadsheetCell {
        let dt = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        SpreadsheetCell::date(dt)
    }

    #[test]
    fn test_render_formats() {
        assert_eq!(MonthYearFormat::MonYyyy.render(3, 2024).unwrap(), "Mar 2024");
        assert_eq!(MonthYearFormat::MonthYyyy.render(12, 2023).unwrap(), "December 2023");
        assert_eq!(MonthYearFormat::MmYyyy.render(3, 2024).unwrap(), "03/2024");
        assert_eq!(MonthYearFormat::MmYyyy.render(11, 987).unwrap(), "11/0987");
        assert_eq!(MonthYearFormat::MonYyyy.render(0, 2024), None);
        assert_eq!(MonthYearFormat::MonYyyy.render(13, 2024), None);
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(MonthYearFormat::parse("Mon YYYY"), Some(MonthYearFormat::MonYyyy));
        assert_eq!(MonthYearFormat::parse("MMMM YYYY"), Some(MonthYearFormat::MonthYyyy));
        assert_eq!(MonthYearFormat::parse(" MM/YYYY "), Some(MonthYearFormat::MmYyyy));
        assert_eq!(MonthYearFormat::parse("YYYY-MM"), None);
        assert!("bogus".parse::<MonthYearFormat>().is_err());
        assert_eq!(MonthYearFormat::default(), MonthYearFormat::MonYyyy);
    }

    #[test]
    fn test_native_date_wins_over_display_text() {
        let sheet =
            Worksheet::new("Sheet1").with("A1", date_cell(2024, 3, 15).with_display("7/1/19"));
        assert_eq!(month_year(&sheet, "A1", MonthYearFormat::MmYyyy), "03/2024");
    }

    #[test]
    fn test_serial_number() {
        let sheet = Worksheet::new("Sheet1")
            .with("A1", SpreadsheetCell::number(45355.0))
            .with("A2", SpreadsheetCell::number(60.0))
            .with("A3", SpreadsheetCell::number(0.5))
            .with("A4", SpreadsheetCell::number(45322.75));
        assert_eq!(month_year(&sheet, "A1", MonthYearFormat::MonthYyyy), "March 2024");
        assert_eq!(month_year(&sheet, "A2", MonthYearFormat::MonYyyy), "Feb 1900");
        assert_eq!(month_year(&sheet, "A3", MonthYearFormat::MonYyyy), "Jan 1900");
        assert_eq!(month_year(&sheet, "A4", MonthYearFormat::MonYyyy), "Jan 2024");
    }

    #[test]
    fn test_unusable_serial_falls_back_to_display_text() {
        let sheet = Worksheet::new("Sheet1")
            .with("A1", SpreadsheetCell::number(-3.0).with_display("6/30/2022"))
            .with("A2", SpreadsheetCell::number(-3.0));
        assert_eq!(month_year(&sheet, "A1", MonthYearFormat::MonYyyy), "Jun 2022");
        assert_eq!(month_year(&sheet, "A2", MonthYearFormat::MonYyyy), MISSING);
    }

    #[test]
    fn test_text_with_time_of_day() {
        let sheet = Worksheet::new("Sheet1").with("A1", SpreadsheetCell::text("3/4/24 10:00:00"));
        assert_eq!(month_year(&sheet, "A1", MonthYearFormat::MonYyyy), "Mar 2024");
    }

    #[test]
    fn test_parse_date_text() {
        assert_eq!(parse_date_text("3/4/24"), Some((3, 2024)));
        assert_eq!(parse_date_text("12/31/1999"), Some((12, 1999)));
        assert_eq!(parse_date_text("  01/02/2030 8:00 AM"), Some((1, 2030)));
        assert_eq!(parse_date_text("3/4/202"), None);
        assert_eq!(parse_date_text("13/4/2024"), None);
        assert_eq!(parse_date_text("3/0/2024"), None);
        assert_eq!(parse_date_text("2024-03-04"), None);
        assert_eq!(parse_date_text("Due 3/4/24"), None);
        assert_eq!(parse_date_text(""), None);
    }

    #[test]
    fn test_missing_cells() {
        let sheet = Worksheet::new("Sheet1").with("A1", SpreadsheetCell::text("TBD"));
        assert_eq!(month_year(&sheet, "A1", MonthYearFormat::MonYyyy), MISSING);
        assert_eq!(month_year(&sheet, "Z99", MonthYearFormat::MmYyyy), MISSING);
    }
}
