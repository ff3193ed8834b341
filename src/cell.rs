//! Spreadsheet cell model.
//!
//! A workbook is read once into a [`Worksheet`]: the cells of its first sheet,
//! keyed by position, each carrying its typed raw value and the display text a
//! spreadsheet application would render for it. Nothing is mutated after load.

use anyhow::{Context, Result};
use calamine::{Data, ExcelDateTime, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

/// The canonical "no value" string.
pub const MISSING: &str = "N/A";

/// First serial past 9999-12-31 in the 1900 date system.
const MAX_DATE_SERIAL: f64 = 2_958_466.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

// ─── Cell references ─────────────────────────────────────────────────────────

/// Zero-based (row, column) position of a cell, written `B7` style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse an A1-style reference (`"F2"`, `"AB12"`, `"$C$3"`).
    /// Returns `None` for anything that is not letters followed by a row number.
    pub fn parse(reference: &str) -> Option<Self> {
        let cleaned = reference.trim().replace('$', "");
        let split = cleaned.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = cleaned.split_at(split);
        if letters.is_empty()
            || letters.len() > 3
            || !letters.chars().all(|c| c.is_ascii_alphabetic())
        {
            return None;
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let mut col: u32 = 0;
        for ch in letters.chars() {
            col = col * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        }
        let row: u32 = digits.parse().ok()?;
        if row == 0 {
            return None;
        }
        Some(Self::new(row - 1, col - 1))
    }
}

impl FromStr for CellRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).with_context(|| format!("Invalid cell reference '{}'", s))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", col_letter(self.col), self.row + 1)
    }
}

fn col_letter(idx: u32) -> String {
    let mut result = String::new();
    let mut n = idx;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

// ─── Cell values ─────────────────────────────────────────────────────────────

/// Raw content of a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

/// One cell: its raw value plus the text a spreadsheet application shows for it.
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadsheetCell {
    pub raw: CellValue,
    pub display: String,
}

impl SpreadsheetCell {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            display: value.clone(),
            raw: CellValue::Text(value),
        }
    }

    pub fn number(value: f64) -> Self {
        Self {
            raw: CellValue::Number(value),
            display: general_number(value),
        }
    }

    pub fn date(value: NaiveDateTime) -> Self {
        Self {
            raw: CellValue::Date(value),
            display: short_date(value),
        }
    }

    /// Override the rendered text, e.g. for a number shown with a custom format.
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }

    /// A cell whose raw value counts as "nothing there".
    pub fn is_blank(&self) -> bool {
        match &self.raw {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) | CellValue::Date(_) => false,
        }
    }

    /// Convert a parsed workbook value. Empty cells yield `None`.
    fn from_data(data: &Data) -> Option<Self> {
        let cell = match data {
            Data::Empty => return None,
            Data::String(s) => Self::text(s.clone()),
            Data::Float(f) => Self::number(*f),
            Data::Int(i) => Self::number(*i as f64),
            Data::Bool(b) => Self::text(if *b { "TRUE" } else { "FALSE" }),
            Data::DateTime(dt) => Self::from_excel_datetime(dt),
            Data::DateTimeIso(s) => parse_iso_datetime(s)
                .map(Self::date)
                .unwrap_or_else(|| Self::text(s.clone())),
            Data::DurationIso(s) => Self::text(s.clone()),
            Data::Error(e) => Self::text(e.to_string()),
        };
        Some(cell)
    }

    /// A date-formatted numeric cell, decoded in the workbook's own date
    /// system. Durations, times of day and serials that name no real calendar
    /// day keep their numeric raw value.
    fn from_excel_datetime(value: &ExcelDateTime) -> Self {
        let serial = value.as_f64();
        if value.is_duration() {
            return Self::number(serial).with_display(elapsed_time(serial));
        }
        if (0.0..1.0).contains(&serial) {
            let secs = (serial * SECONDS_PER_DAY).round() as u32;
            let display = NaiveTime::from_num_seconds_from_midnight_opt(secs % 86_400, 0)
                .map(|t| t.format("%-H:%M").to_string())
                .unwrap_or_else(|| general_number(serial));
            return Self::number(serial).with_display(display);
        }
        if !serial.is_finite() || serial < 0.0 || serial >= MAX_DATE_SERIAL {
            return Self::number(serial);
        }

        let (year, month, day, ..) = value.to_ymd_hms_milli();
        let seconds = ((serial - serial.floor()) * SECONDS_PER_DAY).round() as i64;
        let decoded = NaiveDate::from_ymd_opt(year.into(), month.into(), day.into())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .and_then(|dt| dt.checked_add_signed(Duration::seconds(seconds)));
        match decoded {
            Some(dt) => Self::date(dt),
            // 1900-02-29
            None => Self::number(serial).with_display(format!(
                "{}/{}/{:02}",
                month,
                day,
                year % 100
            )),
        }
    }
}

/// Render a number the way the General format does in a standard-width
/// column: at most 11 characters (12 with a minus sign), switching to
/// `1.23457E+15` style when the digits do not fit.
pub fn general_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let width = if value < 0.0 { 12 } else { 11 };
    let magnitude = value.abs().log10().floor() as i32;
    match magnitude {
        -4..=-1 => strip_decimal(&format!("{:.9}", value)),
        -9..=9 => {
            let fixed = strip_decimal(&format!("{:.12}", value));
            if fixed.len() <= width {
                return fixed;
            }
            let decimals = (9 - magnitude).max(0) as usize;
            let rounded = strip_decimal(&format!("{:.*}", decimals, value));
            if rounded.len() <= width {
                rounded
            } else {
                exponential(value)
            }
        }
        10 => format!("{}", value.trunc() as i64),
        _ => exponential(value),
    }
}

fn exponential(value: f64) -> String {
    let formatted = format!("{:.5e}", value);
    let (mantissa, exponent) = formatted.split_once('e').unwrap_or((formatted.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{}E{}{:02}", strip_decimal(mantissa), sign, exponent.abs())
}

fn strip_decimal(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

/// `[h]:mm:ss`, hours not wrapped at a day.
fn elapsed_time(days: f64) -> String {
    let total = (days.abs() * SECONDS_PER_DAY).round() as i64;
    let sign = if days < 0.0 && total > 0 { "-" } else { "" };
    format!(
        "{}{}:{:02}:{:02}",
        sign,
        total / 3600,
        total / 60 % 60,
        total % 60
    )
}

/// `m/d/yy`, plus ` h:mm` when the value carries a time of day.
fn short_date(value: NaiveDateTime) -> String {
    if value.time().num_seconds_from_midnight() == 0 {
        value.format("%-m/%-d/%y").to_string()
    } else {
        value.format("%-m/%-d/%y %-H:%M").to_string()
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Decode a serial number in the 1900 date system.
///
/// Serial 1 is 1900-01-01. The system counts a 1900-02-29 that never existed
/// (serial 60), so serials from 61 on are one day behind a plain day count;
/// serial 60 itself has no calendar date and yields `None`, as does anything
/// negative, non-finite, or past year 9999. Serial 0 decodes to 1899-12-31.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial >= MAX_DATE_SERIAL {
        return None;
    }
    let days = serial.floor() as i64;
    if days == 60 {
        return None;
    }
    let epoch = if days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let seconds = ((serial - serial.floor()) * SECONDS_PER_DAY).round() as i64;
    let date = epoch.checked_add_signed(Duration::days(days))?;
    date.and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::seconds(seconds))
}

// ─── Worksheet ───────────────────────────────────────────────────────────────

/// The cells of one sheet.
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    name: String,
    cells: HashMap<CellRef, SpreadsheetCell>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: HashMap::new(),
        }
    }

    /// Parse a workbook (`.xlsx`, `.xls`, ...) and keep only its first sheet.
    pub fn from_workbook_bytes(bytes: &[u8]) -> Result<Self> {
        let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
            .context("Failed to read workbook")?;
        let name = workbook
            .sheet_names()
            .first()
            .cloned()
            .context("Workbook contains no sheets")?;
        let range = workbook
            .worksheet_range(&name)
            .with_context(|| format!("Failed to read sheet '{}'", name))?;

        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut sheet = Self::new(name);
        for (row, col, data) in range.used_cells() {
            if let Some(cell) = SpreadsheetCell::from_data(data) {
                let cell_ref = CellRef::new(start_row + row as u32, start_col + col as u32);
                sheet.insert(cell_ref, cell);
            }
        }
        log::debug!("Loaded sheet '{}' with {} cells", sheet.name, sheet.len());
        Ok(sheet)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn insert(&mut self, cell_ref: CellRef, cell: SpreadsheetCell) {
        self.cells.insert(cell_ref, cell);
    }

    /// Builder-style insert keyed by an A1 reference. A malformed reference
    /// inserts nothing, matching how [`Worksheet::lookup`] treats it.
    pub fn with(mut self, reference: &str, cell: SpreadsheetCell) -> Self {
        match CellRef::parse(reference) {
            Some(cell_ref) => self.insert(cell_ref, cell),
            None => log::warn!("Dropping cell with malformed reference '{}'", reference),
        }
        self
    }

    pub fn cell(&self, cell_ref: CellRef) -> Option<&SpreadsheetCell> {
        self.cells.get(&cell_ref)
    }

    /// Look up a cell by A1 reference; malformed references find nothing.
    pub fn lookup(&self, reference: &str) -> Option<&SpreadsheetCell> {
        match CellRef::parse(reference) {
            Some(cell_ref) => self.cell(cell_ref),
            None => {
                log::debug!("Ignoring malformed cell reference '{}'", reference);
                None
            }
        }
    }

    /// Trimmed display text of a cell, or [`MISSING`] when the cell is absent,
    /// blank, or renders as nothing.
    pub fn get_cell(&self, reference: &str) -> String {
        match self.lookup(reference) {
            Some(cell) if !cell.is_blank() => {
                let text = cell.display.trim();
                if text.is_empty() {
                    MISSING.to_string()
                } else {
                    text.to_string()
                }
            }
            _ => MISSING.to_string(),
        }
    }
}
