//! Placeholder specs and their resolution against a worksheet.

use crate::cell::{Worksheet, MISSING};
use crate::month_year::{month_year, MonthYearFormat};
use std::fmt;

/// How a placeholder token gets its value.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceholderSpec {
    /// Display text of one cell.
    Cell(String),
    /// A fixed string.
    Const(String),
    /// Display texts of several cells, missing ones dropped, joined by `separator`.
    Join { refs: Vec<String>, separator: String },
    /// Month and year of a date-like cell.
    MonthYear {
        reference: String,
        format: MonthYearFormat,
    },
}

impl PlaceholderSpec {
    pub fn cell(reference: &str) -> Self {
        Self::Cell(reference.to_string())
    }

    pub fn constant(value: &str) -> Self {
        Self::Const(value.to_string())
    }

    pub fn join(refs: &[&str], separator: &str) -> Self {
        Self::Join {
            refs: refs.iter().map(|r| r.to_string()).collect(),
            separator: separator.to_string(),
        }
    }

    pub fn month_year(reference: &str, format: MonthYearFormat) -> Self {
        Self::MonthYear {
            reference: reference.to_string(),
            format,
        }
    }

    /// Every cell reference this placeholder reads.
    pub fn references(&self) -> Vec<&str> {
        match self {
            Self::Cell(reference) | Self::MonthYear { reference, .. } => vec![reference.as_str()],
            Self::Const(_) => Vec::new(),
            Self::Join { refs, .. } => refs.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for PlaceholderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cell(reference) => write!(f, "cell {}", reference),
            Self::Const(value) => write!(f, "const {:?}", value),
            Self::Join { refs, separator } => {
                write!(f, "join {} with {:?}", refs.join("+"), separator)
            }
            Self::MonthYear { reference, format } => {
                write!(f, "month/year of {} as {}", reference, format)
            }
        }
    }
}

/// Resolves specs against one worksheet. Resolution never fails: anything
/// that cannot produce real content comes back as [`MISSING`].
pub struct Resolver<'a> {
    sheet: &'a Worksheet,
}

impl<'a> Resolver<'a> {
    pub fn new(sheet: &'a Worksheet) -> Self {
        Self { sheet }
    }

    pub fn resolve(&self, spec: &PlaceholderSpec) -> String {
        match spec {
            PlaceholderSpec::Cell(reference) => self.sheet.get_cell(reference),
            PlaceholderSpec::Const(value) => value.clone(),
            PlaceholderSpec::MonthYear { reference, format } => {
                month_year(self.sheet, reference, *format)
            }
            PlaceholderSpec::Join { refs, separator } => self.resolve_join(refs, separator),
        }
    }

    fn resolve_join(&self, refs: &[String], separator: &str) -> String {
        let parts: Vec<String> = refs
            .iter()
            .map(|r| self.sheet.get_cell(r))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && v != MISSING)
            .collect();
        if parts.is_empty() {
            MISSING.to_string()
        } else {
            parts.join(separator)
        }
    }
}

/// Escape the five XML special characters.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
