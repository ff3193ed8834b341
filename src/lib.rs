//! Slide Fill
//!
//! Fills PowerPoint templates with values read from a spreadsheet.
//!
//! This library provides:
//! - `cell`: first-sheet cell model with display text and date serial decoding
//! - `month_year`: month/year extraction from dates, serials and date text
//! - `placeholder`: placeholder specs and their resolution
//! - `mappings`: the registry of per-template mapping tables
//! - `mapping_file`: mapping tables loaded from CSV
//! - `rewrite`: PPTX container I/O and token substitution
//! - `generate`: end-to-end entry points
//!
//! Binaries:
//! - `slide-fill`: fill a template, preview a mapping, or list mapping sets

pub mod cell;
pub mod generate;
pub mod mapping_file;
pub mod mappings;
pub mod month_year;
pub mod placeholder;
pub mod rewrite;

pub use cell::MISSING;
pub use generate::{generate, generate_with_table, preview, validate_inputs};
pub use placeholder::PlaceholderSpec;
