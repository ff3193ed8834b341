//! Mapping tables loaded from CSV.
//!
//! One row per placeholder:
//!
//! ```text
//! Page,Token,Kind,Value,Option
//! 1,NAME OF PROJECT,cell,F2,
//! 6,[3],join,S2 T2," "
//! 5,[Date],month_year,N2,MMMM YYYY
//! 4,[2],const,N/A,
//! ```
//!
//! `Value` is the cell reference, the constant, or whitespace-separated
//! references for `join`. `Option` is the join separator (default one space,
//! `\n` and `\t` escapes honoured) or the month/year format (default `Mon YYYY`).
//! Slides keep the order in which they first appear.

use crate::cell::CellRef;
use crate::mappings::MappingTable;
use crate::month_year::MonthYearFormat;
use crate::placeholder::PlaceholderSpec;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct MappingRow {
    #[serde(rename = "Page")]
    page: u32,
    #[serde(rename = "Token")]
    token: String,
    #[serde(rename = "Kind")]
    kind: String,
    #[serde(rename = "Value", default)]
    value: String,
    #[serde(rename = "Option", default)]
    option: String,
}

pub fn load_mapping_file(path: &Path) -> Result<MappingTable> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open mapping file: {}", path.display()))?;
    parse_mapping_csv(file).with_context(|| format!("Invalid mapping file: {}", path.display()))
}

pub fn parse_mapping_csv<R: Read>(reader: R) -> Result<MappingTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut table = MappingTable::new();
    for (idx, result) in reader.deserialize::<MappingRow>().enumerate() {
        // header is line 1
        let line = idx + 2;
        let row = result.with_context(|| format!("Line {}: malformed row", line))?;
        let spec = spec_from_row(&row).with_context(|| format!("Line {}", line))?;
        table
            .insert(row.page, &row.token, spec)
            .with_context(|| format!("Line {}", line))?;
    }
    if table.is_empty() {
        bail!("Mapping file has no rows");
    }
    table.validate()?;
    Ok(table)
}

fn spec_from_row(row: &MappingRow) -> Result<PlaceholderSpec> {
    let spec = match row.kind.trim().to_ascii_lowercase().as_str() {
        "cell" => PlaceholderSpec::Cell(checked_ref(&row.value)?),
        "const" => PlaceholderSpec::Const(row.value.clone()),
        "join" => {
            let refs = row
                .value
                .split_whitespace()
                .map(checked_ref)
                .collect::<Result<Vec<_>>>()?;
            if refs.is_empty() {
                bail!("join of '{}' lists no cells", row.token);
            }
            let separator = if row.option.is_empty() {
                " ".to_string()
            } else {
                unescape(&row.option)
            };
            PlaceholderSpec::Join { refs, separator }
        }
        "month_year" | "monthyear" => {
            let format = if row.option.trim().is_empty() {
                MonthYearFormat::default()
            } else {
                row.option.parse()?
            };
            PlaceholderSpec::MonthYear {
                reference: checked_ref(&row.value)?,
                format,
            }
        }
        other => bail!(
            "Unknown kind '{}' for '{}' (expected cell, const, join or month_year)",
            other,
            row.token
        ),
    };
    Ok(spec)
}

fn checked_ref(reference: &str) -> Result<String> {
    let cell_ref: CellRef = reference.parse()?;
    Ok(cell_ref.to_string())
}

fn unescape(s: &str) -> String {
    s.replace("\\n", "\n").replace("\\t", "\t")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_all_kinds() {
        let csv = "Page,Token,Kind,Value,Option\n\
                   3,[Description],cell,m2,\n\
                   1,NAME OF PROJECT,cell,F2,\n\
                   1,[3],join,S2  T2,\" / \"\n\
                   1,[4],join,AA2 AB2,\n\
                   5,[Date],month_year,N2,MMMM YYYY\n\
                   5,[Start],month_year,O2,\n\
                   4,[2],const,N/A,\n";
        let table = parse_mapping_csv(csv.as_bytes()).unwrap();

        let pages: Vec<u32> = table.pages().map(|(p, _)| p).collect();
        assert_eq!(pages, vec![3, 1, 5, 4]);
        assert_eq!(table.page(3).unwrap()[0].1, PlaceholderSpec::cell("M2"));

        let slide1 = table.page(1).unwrap();
        assert_eq!(slide1[0].0, "NAME OF PROJECT");
        assert_eq!(slide1[1].1, PlaceholderSpec::join(&["S2", "T2"], " / "));
        assert_eq!(slide1[2].1, PlaceholderSpec::join(&["AA2", "AB2"], " "));

        let slide5 = table.page(5).unwrap();
        assert_eq!(
            slide5[0].1,
            PlaceholderSpec::month_year("N2", MonthYearFormat::MonthYyyy)
        );
        assert_eq!(
            slide5[1].1,
            PlaceholderSpec::month_year("O2", MonthYearFormat::MonYyyy)
        );
        assert_eq!(table.page(4).unwrap()[0].1, PlaceholderSpec::constant("N/A"));
    }

    #[test]
    fn test_join_separator_escapes() {
        let csv = "Page,Token,Kind,Value,Option\n8,[2],join,CD2 CE2,\\n\n";
        let table = parse_mapping_csv(csv.as_bytes()).unwrap();
        assert_eq!(
            table.page(8).unwrap()[0].1,
            PlaceholderSpec::join(&["CD2", "CE2"], "\n")
        );
    }

    #[test]
    fn test_rejects_bad_rows() {
        let bad = [
            "Page,Token,Kind,Value,Option\n1,[1],cell,2F,\n",
            "Page,Token,Kind,Value,Option\n1,[1],formula,A1,\n",
            "Page,Token,Kind,Value,Option\n1,[1],join,,\n",
            "Page,Token,Kind,Value,Option\n1,[1],month_year,A1,YYYY\n",
            "Page,Token,Kind,Value,Option\n1,[1],cell,A1,\n1,[1],cell,A2,\n",
            "Page,Token,Kind,Value,Option\n0,[1],cell,A1,\n",
            "Page,Token,Kind,Value,Option\n1,,cell,A1,\n",
            "Page,Token,Kind,Value,Option\nfirst,[1],cell,A1,\n",
            "Page,Token,Kind,Value,Option\n",
        ];
        for csv in bad {
            assert!(parse_mapping_csv(csv.as_bytes()).is_err(), "accepted: {:?}", csv);
        }
    }

    #[test]
    fn test_error_names_the_line() {
        let csv = "Page,Token,Kind,Value,Option\n1,[1],cell,A1,\n1,[2],cell,??,\n";
        let err = parse_mapping_csv(csv.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("Line 3"), "{:#}", err);
    }

    #[test]
    fn test_load_mapping_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "Page,Token,Kind,Value,Option").unwrap();
        writeln!(f, "2,[Owner],cell,G2,").unwrap();
        f.flush().unwrap();

        let table = load_mapping_file(&path).unwrap();
        assert_eq!(table.placeholder_count(), 1);
        assert!(load_mapping_file(&dir.path().join("missing.csv")).is_err());
    }
}
