//! Engine entry points: validate the uploaded files, fill the template, or
//! preview what a mapping would write.

use crate::cell::Worksheet;
use crate::mappings::{self, MappingTable};
use crate::placeholder::{PlaceholderSpec, Resolver};
use crate::rewrite::{rewrite, DocumentContainer, RewriteReport};
use anyhow::{bail, Result};

/// Output name used when the caller does not pick one.
pub const DEFAULT_OUTPUT_NAME: &str = "generated.pptx";

/// Check the uploaded file names before any work is done. The error messages
/// are meant to be shown to the user as-is.
pub fn validate_inputs(template_name: Option<&str>, workbook_name: Option<&str>) -> Result<()> {
    let (Some(template_name), Some(workbook_name)) = (template_name, workbook_name) else {
        bail!("Upload both a PPTX template and an Excel file.");
    };
    if !template_name.to_lowercase().ends_with(".pptx") {
        bail!("Template must be a .pptx file.");
    }
    let workbook_lower = workbook_name.to_lowercase();
    if !(workbook_lower.ends_with(".xlsx") || workbook_lower.ends_with(".xls")) {
        bail!("Excel must be a .xlsx or .xls file.");
    }
    Ok(())
}

/// A filled template.
#[derive(Debug)]
pub struct Generated {
    pub bytes: Vec<u8>,
    pub report: RewriteReport,
}

/// Fill `template_bytes` using the registered mapping set `mapping_id`
/// (unknown ids fall back to the default set).
pub fn generate(
    mapping_id: &str,
    template_bytes: Vec<u8>,
    workbook_bytes: &[u8],
) -> Result<Generated> {
    let set = mappings::select(mapping_id);
    log::info!("Using mapping set '{}' ({})", set.id, set.label);
    generate_with_table(&set.table, template_bytes, workbook_bytes)
}

/// Fill `template_bytes` using an explicit mapping table.
///
/// The workbook is parsed first, then the template; nothing is returned
/// unless the whole archive was rewritten and serialized.
pub fn generate_with_table(
    table: &MappingTable,
    template_bytes: Vec<u8>,
    workbook_bytes: &[u8],
) -> Result<Generated> {
    let sheet = Worksheet::from_workbook_bytes(workbook_bytes)?;
    let mut container = DocumentContainer::from_bytes(template_bytes)?;
    let report = rewrite(&mut container, table, &Resolver::new(&sheet))?;
    let bytes = container.to_bytes()?;
    Ok(Generated { bytes, report })
}

/// One resolved placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewRow {
    pub page: u32,
    pub token: String,
    pub spec: PlaceholderSpec,
    pub value: String,
}

/// Resolve every placeholder of a table without touching any template.
/// Values are unescaped.
pub fn preview(table: &MappingTable, sheet: &Worksheet) -> Vec<PreviewRow> {
    let resolver = Resolver::new(sheet);
    table
        .pages()
        .flat_map(|(page, placeholders)| {
            placeholders.iter().map(move |(token, spec)| (page, token, spec))
        })
        .map(|(page, token, spec)| PreviewRow {
            page,
            token: token.clone(),
            spec: spec.clone(),
            value: resolver.resolve(spec),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{SpreadsheetCell, MISSING};

    #[test]
    fn test_validate_inputs() {
        assert!(validate_inputs(Some("deck.pptx"), Some("data.xlsx")).is_ok());
        assert!(validate_inputs(Some("DECK.PPTX"), Some("DATA.XLS")).is_ok());

        let msg = |t, w| validate_inputs(t, w).unwrap_err().to_string();
        assert_eq!(
            msg(None, Some("data.xlsx")),
            "Upload both a PPTX template and an Excel file."
        );
        assert_eq!(
            msg(Some("deck.pptx"), None),
            "Upload both a PPTX template and an Excel file."
        );
        assert_eq!(
            msg(Some("deck.ppt"), Some("data.xlsx")),
            "Template must be a .pptx file."
        );
        assert_eq!(
            msg(Some("deck.pptx"), Some("data.csv")),
            "Excel must be a .xlsx or .xls file."
        );
    }

    #[test]
    fn test_preview_follows_table_order() {
        let table = MappingTable::from_pages(vec![
            (
                2,
                vec![
                    ("[b]", PlaceholderSpec::cell("B2")),
                    ("[a]", PlaceholderSpec::constant("<fixed>")),
                ],
            ),
            (1, vec![("[c]", PlaceholderSpec::join(&["A2", "B2"], "-"))]),
        ]);
        let sheet = Worksheet::new("Sheet1").with("A2", SpreadsheetCell::text("left"));

        let rows = preview(&table, &sheet);
        let flat: Vec<(u32, &str, &str)> = rows
            .iter()
            .map(|r| (r.page, r.token.as_str(), r.value.as_str()))
            .collect();
        assert_eq!(
            flat,
            vec![(2, "[b]", MISSING), (2, "[a]", "<fixed>"), (1, "[c]", "left")]
        );
    }

    #[test]
    fn test_generate_rejects_garbage() {
        let err = generate("org_change", b"not a zip".to_vec(), b"not a workbook").unwrap_err();
        assert!(format!("{:#}", err).contains("workbook"), "{:#}", err);
    }
}
