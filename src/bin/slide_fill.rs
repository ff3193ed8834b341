//! Fill a PPTX template with values from the first sheet of a workbook.
//!
//! Usage:
//!   slide-fill generate --template deck.pptx --excel export.xlsx \
//!     [--mapping new_tools] [--mapping-file custom.csv] [-o generated.pptx]
//!   slide-fill preview --excel export.xlsx [--mapping org_change]
//!   slide-fill mappings [--show org_change]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use slide_fill::cell::Worksheet;
use slide_fill::generate::{generate_with_table, preview, validate_inputs, DEFAULT_OUTPUT_NAME};
use slide_fill::mapping_file::load_mapping_file;
use slide_fill::mappings::{self, MappingTable, DEFAULT_MAPPING_ID};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

const CELL_TEXT_NOTE: &str = "\
Cell text is derived from the stored value: numbers use the General format
(0.25 stays 0.25, not 25%) and dates print as m/d/yy. Percent, currency and
other custom number formats are not applied.";

#[derive(Parser)]
#[command(name = "slide-fill")]
#[command(about = "Fill PowerPoint templates with values from a spreadsheet")]
#[command(after_help = CELL_TEXT_NOTE)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill a template and write the resulting deck
    Generate {
        /// PPTX template
        #[arg(short, long)]
        template: PathBuf,

        /// Workbook (.xlsx or .xls); only the first sheet is read
        #[arg(short, long)]
        excel: PathBuf,

        /// Mapping set id (see `mappings`); unknown ids use the default set
        #[arg(short, long, env = "SLIDE_FILL_MAPPING", default_value = DEFAULT_MAPPING_ID)]
        mapping: String,

        /// CSV mapping table to use instead of a registered mapping set
        #[arg(long)]
        mapping_file: Option<PathBuf>,

        /// Output PPTX file
        #[arg(short, long, default_value = DEFAULT_OUTPUT_NAME)]
        output: PathBuf,
    },

    /// Print the value every placeholder would receive, without a template
    Preview {
        /// Workbook (.xlsx or .xls); only the first sheet is read
        #[arg(short, long)]
        excel: PathBuf,

        /// Mapping set id (see `mappings`); unknown ids use the default set
        #[arg(short, long, env = "SLIDE_FILL_MAPPING", default_value = DEFAULT_MAPPING_ID)]
        mapping: String,

        /// CSV mapping table to use instead of a registered mapping set
        #[arg(long)]
        mapping_file: Option<PathBuf>,
    },

    /// List registered mapping sets
    Mappings {
        /// Print the slides and placeholders of one mapping set
        #[arg(long)]
        show: Option<String>,
    },
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// The table from `--mapping-file` if given, else the registered set.
fn resolve_table(mapping: &str, mapping_file: Option<&Path>) -> Result<Cow<'static, MappingTable>> {
    match mapping_file {
        Some(path) => {
            let table = load_mapping_file(path)?;
            println!(
                "Loaded {} placeholders on {} slides from {}",
                table.placeholder_count(),
                table.page_count(),
                path.display()
            );
            Ok(Cow::Owned(table))
        }
        None => {
            let set = mappings::select(mapping);
            println!("Mapping set: {} ({})", set.label, set.id);
            Ok(Cow::Borrowed(&set.table))
        }
    }
}

fn run_generate(
    template: &Path,
    excel: &Path,
    mapping: &str,
    mapping_file: Option<&Path>,
    output: &Path,
) -> Result<()> {
    let table = resolve_table(mapping, mapping_file)?;

    let workbook_bytes = std::fs::read(excel)
        .with_context(|| format!("Failed to read workbook: {}", excel.display()))?;
    let template_bytes = std::fs::read(template)
        .with_context(|| format!("Failed to read template: {}", template.display()))?;
    println!("Template: {}", template.display());
    println!("Workbook: {}", excel.display());

    let generated = generate_with_table(&table, template_bytes, &workbook_bytes)?;
    let report = &generated.report;
    println!(
        "\nFilled {} slides with {} replacements",
        report.pages_found.len(),
        report.replacements
    );
    if !report.pages_skipped.is_empty() {
        let skipped: Vec<String> = report.pages_skipped.iter().map(u32::to_string).collect();
        println!("  Slides not in template: {}", skipped.join(", "));
    }

    std::fs::write(output, &generated.bytes)
        .with_context(|| format!("Failed to write output: {}", output.display()))?;
    println!("\nSaved to: {}", output.display());
    Ok(())
}

fn run_preview(excel: &Path, mapping: &str, mapping_file: Option<&Path>) -> Result<()> {
    let table = resolve_table(mapping, mapping_file)?;
    let workbook_bytes = std::fs::read(excel)
        .with_context(|| format!("Failed to read workbook: {}", excel.display()))?;
    let sheet = Worksheet::from_workbook_bytes(&workbook_bytes)?;
    println!("Sheet: {} ({} cells)\n", sheet.name(), sheet.len());

    for row in preview(&table, &sheet) {
        println!(
            "  slide {:>2}  {:<18} {:<28} {}",
            row.page,
            row.token,
            row.spec.to_string(),
            row.value
        );
    }
    Ok(())
}

fn list_mappings(show: Option<&str>) -> Result<()> {
    let Some(id) = show else {
        for set in mappings::registry() {
            let default_marker = if set.id == DEFAULT_MAPPING_ID { " (default)" } else { "" };
            println!("{}{}: {}", set.id, default_marker, set.label);
            println!("    {}", set.description);
        }
        return Ok(());
    };

    let set = mappings::find(id).with_context(|| format!("No mapping set named '{}'", id))?;
    println!("{} ({})", set.label, set.id);
    for (page, placeholders) in set.table.pages() {
        println!("\nSlide {}", page);
        for (token, spec) in placeholders {
            println!("  {:<18} {}", token, spec);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            template,
            excel,
            mapping,
            mapping_file,
            output,
        } => {
            validate_inputs(file_name(&template).as_deref(), file_name(&excel).as_deref())?;
            run_generate(&template, &excel, &mapping, mapping_file.as_deref(), &output)
                .map_err(|e| anyhow::anyhow!("Generate failed: {:#}", e))?;
        }
        Commands::Preview {
            excel,
            mapping,
            mapping_file,
        } => {
            run_preview(&excel, &mapping, mapping_file.as_deref())?;
        }
        Commands::Mappings { show } => {
            list_mappings(show.as_deref())?;
        }
    }

    Ok(())
}
