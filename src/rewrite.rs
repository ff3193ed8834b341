//! PPTX container I/O and placeholder substitution.
//!
//! The container is kept as the original archive bytes plus the handful of
//! parts that were rewritten. On output every untouched entry is raw-copied,
//! so images, layouts and unmapped slides come out byte-identical.

use crate::mappings::MappingTable;
use crate::placeholder::{escape_xml, Resolver};
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Entry path of slide `page` inside a PPTX.
pub fn slide_part_path(page: u32) -> String {
    format!("ppt/slides/slide{}.xml", page)
}

// ─── Container ───────────────────────────────────────────────────────────────

/// An in-memory zip archive whose entries can be replaced but never added.
pub struct DocumentContainer {
    source: Vec<u8>,
    names: Vec<String>,
    rewritten: HashMap<String, Vec<u8>>,
}

impl DocumentContainer {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let names = {
            let mut archive = open_archive(&bytes)?;
            let mut names = Vec::with_capacity(archive.len());
            for i in 0..archive.len() {
                names.push(archive.by_index_raw(i)?.name().to_string());
            }
            names
        };
        Ok(Self {
            source: bytes,
            names,
            rewritten: HashMap::new(),
        })
    }

    /// Entry names in archive order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Current contents of an entry, or `None` if the archive has no such entry.
    pub fn read_entry(&self, name: &str) -> Result<Option<Vec<u8>>> {
        if let Some(data) = self.rewritten.get(name) {
            return Ok(Some(data.clone()));
        }
        let mut archive = open_archive(&self.source)?;
        let mut entry = match archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("Failed to open {}", name)),
        };
        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .with_context(|| format!("Failed to read {}", name))?;
        Ok(Some(data))
    }

    pub fn read_text(&self, name: &str) -> Result<Option<String>> {
        match self.read_entry(name)? {
            Some(data) => {
                let text = String::from_utf8(data)
                    .with_context(|| format!("{} is not valid UTF-8", name))?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }

    /// Replace the contents of an existing entry.
    pub fn replace_entry(&mut self, name: &str, data: Vec<u8>) -> Result<()> {
        if !self.contains(name) {
            bail!("Container has no entry named {}", name);
        }
        self.rewritten.insert(name.to_string(), data);
        Ok(())
    }

    /// Serialize the archive. Replaced entries keep their original compression
    /// method and timestamp; everything else is copied without recompression.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut archive = open_archive(&self.source)?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i)?;
            let Some(data) = self.rewritten.get(entry.name()) else {
                writer.raw_copy_file(entry)?;
                continue;
            };

            let method = match entry.compression() {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let mut options = SimpleFileOptions::default().compression_method(method);
            if let Some(modified) = entry.last_modified() {
                options = options.last_modified_time(modified);
            }
            let name = entry.name().to_string();
            drop(entry);

            writer
                .start_file(name.as_str(), options)
                .with_context(|| format!("Failed to write {}", name))?;
            writer.write_all(data)?;
        }
        let cursor = writer.finish().context("Failed to finish output archive")?;
        Ok(cursor.into_inner())
    }
}

fn open_archive(bytes: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>> {
    ZipArchive::new(Cursor::new(bytes)).context("Template is not a valid PPTX (zip) file")
}

// ─── Substitution ────────────────────────────────────────────────────────────

/// What a rewrite pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Slides present in both the table and the container.
    pub pages_found: Vec<u32>,
    /// Slides in the table that the container does not have.
    pub pages_skipped: Vec<u32>,
    /// Token occurrences replaced across all slides.
    pub replacements: usize,
}

/// Substitute every mapped token on every mapped slide the container has.
///
/// Slides are visited in table order and tokens in their declared order. Each
/// token is replaced everywhere in the slide's current text in one literal
/// pass, so a value that contains a later token's text will itself be
/// rewritten by that later token.
pub fn rewrite(
    container: &mut DocumentContainer,
    table: &MappingTable,
    resolver: &Resolver,
) -> Result<RewriteReport> {
    let mut report = RewriteReport::default();

    for (page, placeholders) in table.pages() {
        let path = slide_part_path(page);
        let Some(mut xml) = container.read_text(&path)? else {
            log::debug!("Slide {} not in template, skipping", page);
            report.pages_skipped.push(page);
            continue;
        };
        report.pages_found.push(page);

        let mut page_replacements = 0usize;
        for (token, spec) in placeholders {
            if token.is_empty() {
                continue;
            }
            let value = escape_xml(&resolver.resolve(spec));
            let count = xml.matches(token.as_str()).count();
            if count == 0 {
                continue;
            }
            xml = xml.replace(token.as_str(), &value);
            log::debug!("Slide {}: {} x{} -> {:?}", page, token, count, value);
            page_replacements += count;
        }

        if page_replacements > 0 {
            container.replace_entry(&path, xml.into_bytes())?;
        }
        report.replacements += page_replacements;
    }

    log::info!(
        "Rewrote {} slides ({} skipped), {} replacements",
        report.pages_found.len(),
        report.pages_skipped.len(),
        report.replacements
    );
    Ok(report)
}
