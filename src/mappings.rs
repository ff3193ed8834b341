//! Mapping tables: which tokens to replace on which slide, and from where.
//!
//! Each supported template family has one named table in the registry below.
//! A new template variant is a new table here, never new engine code.

use crate::cell::CellRef;
use crate::placeholder::PlaceholderSpec;
use anyhow::{bail, Result};
use std::collections::HashSet;

/// Id used when the caller asks for a mapping set that does not exist.
pub const DEFAULT_MAPPING_ID: &str = "org_change";

/// Placeholders of one slide, in application order.
pub type Placeholders = Vec<(String, PlaceholderSpec)>;

/// Ordered `(slide number, placeholders)` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingTable {
    pages: Vec<(u32, Placeholders)>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from literal data. Call [`MappingTable::validate`] to check it.
    pub fn from_pages(pages: Vec<(u32, Vec<(&str, PlaceholderSpec)>)>) -> Self {
        let pages = pages
            .into_iter()
            .map(|(page, entries)| {
                let entries = entries
                    .into_iter()
                    .map(|(token, spec)| (token.to_string(), spec))
                    .collect();
                (page, entries)
            })
            .collect();
        Self { pages }
    }

    /// Append a placeholder to a slide, creating the slide entry on first use.
    pub fn insert(&mut self, page: u32, token: &str, spec: PlaceholderSpec) -> Result<()> {
        if page == 0 {
            bail!("Slide numbers start at 1 (token '{}')", token);
        }
        if token.is_empty() {
            bail!("Empty placeholder token on slide {}", page);
        }
        let idx = match self.pages.iter().position(|(p, _)| *p == page) {
            Some(idx) => idx,
            None => {
                self.pages.push((page, Vec::new()));
                self.pages.len() - 1
            }
        };
        let entries = &mut self.pages[idx].1;
        if entries.iter().any(|(t, _)| t == token) {
            bail!("Duplicate placeholder '{}' on slide {}", token, page);
        }
        entries.push((token.to_string(), spec));
        Ok(())
    }

    pub fn pages(&self) -> impl Iterator<Item = (u32, &[(String, PlaceholderSpec)])> {
        self.pages.iter().map(|(page, entries)| (*page, entries.as_slice()))
    }

    pub fn page(&self, page: u32) -> Option<&[(String, PlaceholderSpec)]> {
        self.pages
            .iter()
            .find(|(p, _)| *p == page)
            .map(|(_, entries)| entries.as_slice())
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn placeholder_count(&self) -> usize {
        self.pages.iter().map(|(_, entries)| entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Check slide numbers, token uniqueness and cell references.
    pub fn validate(&self) -> Result<()> {
        let mut seen_pages = HashSet::new();
        for (page, entries) in &self.pages {
            if *page == 0 {
                bail!("Slide numbers start at 1");
            }
            if !seen_pages.insert(*page) {
                bail!("Slide {} is listed more than once", page);
            }
            let mut seen_tokens = HashSet::new();
            for (token, spec) in entries {
                if token.is_empty() {
                    bail!("Empty placeholder token on slide {}", page);
                }
                if !seen_tokens.insert(token.as_str()) {
                    bail!("Duplicate placeholder '{}' on slide {}", token, page);
                }
                for reference in spec.references() {
                    if CellRef::parse(reference).is_none() {
                        bail!(
                            "Invalid cell reference '{}' for '{}' on slide {}",
                            reference,
                            token,
                            page
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

/// A named mapping table for one template family.
#[derive(Debug, Clone)]
pub struct MappingSet {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub table: MappingTable,
}

lazy_static::lazy_static! {
    static ref REGISTRY: Vec<MappingSet> = vec![
        MappingSet {
            id: "org_change",
            label: "Organization Change",
            description: "Org change PPTX template filled from the change request export.",
            table: org_change_table(),
        },
        MappingSet {
            id: "new_tools",
            label: "New Tools / Surveys / Trainings",
            description: "New Tools/Surveys/Trainings template filled from the intake export.",
            table: new_tools_table(),
        },
    ];
}

/// All registered mapping sets, default first.
pub fn registry() -> &'static [MappingSet] {
    &REGISTRY
}

pub fn find(id: &str) -> Option<&'static MappingSet> {
    REGISTRY.iter().find(|set| set.id == id)
}

/// The mapping set for `id`, or the default set when `id` is unknown.
pub fn select(id: &str) -> &'static MappingSet {
    if let Some(set) = find(id) {
        return set;
    }
    log::warn!("Unknown mapping set '{}', using '{}'", id, DEFAULT_MAPPING_ID);
    find(DEFAULT_MAPPING_ID).unwrap_or(&REGISTRY[0])
}

// ─── Tables ──────────────────────────────────────────────────────────────────

fn org_change_table() -> MappingTable {
    use PlaceholderSpec as P;
    MappingTable::from_pages(vec![
        (
            1,
            vec![
                ("NAME OF PROJECT", P::cell("F2")),
                ("TYPE OF PROJECT", P::cell("K2")),
            ],
        ),
        (3, vec![("[Description]", P::cell("M2"))]),
        (
            4,
            vec![
                ("[L2/L3]", P::cell("I2")),
                ("[Owner]", P::cell("G2")),
                ("[Lead]", P::cell("H2")),
                ("[Comms]", P::cell("J2")),
            ],
        ),
        (
            5,
            vec![
                ("[Date]", P::cell("N2")),
                ("[Phases]", P::cell("P2")),
            ],
        ),
        (
            6,
            vec![
                ("[1]", P::cell("Q2")),
                ("[2]", P::cell("R2")),
                ("[3]", P::join(&["S2", "T2"], " ")),
                ("[4]", P::cell("V2")),
            ],
        ),
        (7, vec![("[1]", P::cell("W2"))]),
        (
            8,
            vec![
                ("[1]", P::cell("L2")),
                ("[2]", P::join(&["AA2", "AB2"], " ")),
                ("[3]", P::cell("Y2")),
            ],
        ),
        (9, vec![("[1]", P::cell("Z2")), ("[2]", P::cell("AD2"))]),
        (10, vec![("[1]", P::cell("AF2")), ("[2]", P::cell("AG2"))]),
        (11, vec![("[1]", P::cell("DG2")), ("[2]", P::cell("DI2"))]),
    ])
}

fn new_tools_table() -> MappingTable {
    use PlaceholderSpec as P;
    MappingTable::from_pages(vec![
        (
            1,
            vec![
                ("NAME OF PROJECT", P::cell("F2")),
                ("TYPE OF PROJECT", P::cell("K2")),
            ],
        ),
        (3, vec![("[1]", P::cell("BZ2"))]),
        (
            4,
            vec![
                ("[1]", P::cell("I2")),
                ("[2]", P::constant("N/A")),
                ("[3]", P::cell("G2")),
                ("[4]", P::cell("H2")),
                ("[5]", P::cell("J2")),
            ],
        ),
        (
            5,
            vec![
                ("[1]", P::cell("CA2")),
                ("[2]", P::constant("N/A")),
            ],
        ),
        (
            6,
            vec![
                ("[1]", P::constant("N/A")),
                ("[2]", P::constant("N/A")),
                ("[3]", P::constant("N/A")),
                ("[4]", P::constant("N/A")),
            ],
        ),
        (7, vec![("[1]", P::constant("N/A"))]),
        (
            8,
            vec![
                ("[1]", P::cell("BW2")),
                // swap the separator for "\n" to put the names on separate lines
                ("[2]", P::join(&["CD2", "CE2"], " ")),
                ("[3]", P::cell("CC2")),
            ],
        ),
        (
            9,
            vec![
                ("[1]", P::cell("BX2")),
                ("[2]", P::cell("CH2")),
                ("[3]", P::cell("CI2")),
                ("[4]", P::cell("BN2")),
            ],
        ),
        (
            10,
            vec![
                ("[1]", P::cell("CJ2")),
                ("[2]", P::cell("CK2")),
                ("[3]", P::cell("CL2")),
                ("[4]", P::cell("CM2")),
                ("[5]", P::cell("CN2")),
                ("[6]", P::cell("CO2")),
                ("[7]", P::cell("CP2")),
            ],
        ),
        (
            11,
            vec![
                ("[1]", P::cell("CQ2")),
                ("[2]", P::cell("CR2")),
                ("[3]", P::cell("CS2")),
                ("[4]", P::cell("CT2")),
                ("[5]", P::cell("CU2")),
                ("[6]", P::cell("CV2")),
                ("[7]", P::cell("CX2")),
            ],
        ),
        (
            12,
            vec![
                ("[1]", P::cell("CY2")),
                ("[2]", P::cell("CZ2")),
                ("[3]", P::cell("DB2")),
                ("[4]", P::cell("DC2")),
            ],
        ),
        (13, vec![("[1]", P::cell("DG2")), ("[2]", P::cell("DI2"))]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_tables_are_valid() {
        assert_eq!(registry().len(), 2);
        for set in registry() {
            set.table
                .validate()
                .unwrap_or_else(|e| panic!("{} is invalid: {}", set.id, e));
        }
        assert_eq!(registry()[0].id, DEFAULT_MAPPING_ID);
    }

    #[test]
    fn test_table_shapes() {
        let org = &find("org_change").unwrap().table;
        assert_eq!(org.page_count(), 10);
        assert_eq!(org.placeholder_count(), 23);
        assert!(org.page(2).is_none());

        let tools = &find("new_tools").unwrap().table;
        assert_eq!(tools.page_count(), 12);
        assert_eq!(tools.page(13).unwrap().len(), 2);
    }

    #[test]
    fn test_page_order_is_declaration_order() {
        let org = &find("org_change").unwrap().table;
        let pages: Vec<u32> = org.pages().map(|(p, _)| p).collect();
        assert_eq!(pages, vec![1, 3, 4, 5, 6, 7, 8, 9, 10, 11]);

        let tokens: Vec<&str> = org
            .page(4)
            .unwrap()
            .iter()
            .map(|(t, _)| t.as_str())
            .collect();
        assert_eq!(tokens, vec!["[L2/L3]", "[Owner]", "[Lead]", "[Comms]"]);
    }

    #[test]
    fn test_select_falls_back_to_default() {
        assert_eq!(select("new_tools").id, "new_tools");
        assert_eq!(select("org_change").id, "org_change");
        assert_eq!(select("no_such_template").id, DEFAULT_MAPPING_ID);
        assert_eq!(select("").id, DEFAULT_MAPPING_ID);
    }

    #[test]
    fn test_insert_rejects_bad_entries() {
        let mut table = MappingTable::new();
        table.insert(2, "[1]", PlaceholderSpec::cell("A1")).unwrap();
        table.insert(1, "[1]", PlaceholderSpec::cell("B1")).unwrap();
        table.insert(2, "[2]", PlaceholderSpec::constant("x")).unwrap();
        assert!(table.insert(2, "[1]", PlaceholderSpec::cell("C1")).is_err());
        assert!(table.insert(0, "[9]", PlaceholderSpec::cell("C1")).is_err());
        assert!(table.insert(3, "", PlaceholderSpec::cell("C1")).is_err());

        let pages: Vec<u32> = table.pages().map(|(p, _)| p).collect();
        assert_eq!(pages, vec![2, 1]);
        assert_eq!(table.placeholder_count(), 3);
    }

    #[test]
    fn test_validate_catches_bad_refs_and_duplicates() {
        let bad_ref =
            MappingTable::from_pages(vec![(1, vec![("[1]", PlaceholderSpec::cell("2F"))])]);
        assert!(bad_ref.validate().is_err());

        let dup = MappingTable::from_pages(vec![(
            1,
            vec![
                ("[1]", PlaceholderSpec::cell("A1")),
                ("[1]", PlaceholderSpec::cell("A2")),
            ],
        )]);
        assert!(dup.validate().is_err());

        let dup_page = MappingTable::from_pages(vec![
            (1, vec![("[1]", PlaceholderSpec::cell("A1"))]),
            (1, vec![("[2]", PlaceholderSpec::cell("A2"))]),
        ]);
        assert!(dup_page.validate().is_err());
    }
}
