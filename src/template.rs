//! The template package: load an `.xlsx`, fill sheets, build a new one.
//!
//! Every archive entry is read into memory at load. The parts the engine
//! understands (workbook, shared strings, worksheets, their relationships
//! and tables) are parsed; all other entries are carried as raw bytes and
//! written back unchanged, in their original order.

use std::fmt;
use std::io::{Cursor, Read, Write};

use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::context::ContextValue;
use crate::error::{Result, TemplateError};
use crate::reference::RangeRef;
use crate::shared_strings::SharedStrings;
use crate::shift::SheetScope;
use crate::substitute::Substitution;
use crate::tables::Table;
use crate::workbook::Workbook;
use crate::worksheet::{CellValue, Worksheet};
use crate::xml_tree::Document;
use crate::xml_util::{self, Relationships, CT_SHARED_STRINGS, REL_SHARED_STRINGS};

const WORKBOOK: &str = "xl/workbook.xml";
const CONTENT_TYPES: &str = "[Content_Types].xml";
const DEFAULT_SHARED_STRINGS: &str = "xl/sharedStrings.xml";

/// Which sheet to operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    /// 1-based position in workbook order.
    Position(usize),
    Name(String),
}

impl SheetSelector {
    /// Interpret a command-line argument: all digits is a position,
    /// anything else a name.
    pub fn from_arg(arg: &str) -> Self {
        match arg.parse() {
            Ok(n) if arg.bytes().all(|b| b.is_ascii_digit()) => Self::Position(n),
            _ => Self::Name(arg.to_string()),
        }
    }
}

impl From<usize> for SheetSelector {
    fn from(position: usize) -> Self {
        Self::Position(position)
    }
}

impl From<&str> for SheetSelector {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for SheetSelector {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(n) => write!(f, "#{n}"),
            Self::Name(name) => write!(f, "{name:?}"),
        }
    }
}

/// A worksheet part with its relationships.
#[derive(Debug)]
struct SheetPart {
    path: String,
    worksheet: Worksheet,
    rels: Option<Relationships>,
    dirty: bool,
    rels_dirty: bool,
}

/// A loaded template package.
#[derive(Debug)]
pub struct Template {
    /// Archive entries in their original order.
    entries: Vec<(String, Vec<u8>)>,
    workbook: Workbook,
    workbook_rels: Relationships,
    strings: SharedStrings,
    strings_path: String,
    /// Whether the package shipped a shared string part.
    strings_present: bool,
    /// Parallel to the workbook's sheet list; `None` for sheets without a
    /// grid (chart sheets).
    sheets: Vec<Option<SheetPart>>,
    tables: Vec<Table>,
    processed: bool,
}

impl Template {
    /// Read a template from the bytes of an `.xlsx` file.
    ///
    /// Fails on a corrupt archive, or when the workbook, its relationships,
    /// a worksheet or a table it references is missing or malformed.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            entries.push((entry.name().to_string(), data));
        }

        let workbook_rels_path = xml_util::rels_path(WORKBOOK);
        let workbook_rels = Relationships::parse(required_part(&entries, &workbook_rels_path)?)?;
        let workbook = Workbook::parse(required_part(&entries, WORKBOOK)?, &workbook_rels)?;

        let strings_path = workbook_rels
            .iter()
            .find(|rel| rel.is("sharedStrings"))
            .and_then(|rel| rel.part_path(WORKBOOK))
            .unwrap_or_else(|| DEFAULT_SHARED_STRINGS.to_string());
        let (strings, strings_present) = match part_text(&entries, &strings_path)? {
            Some(xml) => (SharedStrings::parse(xml)?, true),
            None => (SharedStrings::empty(), false),
        };

        let mut sheets = Vec::with_capacity(workbook.sheets.len());
        let mut tables = Vec::new();
        for entry in &workbook.sheets {
            let Some(path) = &entry.path else {
                debug!(sheet = %entry.name, "not a worksheet, skipping");
                sheets.push(None);
                continue;
            };
            let worksheet = Worksheet::parse(required_part(&entries, path)?)?;
            check_string_indices(path, &worksheet, &strings)?;

            let rels = part_text(&entries, &xml_util::rels_path(path))?
                .map(Relationships::parse)
                .transpose()?;
            for rel in rels.iter().flat_map(Relationships::iter) {
                let Some(table_path) = rel.part_path(path).filter(|_| rel.is("table")) else {
                    continue;
                };
                let xml = required_part(&entries, &table_path)?;
                tables.push(Table::parse(&table_path, path, xml)?);
            }

            sheets.push(Some(SheetPart {
                path: path.clone(),
                worksheet,
                rels,
                dirty: false,
                rels_dirty: false,
            }));
        }

        info!(
            entries = entries.len(),
            sheets = sheets.len(),
            shared_strings = strings.len(),
            tables = tables.len(),
            "template loaded"
        );
        Ok(Self {
            entries,
            workbook,
            workbook_rels,
            strings,
            strings_path,
            strings_present,
            sheets,
            tables,
            processed: false,
        })
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.workbook.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn shared_strings(&self) -> &SharedStrings {
        &self.strings
    }

    /// The declared dimension of a worksheet, if it has one.
    pub fn dimension(&self, sheet: impl Into<SheetSelector>) -> Result<Option<RangeRef>> {
        let index = self.sheet_index(&sheet.into())?;
        Ok(self.sheets[index].as_ref().and_then(|s| s.worksheet.dimension))
    }

    /// Replace the first shared string equal to `old` with `new`, in place.
    ///
    /// Every cell that shows `old` through the shared string table shows
    /// `new` afterwards. Returns whether a string was replaced.
    pub fn replace_string(&mut self, old: &str, new: &str) -> bool {
        self.strings.replace(old, new)
    }

    /// Fill one sheet from `context`.
    ///
    /// If the filled sheet would not fit the grid, or merged ranges would
    /// collide, the error is returned and the template is left as it was.
    pub fn process(&mut self, sheet: impl Into<SheetSelector>, context: &ContextValue) -> Result<()> {
        let selector = sheet.into();
        let index = self.sheet_index(&selector)?;
        let entry = &self.workbook.sheets[index];
        let Some(part) = self.sheets[index].as_mut() else {
            return Err(TemplateError::SheetNotFound(format!(
                "{selector} is not a worksheet"
            )));
        };

        // A sheet that fails part way is put back as it was.
        let backup = (
            part.worksheet.clone(),
            self.workbook.names.clone(),
            self.tables.clone(),
            self.strings.clone(),
        );
        let scope = SheetScope {
            worksheet: &mut part.worksheet,
            names: &mut self.workbook.names,
            tables: self
                .tables
                .iter_mut()
                .filter(|t| t.sheet_path == part.path)
                .collect(),
            sheet_name: &entry.name,
            sheet_index: index,
        };
        let summary = match Substitution::new(scope, &mut self.strings, context).run(part.rels.as_mut()) {
            Ok(summary) => summary,
            Err(err) => {
                warn!(sheet = %entry.name, error = %err, "sheet left unfilled");
                (part.worksheet, self.workbook.names, self.tables, self.strings) = backup;
                return Err(err);
            }
        };
        info!(
            sheet = %entry.name,
            placeholders = summary.placeholders,
            rows_inserted = summary.rows_inserted,
            links_rewritten = summary.links_rewritten,
            dimension = %summary.dimension,
            "sheet filled"
        );

        part.dirty = true;
        part.rels_dirty |= summary.links_rewritten > 0;
        self.processed = true;
        Ok(())
    }

    /// Fill every worksheet, in workbook order, from the same context.
    pub fn process_all(&mut self, context: &ContextValue) -> Result<()> {
        for index in 0..self.sheets.len() {
            if self.sheets[index].is_some() {
                self.process(index + 1, context)?;
            }
        }
        Ok(())
    }

    fn sheet_index(&self, selector: &SheetSelector) -> Result<usize> {
        let found = match selector {
            SheetSelector::Position(n) => n
                .checked_sub(1)
                .filter(|i| *i < self.workbook.sheets.len()),
            SheetSelector::Name(name) => self.workbook.sheets.iter().position(|s| &s.name == name),
        };
        found.ok_or_else(|| TemplateError::SheetNotFound(selector.to_string()))
    }

    /// Serialize the package.
    ///
    /// Parts that were never touched are copied byte for byte. Once any
    /// sheet was processed the calculation chain is dropped and the
    /// workbook asks for a full recalculation on open.
    pub fn build(mut self) -> Result<Vec<u8>> {
        let mut replaced: Vec<(String, Vec<u8>)> = Vec::new();
        let mut removed: Vec<String> = Vec::new();
        let mut added: Vec<(String, Vec<u8>)> = Vec::new();
        let mut workbook_rels_dirty = false;

        let chains: Vec<String> = if self.processed {
            self.workbook_rels
                .iter()
                .filter(|rel| rel.is("calcChain"))
                .filter_map(|rel| rel.part_path(WORKBOOK))
                .collect()
        } else {
            Vec::new()
        };
        let create_strings = self.strings.is_dirty() && !self.strings_present;
        let mut content_types = if chains.is_empty() && !create_strings {
            None
        } else {
            Some(Document::parse(required_part(&self.entries, CONTENT_TYPES)?)?)
        };

        if self.processed {
            self.workbook.force_full_calc();
            replaced.push((WORKBOOK.to_string(), self.workbook.to_bytes()?));
        }
        if !chains.is_empty() {
            self.workbook_rels.remove_kind("calcChain");
            workbook_rels_dirty = true;
            for chain in chains {
                if let Some(types) = &mut content_types {
                    xml_util::remove_override(types, &chain);
                }
                debug!(part = %chain, "dropping calculation chain");
                removed.push(chain);
            }
        }

        if self.strings.is_dirty() {
            let bytes = self.strings.to_bytes()?;
            if create_strings {
                debug!(part = %self.strings_path, "creating shared string part");
                let target = self
                    .strings_path
                    .strip_prefix("xl/")
                    .unwrap_or(&self.strings_path)
                    .to_string();
                self.workbook_rels.push(REL_SHARED_STRINGS, &target);
                workbook_rels_dirty = true;
                if let Some(types) = &mut content_types {
                    xml_util::add_override(types, &self.strings_path, CT_SHARED_STRINGS);
                }
                added.push((self.strings_path.clone(), bytes));
            } else {
                replaced.push((self.strings_path.clone(), bytes));
            }
        }

        if workbook_rels_dirty {
            replaced.push((xml_util::rels_path(WORKBOOK), self.workbook_rels.to_bytes()?));
        }
        if let Some(types) = &content_types {
            replaced.push((CONTENT_TYPES.to_string(), types.to_bytes()?));
        }
        for part in self.sheets.iter().flatten() {
            if part.dirty {
                replaced.push((part.path.clone(), part.worksheet.to_bytes()?));
            }
            if let Some(rels) = part.rels.as_ref().filter(|_| part.rels_dirty) {
                replaced.push((xml_util::rels_path(&part.path), rels.to_bytes()?));
            }
        }
        for table in self.tables.iter().filter(|t| t.dirty) {
            replaced.push((table.path.clone(), table.to_bytes()?));
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, original) in &self.entries {
            if removed.contains(name) {
                continue;
            }
            let data = replaced
                .iter()
                .find(|(n, _)| n == name)
                .map_or(original.as_slice(), |(_, d)| d.as_slice());
            writer.start_file(name.as_str(), options)?;
            writer.write_all(data)?;
        }
        for (name, data) in &added {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(data)?;
        }

        info!(
            rewritten = replaced.len(),
            added = added.len(),
            removed = removed.len(),
            "package built"
        );
        Ok(writer.finish()?.into_inner())
    }
}

fn part_text<'a>(entries: &'a [(String, Vec<u8>)], name: &str) -> Result<Option<&'a str>> {
    entries
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, data)| {
            std::str::from_utf8(data)
                .map_err(|_| TemplateError::Malformed(format!("{name}: not UTF-8")))
        })
        .transpose()
}

fn required_part<'a>(entries: &'a [(String, Vec<u8>)], name: &str) -> Result<&'a str> {
    part_text(entries, name)?.ok_or_else(|| TemplateError::MissingPart(name.to_string()))
}

/// Every shared-string cell must point inside the table.
fn check_string_indices(path: &str, worksheet: &Worksheet, strings: &SharedStrings) -> Result<()> {
    for row in &worksheet.rows {
        for cell in &row.cells {
            if let CellValue::SharedString(index) = cell.value {
                if index >= strings.len() {
                    return Err(TemplateError::Malformed(format!(
                        "{path}: row {} points at shared string {index} of {}",
                        row.number,
                        strings.len()
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── SheetSelector ────────────────────────────────────────────

    #[test]
    fn selector_from_arg() {
        assert_eq!(SheetSelector::from_arg("2"), SheetSelector::Position(2));
        assert_eq!(SheetSelector::from_arg("Tables"), SheetSelector::Name("Tables".into()));
        assert_eq!(SheetSelector::from_arg("+2"), SheetSelector::Name("+2".into()));
        assert_eq!(SheetSelector::from_arg(""), SheetSelector::Name(String::new()));
    }

    #[test]
    fn selector_display() {
        assert_eq!(SheetSelector::Position(3).to_string(), "#3");
        assert_eq!(SheetSelector::from("My Sheet").to_string(), "\"My Sheet\"");
    }

    // ── load errors ──────────────────────────────────────────────

    #[test]
    fn load_rejects_non_zip() {
        assert!(matches!(Template::load(b"not a zip"), Err(TemplateError::Zip(_))));
    }

    #[test]
    fn load_requires_workbook() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("xl/_rels/workbook.xml.rels", SimpleFileOptions::default())
            .unwrap();
        writer
            .write_all(br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#)
            .unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        match Template::load(&bytes) {
            Err(TemplateError::MissingPart(part)) => assert_eq!(part, "xl/workbook.xml"),
            other => panic!("expected missing workbook, got {other:?}"),
        }
    }
}
