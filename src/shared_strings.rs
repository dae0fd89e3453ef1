//! The workbook's shared string table (`xl/sharedStrings.xml`).
//!
//! Each `<si>` element contributes one string at its positional index.
//! Strings may be plain `<t>` text or rich text with multiple `<r><t>` runs;
//! phonetic runs (`<rPh>`) are not part of the visible text. Entries are
//! only ever appended, so an index handed out once stays valid.

use std::collections::HashMap;

use crate::error::Result;
use crate::xml_tree::{Document, Element, Node};

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

#[derive(Debug, Clone)]
struct Entry {
    text: String,
    /// Original `<si>` markup, kept until the entry is rewritten.
    markup: Option<Element>,
}

/// Deduplicated, append-only string table.
#[derive(Debug, Clone)]
pub struct SharedStrings {
    document: Document,
    entries: Vec<Entry>,
    /// Text → first index holding it.
    lookup: HashMap<String, usize>,
    dirty: bool,
}

impl SharedStrings {
    /// An empty table for packages that ship without one.
    pub(crate) fn empty() -> Self {
        let root = Element::new("sst")
            .with_attr("xmlns", MAIN_NS)
            .with_attr("count", "0")
            .with_attr("uniqueCount", "0");
        Self {
            document: Document::new(root),
            entries: Vec::new(),
            lookup: HashMap::new(),
            dirty: false,
        }
    }

    pub(crate) fn parse(xml: &str) -> Result<Self> {
        let mut document = Document::parse(xml)?;
        let mut entries = Vec::new();
        document.root.children.retain(|node| match node {
            Node::Element(si) if si.local_name() == "si" => {
                entries.push(Entry {
                    text: si_text(si),
                    markup: Some(si.clone()),
                });
                false
            }
            _ => true,
        });

        let mut table = Self {
            document,
            entries,
            lookup: HashMap::new(),
            dirty: false,
        };
        table.rebuild_lookup();
        Ok(table)
    }

    fn rebuild_lookup(&mut self) {
        self.lookup.clear();
        for (i, entry) in self.entries.iter().enumerate() {
            self.lookup.entry(entry.text.clone()).or_insert(i);
        }
    }

    /// Text at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|e| e.text.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All strings in index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.text.as_str())
    }

    /// Whether the table changed since load.
    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Index of an exact match, appending the string if it is new.
    pub(crate) fn intern(&mut self, text: &str) -> usize {
        if let Some(&index) = self.lookup.get(text) {
            return index;
        }
        let index = self.entries.len();
        self.entries.push(Entry {
            text: text.to_string(),
            markup: None,
        });
        self.lookup.insert(text.to_string(), index);
        self.dirty = true;
        index
    }

    /// Rewrite the first entry equal to `old` in place, keeping its index.
    pub(crate) fn replace(&mut self, old: &str, new: &str) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.text == old) else {
            return false;
        };
        entry.text = new.to_string();
        entry.markup = None;
        self.dirty = true;
        self.rebuild_lookup();
        true
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut document = self.document.clone();
        let count = self.entries.len().to_string();
        document.root.set_attr("count", count.as_str());
        document.root.set_attr("uniqueCount", count);

        // <si> entries come before <extLst>, the only other allowed child.
        let tail = std::mem::take(&mut document.root.children);
        for entry in &self.entries {
            let si = match &entry.markup {
                Some(markup) => markup.clone(),
                None => plain_si(&document.root, &entry.text),
            };
            document.root.push_child(si);
        }
        document.root.children.extend(tail);
        document.to_bytes()
    }
}

/// Visible text of one `<si>`: its `<t>` plus every run's `<t>`.
fn si_text(si: &Element) -> String {
    let mut text = String::new();
    for child in si.elements() {
        match child.local_name() {
            "t" => text.push_str(&child.text()),
            "r" => {
                for t in child.children_named("t") {
                    text.push_str(&t.text());
                }
            }
            _ => {}
        }
    }
    text
}

fn plain_si(sst: &Element, text: &str) -> Element {
    let mut t = Element::new(sst.child_name("t"));
    if needs_preserve(text) {
        t.set_attr("xml:space", "preserve");
    }
    t.set_text(text);
    let mut si = Element::new(sst.child_name("si"));
    si.push_child(t);
    si
}

fn needs_preserve(text: &str) -> bool {
    text.starts_with(char::is_whitespace)
        || text.ends_with(char::is_whitespace)
        || text.contains('\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    const SST: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="3"><si><t>Hello</t></si><si><r><rPr><b/></rPr><t>Bold</t></r><r><t xml:space="preserve"> world</t></r></si><si><t>東京</t><rPh sb="0" eb="2"><t>トウキョウ</t></rPh></si></sst>"#;

    fn output(table: &SharedStrings) -> String {
        String::from_utf8(table.to_bytes().unwrap()).unwrap()
    }

    // ── parse ────────────────────────────────────────────────────

    #[test]
    fn parse_plain_rich_and_phonetic() {
        let table = SharedStrings::parse(SST).unwrap();
        assert_eq!(table.iter().collect::<Vec<_>>(), ["Hello", "Bold world", "東京"]);
    }

    #[test]
    fn parse_empty_table() {
        let table = SharedStrings::parse(r#"<sst xmlns="urn:x" count="0" uniqueCount="0"/>"#).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.get(0), None);
    }

    // ── intern ───────────────────────────────────────────────────

    #[test]
    fn intern_reuses_existing() {
        let mut table = SharedStrings::parse(SST).unwrap();
        assert_eq!(table.intern("Hello"), 0);
        assert!(!table.is_dirty());
    }

    #[test]
    fn intern_dedups_new_strings() {
        let mut table = SharedStrings::parse(SST).unwrap();
        for _ in 0..50 {
            table.intern("one");
            table.intern("two");
        }
        assert_eq!(table.len(), 5);
        assert_eq!(table.intern("one"), 3);
        assert_eq!(table.intern("two"), 4);
        assert!(table.is_dirty());
    }

    #[test]
    fn intern_is_exact() {
        let mut table = SharedStrings::parse(SST).unwrap();
        assert_eq!(table.intern("hello"), 3);
        assert_eq!(table.intern("Hello "), 4);
    }

    // ── replace ──────────────────────────────────────────────────

    #[test]
    fn replace_keeps_index() {
        let mut table = SharedStrings::parse(SST).unwrap();
        assert!(table.replace("Hello", "Bye"));
        assert_eq!(table.get(0), Some("Bye"));
        assert_eq!(table.intern("Bye"), 0);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn replace_missing() {
        let mut table = SharedStrings::parse(SST).unwrap();
        assert!(!table.replace("Nope", "Bye"));
        assert!(!table.is_dirty());
    }

    // ── to_bytes ─────────────────────────────────────────────────

    #[test]
    fn untouched_entries_keep_markup() {
        let mut table = SharedStrings::parse(SST).unwrap();
        table.intern(" padded");
        let xml = output(&table);
        assert!(xml.contains(r#"count="4" uniqueCount="4""#));
        assert!(xml.contains("<rPr><b/></rPr>"));
        assert!(xml.contains("<rPh"));
        assert!(xml.ends_with(r#"<si><t xml:space="preserve"> padded</t></si></sst>"#));
    }

    #[test]
    fn empty_table_serializes() {
        let mut table = SharedStrings::empty();
        table.intern("a & b");
        let xml = output(&table);
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains(r#"count="1" uniqueCount="1"><si><t>a &amp; b</t></si></sst>"#));
    }

    #[test]
    fn reparse_after_write() {
        let mut table = SharedStrings::parse(SST).unwrap();
        table.replace("Bold world", "Plain");
        let again = SharedStrings::parse(&output(&table)).unwrap();
        assert_eq!(again.iter().collect::<Vec<_>>(), ["Hello", "Plain", "東京"]);
    }
}
