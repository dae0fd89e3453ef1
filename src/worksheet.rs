//! Worksheet part (`xl/worksheets/sheetN.xml`).
//!
//! The rows of `<sheetData>`, the `<dimension>`, the merged ranges and the
//! hyperlink anchors are lifted into typed fields that the substitution
//! engine edits. Everything else in the part stays in the element tree and
//! is written back as it was.

use crate::error::{Result, TemplateError};
use crate::reference::{index_to_column, CellRef, RangeRef};
use crate::xml_tree::{Document, Element, Node};

// ── Cells ──────────────────────────────────────────────────────────

/// A formula cell: the `<f>` element plus its cached result, if any.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Formula {
    /// The `<f>` element. Its text is the formula without `=`; shared and
    /// array formulas carry `t`, `si` and `ref` attributes.
    pub(crate) element: Element,
    /// Cell `t` attribute describing the cached result.
    pub(crate) result_type: Option<String>,
    pub(crate) cached: Option<String>,
}

impl Formula {
    /// A fresh formula from text such as `SUM(A1:A4)`.
    pub(crate) fn new(name: String, text: &str) -> Self {
        let mut element = Element::new(name);
        element.set_text(text);
        Self {
            element,
            result_type: None,
            cached: None,
        }
    }

    pub(crate) fn text(&self) -> String {
        self.element.text()
    }
}

/// What a cell holds.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CellValue {
    Empty,
    SharedString(usize),
    /// `t="inlineStr"`; `markup` is the original `<is>` until the text changes.
    InlineString {
        text: String,
        markup: Option<Element>,
    },
    /// Numeric literal exactly as written in `<v>`.
    Number(String),
    Boolean(bool),
    Error(String),
    /// `t="str"` without a formula.
    Str(String),
    /// Any other `t` value (such as ISO dates, `t="d"`), kept verbatim.
    Raw { kind: String, value: String },
    Formula(Formula),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Cell {
    pub(crate) col: u32,
    /// Style index (`s` attribute), kept as written.
    pub(crate) style: Option<String>,
    pub(crate) value: CellValue,
    /// Attributes other than `r`, `s` and `t`.
    attributes: Vec<(String, String)>,
    /// Children other than `<v>`, `<f>` and `<is>`.
    extra: Vec<Node>,
}

impl Cell {
    pub(crate) fn new(col: u32, style: Option<String>, value: CellValue) -> Self {
        Self {
            col,
            style,
            value,
            attributes: Vec::new(),
            extra: Vec::new(),
        }
    }

    /// An empty cell at `col` with this cell's style.
    pub(crate) fn styled_like(&self, col: u32) -> Self {
        Self::new(col, self.style.clone(), CellValue::Empty)
    }

    /// Whether the cell counts toward the sheet dimension.
    pub(crate) fn is_populated(&self) -> bool {
        self.value != CellValue::Empty || self.style.is_some()
    }

    fn parse(element: &Element, row: u32, fallback_col: u32) -> Result<Self> {
        let col = match element.attr("r") {
            Some(r) => {
                let cell = CellRef::parse(r)
                    .ok_or_else(|| TemplateError::Malformed(format!("bad cell reference {r:?}")))?;
                if cell.row != row {
                    return Err(TemplateError::Malformed(format!(
                        "cell {r} is filed under row {row}"
                    )));
                }
                cell.col
            }
            None => fallback_col,
        };

        let mut style = None;
        let mut kind = None;
        let mut attributes = Vec::new();
        for (key, value) in &element.attributes {
            match key.as_str() {
                "r" => {}
                "s" => style = Some(value.clone()),
                "t" => kind = Some(value.clone()),
                _ => attributes.push((key.clone(), value.clone())),
            }
        }

        let mut v = None;
        let mut f = None;
        let mut is = None;
        let mut extra = Vec::new();
        for node in &element.children {
            match node {
                Node::Element(e) if e.local_name() == "v" => v = Some(e.text()),
                Node::Element(e) if e.local_name() == "f" => f = Some(e.clone()),
                Node::Element(e) if e.local_name() == "is" => is = Some(e.clone()),
                Node::Text(t) if t.trim().is_empty() => {}
                other => extra.push(other.clone()),
            }
        }

        let value = match (f, kind.as_deref()) {
            (Some(element), _) => CellValue::Formula(Formula {
                element,
                result_type: kind,
                cached: v,
            }),
            (None, Some("s")) => {
                let raw = v.unwrap_or_default();
                let index = raw.trim().parse().map_err(|_| {
                    TemplateError::Malformed(format!("bad shared string index {raw:?}"))
                })?;
                CellValue::SharedString(index)
            }
            (None, Some("inlineStr")) => CellValue::InlineString {
                text: is.as_ref().map(inline_text).unwrap_or_default(),
                markup: is,
            },
            (None, Some("b")) => CellValue::Boolean(v.as_deref().map(str::trim) == Some("1")),
            (None, Some("e")) => CellValue::Error(v.unwrap_or_default()),
            (None, Some("str")) => CellValue::Str(v.unwrap_or_default()),
            (None, None | Some("n")) => v.map_or(CellValue::Empty, CellValue::Number),
            (None, Some(other)) => CellValue::Raw {
                kind: other.to_string(),
                value: v.unwrap_or_default(),
            },
        };

        Ok(Self {
            col,
            style,
            value,
            attributes,
            extra,
        })
    }

    fn to_element(&self, row: u32, names: &Names) -> Element {
        let mut c = Element::new(names.c.clone())
            .with_attr("r", format!("{}{row}", index_to_column(self.col)));
        if let Some(style) = &self.style {
            c.set_attr("s", style.as_str());
        }

        let text_child = |local: &str, text: &str| {
            let mut e = Element::new(names.qualify(local));
            e.set_text(text);
            e
        };

        match &self.value {
            CellValue::Empty => {}
            CellValue::SharedString(index) => {
                c.set_attr("t", "s");
                c.push_child(text_child("v", &index.to_string()));
            }
            CellValue::InlineString { text, markup } => {
                c.set_attr("t", "inlineStr");
                let is = match markup {
                    Some(markup) => markup.clone(),
                    None => {
                        let mut is = Element::new(names.qualify("is"));
                        let mut t = text_child("t", text);
                        if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
                            t.set_attr("xml:space", "preserve");
                        }
                        is.push_child(t);
                        is
                    }
                };
                c.push_child(is);
            }
            CellValue::Number(n) => c.push_child(text_child("v", n)),
            CellValue::Boolean(b) => {
                c.set_attr("t", "b");
                c.push_child(text_child("v", if *b { "1" } else { "0" }));
            }
            CellValue::Error(e) => {
                c.set_attr("t", "e");
                c.push_child(text_child("v", e));
            }
            CellValue::Str(s) => {
                c.set_attr("t", "str");
                c.push_child(text_child("v", s));
            }
            CellValue::Raw { kind, value } => {
                c.set_attr("t", kind.as_str());
                c.push_child(text_child("v", value));
            }
            CellValue::Formula(formula) => {
                if let (Some(kind), Some(_)) = (&formula.result_type, &formula.cached) {
                    c.set_attr("t", kind.as_str());
                }
                c.push_child(formula.element.clone());
                if let Some(cached) = &formula.cached {
                    c.push_child(text_child("v", cached));
                }
            }
        }

        for (key, value) in &self.attributes {
            c.set_attr(key, value.as_str());
        }
        c.children.extend(self.extra.iter().cloned());
        c
    }
}

/// Visible text of an `<is>` element (plain or rich runs).
fn inline_text(is: &Element) -> String {
    let mut text = String::new();
    for child in is.elements() {
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

// ── Rows ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Row {
    pub(crate) number: u32,
    pub(crate) cells: Vec<Cell>,
    /// Attributes other than `r` (height, style, spans, ...).
    attributes: Vec<(String, String)>,
    extra: Vec<Node>,
}

impl Row {
    pub(crate) fn new(number: u32) -> Self {
        Self {
            number,
            cells: Vec::new(),
            attributes: Vec::new(),
            extra: Vec::new(),
        }
    }

    /// An empty row at `number` carrying this row's attributes.
    pub(crate) fn styled_like(&self, number: u32) -> Self {
        Self {
            number,
            cells: Vec::new(),
            attributes: self.attributes.clone(),
            extra: Vec::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn cell(&self, col: u32) -> Option<&Cell> {
        self.cells.iter().find(|c| c.col == col)
    }

    /// Insert or replace the cell at `cell.col`.
    pub(crate) fn put(&mut self, cell: Cell) {
        match self.cells.iter_mut().find(|c| c.col == cell.col) {
            Some(existing) => *existing = cell,
            None => self.cells.push(cell),
        }
    }

    pub(crate) fn sort(&mut self) {
        self.cells.sort_by_key(|c| c.col);
    }

    fn parse(element: &Element, fallback_number: u32) -> Result<Self> {
        let number = match element.attr("r") {
            Some(r) => r
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| TemplateError::Malformed(format!("bad row number {r:?}")))?,
            None => fallback_number,
        };

        let attributes = element
            .attributes
            .iter()
            .filter(|(k, _)| k != "r")
            .cloned()
            .collect();

        let mut cells: Vec<Cell> = Vec::new();
        let mut extra = Vec::new();
        for node in &element.children {
            match node {
                Node::Element(e) if e.local_name() == "c" => {
                    let fallback_col = cells.last().map_or(1, |c| c.col + 1);
                    cells.push(Cell::parse(e, number, fallback_col)?);
                }
                Node::Text(t) if t.trim().is_empty() => {}
                other => extra.push(other.clone()),
            }
        }

        Ok(Self {
            number,
            cells,
            attributes,
            extra,
        })
    }

    fn to_element(&self, names: &Names) -> Element {
        let mut row = Element::new(names.row.clone()).with_attr("r", self.number.to_string());
        for (key, value) in &self.attributes {
            row.set_attr(key, value.as_str());
        }
        if let Some(spans) = self.spans() {
            row.set_attr("spans", spans);
        }
        for cell in &self.cells {
            row.push_child(cell.to_element(self.number, names));
        }
        row.children.extend(self.extra.iter().cloned());
        row
    }

    /// Existing `spans` widened to cover the cells actually present.
    fn spans(&self) -> Option<String> {
        let declared = self.attributes.iter().find(|(k, _)| k == "spans")?;
        let first = self.cells.iter().map(|c| c.col).min()?;
        let last = self.cells.iter().map(|c| c.col).max()?;
        let (lo, hi) = declared
            .1
            .split_once(':')
            .and_then(|(a, b)| Some((a.parse::<u32>().ok()?, b.parse::<u32>().ok()?)))
            .map_or((first, last), |(a, b)| (a.min(first), b.max(last)));
        Some(format!("{lo}:{hi}"))
    }
}

// ── Hyperlinks ─────────────────────────────────────────────────────

/// A `<hyperlink>` anchor.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Hyperlink {
    /// `None` when the `ref` attribute does not parse; such anchors are
    /// written back untouched.
    pub(crate) range: Option<RangeRef>,
    element: Element,
}

impl Hyperlink {
    /// Relationship id (`r:id`) naming the external target, if any.
    pub(crate) fn rel_id(&self) -> Option<&str> {
        self.element
            .attributes
            .iter()
            .find(|(k, _)| k.ends_with(":id"))
            .map(|(_, v)| v.as_str())
    }
}

// ── Element names ──────────────────────────────────────────────────

/// Qualified names for new elements, honoring the part's prefix.
struct Names {
    prefix: Option<String>,
    row: String,
    c: String,
}

impl Names {
    fn for_root(root: &Element) -> Self {
        let prefix = root.name.split_once(':').map(|(p, _)| p.to_string());
        let mut names = Self {
            prefix,
            row: String::new(),
            c: String::new(),
        };
        names.row = names.qualify("row");
        names.c = names.qualify("c");
        names
    }

    fn qualify(&self, local: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{local}"),
            None => local.to_string(),
        }
    }
}

/// Elements that follow `<mergeCells>` in the worksheet schema.
const AFTER_MERGE_CELLS: &[&str] = &[
    "phoneticPr",
    "conditionalFormatting",
    "dataValidations",
    "hyperlinks",
    "printOptions",
    "pageMargins",
    "pageSetup",
    "headerFooter",
    "rowBreaks",
    "colBreaks",
    "customProperties",
    "cellWatches",
    "ignoredErrors",
    "smartTags",
    "drawing",
    "legacyDrawing",
    "legacyDrawingHF",
    "drawingHF",
    "picture",
    "oleObjects",
    "controls",
    "webPublishItems",
    "tableParts",
    "extLst",
];

// ── Worksheet ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub(crate) struct Worksheet {
    /// The part with `<sheetData>` rows, merges and hyperlinks lifted out.
    document: Document,
    pub(crate) rows: Vec<Row>,
    pub(crate) dimension: Option<RangeRef>,
    pub(crate) merges: Vec<RangeRef>,
    pub(crate) hyperlinks: Vec<Hyperlink>,
}

impl Worksheet {
    pub(crate) fn parse(xml: &str) -> Result<Self> {
        let mut document = Document::parse(xml)?;
        let root = &mut document.root;

        let dimension = root
            .child("dimension")
            .and_then(|d| d.attr("ref"))
            .and_then(RangeRef::parse);

        let sheet_data = root
            .child_mut("sheetData")
            .ok_or_else(|| TemplateError::Malformed("worksheet has no <sheetData>".into()))?;
        let mut rows: Vec<Row> = Vec::new();
        for node in std::mem::take(&mut sheet_data.children) {
            if let Node::Element(e) = node {
                if e.local_name() == "row" {
                    let fallback = rows.last().map_or(1, |r| r.number + 1);
                    rows.push(Row::parse(&e, fallback)?);
                }
            }
        }

        let mut merges = Vec::new();
        if let Some(container) = root.child_mut("mergeCells") {
            for node in std::mem::take(&mut container.children) {
                if let Node::Element(e) = node {
                    let r = e.attr("ref").unwrap_or_default();
                    let range = RangeRef::parse(r).ok_or_else(|| {
                        TemplateError::Malformed(format!("bad merged range {r:?}"))
                    })?;
                    merges.push(range);
                }
            }
        }

        let mut hyperlinks = Vec::new();
        if let Some(container) = root.child_mut("hyperlinks") {
            for node in std::mem::take(&mut container.children) {
                if let Node::Element(element) = node {
                    let range = element.attr("ref").and_then(RangeRef::parse);
                    hyperlinks.push(Hyperlink { range, element });
                }
            }
        }

        Ok(Self {
            document,
            rows,
            dimension,
            merges,
            hyperlinks,
        })
    }

    #[cfg(test)]
    pub(crate) fn row(&self, number: u32) -> Option<&Row> {
        self.rows.iter().find(|r| r.number == number)
    }

    pub(crate) fn row_mut(&mut self, number: u32) -> Option<&mut Row> {
        self.rows.iter_mut().find(|r| r.number == number)
    }

    #[cfg(test)]
    pub(crate) fn cell(&self, at: CellRef) -> Option<&Cell> {
        self.row(at.row)?.cell(at.col)
    }

    /// Sort rows by number and each row's cells by column.
    pub(crate) fn sort(&mut self) {
        self.rows.sort_by_key(|r| r.number);
        for row in &mut self.rows {
            row.sort();
        }
    }

    /// Bounding rectangle of populated cells, `A1` for an empty sheet.
    pub(crate) fn compute_dimension(&self) -> RangeRef {
        self.rows
            .iter()
            .flat_map(|row| {
                row.cells
                    .iter()
                    .filter(|c| c.is_populated())
                    .map(move |c| RangeRef::single(CellRef::new(row.number, c.col)))
            })
            .reduce(RangeRef::union)
            .unwrap_or_else(|| RangeRef::single(CellRef::new(1, 1)))
    }

    /// Qualified name for a new `<f>` element in this part.
    pub(crate) fn formula_name(&self) -> String {
        Names::for_root(&self.document.root).qualify("f")
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut document = self.document.clone();
        let root = &mut document.root;
        let names = Names::for_root(root);

        if let Some(dimension) = self.dimension {
            match root.child_mut("dimension") {
                Some(d) => d.set_attr("ref", dimension.to_string()),
                None => {
                    let at = root.position("sheetPr").map_or(0, |i| i + 1);
                    let d = Element::new(names.qualify("dimension"))
                        .with_attr("ref", dimension.to_string());
                    root.insert_child(at, d);
                }
            }
        }

        if let Some(sheet_data) = root.child_mut("sheetData") {
            for row in &self.rows {
                sheet_data.push_child(row.to_element(&names));
            }
        }

        if self.merges.is_empty() {
            root.remove_children("mergeCells");
        } else {
            if root.position("mergeCells").is_none() {
                let at = root
                    .children
                    .iter()
                    .position(|n| {
                        matches!(n, Node::Element(e) if AFTER_MERGE_CELLS.contains(&e.local_name()))
                    })
                    .unwrap_or(root.children.len());
                root.insert_child(at, Element::new(names.qualify("mergeCells")));
            }
            if let Some(container) = root.child_mut("mergeCells") {
                container.set_attr("count", self.merges.len().to_string());
                for merge in &self.merges {
                    container.push_child(
                        Element::new(names.qualify("mergeCell")).with_attr("ref", merge.to_string()),
                    );
                }
            }
        }

        if let Some(container) = root.child_mut("hyperlinks") {
            for link in &self.hyperlinks {
                let mut element = link.element.clone();
                if let Some(range) = link.range {
                    element.set_attr("ref", range.to_string());
                }
                container.push_child(element);
            }
        }

        document.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheetPr/><dimension ref="B2:D4"/><sheetData><row r="2" spans="2:3" ht="20" customHeight="1"><c r="B2" s="1" t="s"><v>0</v></c><c r="C2"><v>3.5</v></c></row><row r="4"><c r="B4" t="b"><v>1</v></c><c r="C4" t="str"><f>A1&amp;B1</f><v>cached</v></c><c r="D4" t="inlineStr"><is><t>inline</t></is></c></row></sheetData><mergeCells count="1"><mergeCell ref="B2:C2"/></mergeCells><hyperlinks><hyperlink ref="B4" r:id="rId1"/></hyperlinks><pageMargins left="0.7"/></worksheet>"#;

    fn sheet() -> Worksheet {
        Worksheet::parse(SHEET).unwrap()
    }

    fn output(ws: &Worksheet) -> String {
        String::from_utf8(ws.to_bytes().unwrap()).unwrap()
    }

    fn at(s: &str) -> CellRef {
        CellRef::parse(s).unwrap()
    }

    // ── parse ────────────────────────────────────────────────────

    #[test]
    fn parse_typed_fields() {
        let ws = sheet();
        assert_eq!(ws.dimension, RangeRef::parse("B2:D4"));
        assert_eq!(ws.merges, vec![RangeRef::parse("B2:C2").unwrap()]);
        assert_eq!(ws.hyperlinks.len(), 1);
        assert_eq!(ws.hyperlinks[0].rel_id(), Some("rId1"));
        assert_eq!(ws.rows.len(), 2);
    }

    #[test]
    fn parse_cell_values() {
        let ws = sheet();
        assert_eq!(ws.cell(at("B2")).unwrap().value, CellValue::SharedString(0));
        assert_eq!(ws.cell(at("B2")).unwrap().style.as_deref(), Some("1"));
        assert_eq!(ws.cell(at("C2")).unwrap().value, CellValue::Number("3.5".into()));
        assert_eq!(ws.cell(at("B4")).unwrap().value, CellValue::Boolean(true));
        match &ws.cell(at("C4")).unwrap().value {
            CellValue::Formula(f) => {
                assert_eq!(f.text(), "A1&B1");
                assert_eq!(f.cached.as_deref(), Some("cached"));
            }
            other => panic!("expected formula, got {other:?}"),
        }
        match &ws.cell(at("D4")).unwrap().value {
            CellValue::InlineString { text, .. } => assert_eq!(text, "inline"),
            other => panic!("expected inline string, got {other:?}"),
        }
    }

    #[test]
    fn parse_missing_references() {
        let ws = Worksheet::parse(
            r#"<worksheet><sheetData><row><c><v>1</v></c><c><v>2</v></c></row><row><c r="C2"/></row></sheetData></worksheet>"#,
        )
        .unwrap();
        assert_eq!(ws.rows[0].number, 1);
        assert_eq!(ws.rows[0].cells[1].col, 2);
        assert_eq!(ws.rows[1].number, 2);
        assert_eq!(ws.dimension, None);
    }

    #[test]
    fn parse_rejects_misfiled_cell() {
        let err = Worksheet::parse(
            r#"<worksheet><sheetData><row r="1"><c r="A2"/></row></sheetData></worksheet>"#,
        );
        assert!(matches!(err, Err(TemplateError::Malformed(_))));
    }

    #[test]
    fn parse_requires_sheet_data() {
        assert!(Worksheet::parse("<worksheet/>").is_err());
    }

    // ── to_bytes ─────────────────────────────────────────────────

    #[test]
    fn write_round_trips_unchanged_sheet() {
        assert_eq!(output(&sheet()), SHEET);
    }

    #[test]
    fn write_formula_without_cache_drops_type() {
        let mut ws = sheet();
        if let CellValue::Formula(f) = &mut ws.row_mut(4).unwrap().cells[1].value {
            f.cached = None;
        }
        let xml = output(&ws);
        assert!(xml.contains(r#"<c r="C4"><f>A1&amp;B1</f></c>"#));
    }

    #[test]
    fn write_widens_spans_and_keeps_row_attributes() {
        let mut ws = sheet();
        ws.row_mut(2)
            .unwrap()
            .put(Cell::new(5, None, CellValue::Number("1".into())));
        let xml = output(&ws);
        assert!(xml.contains(r#"<row r="2" spans="2:5" ht="20" customHeight="1">"#));
    }

    #[test]
    fn write_inserts_missing_dimension_after_sheet_pr() {
        let mut ws = Worksheet::parse(
            r#"<worksheet><sheetPr/><sheetData><row r="3"><c r="B3"><v>1</v></c></row></sheetData></worksheet>"#,
        )
        .unwrap();
        ws.dimension = Some(ws.compute_dimension());
        assert_eq!(
            output(&ws),
            r#"<worksheet><sheetPr/><dimension ref="B3"/><sheetData><row r="3"><c r="B3"><v>1</v></c></row></sheetData></worksheet>"#
        );
    }

    #[test]
    fn write_drops_empty_merge_container() {
        let mut ws = sheet();
        ws.merges.clear();
        assert!(!output(&ws).contains("mergeCells"));
    }

    #[test]
    fn write_inserts_merge_container_in_schema_order() {
        let mut ws = Worksheet::parse(
            r#"<worksheet><sheetData/><pageMargins left="0.7"/></worksheet>"#,
        )
        .unwrap();
        ws.merges.push(RangeRef::parse("A1:B1").unwrap());
        assert_eq!(
            output(&ws),
            r#"<worksheet><sheetData/><mergeCells count="1"><mergeCell ref="A1:B1"/></mergeCells><pageMargins left="0.7"/></worksheet>"#
        );
    }

    #[test]
    fn write_moved_hyperlink() {
        let mut ws = sheet();
        ws.hyperlinks[0].range = RangeRef::parse("B6");
        assert!(output(&ws).contains(r#"<hyperlink ref="B6" r:id="rId1"/>"#));
    }

    // ── dimension ────────────────────────────────────────────────

    #[test]
    fn dimension_counts_styled_cells() {
        let mut ws = sheet();
        ws.row_mut(4)
            .unwrap()
            .put(Cell::new(7, Some("2".into()), CellValue::Empty));
        assert_eq!(ws.compute_dimension(), RangeRef::parse("B2:G4").unwrap());
    }

    #[test]
    fn dimension_of_empty_sheet() {
        let ws = Worksheet::parse("<worksheet><sheetData/></worksheet>").unwrap();
        assert_eq!(ws.compute_dimension().to_string(), "A1");
    }
}
