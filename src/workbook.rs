//! Workbook part (`xl/workbook.xml`): sheet order, defined names and the
//! calculation properties.

use tracing::debug;

use crate::error::{Result, TemplateError};
use crate::reference::NameTarget;
use crate::xml_tree::{Document, Element, Node};
use crate::xml_util::Relationships;

/// Elements that follow `<calcPr>` in the workbook schema.
const AFTER_CALC_PR: &[&str] = &[
    "oleSize",
    "customWorkbookViews",
    "pivotCaches",
    "smartTagPr",
    "smartTagTypes",
    "webPublishing",
    "fileRecoveryPr",
    "webPublishObjects",
    "extLst",
];

/// One `<sheet>` in workbook order.
#[derive(Debug, Clone)]
pub(crate) struct SheetEntry {
    pub(crate) name: String,
    /// Package path of the worksheet part; `None` for chart and dialog
    /// sheets, which have no grid.
    pub(crate) path: Option<String>,
}

/// One `<definedName>`.
#[derive(Debug, Clone)]
pub(crate) struct DefinedName {
    pub(crate) name: String,
    /// `localSheetId`: 0-based position of the sheet the name is scoped to.
    pub(crate) local_sheet_id: Option<usize>,
    /// Parsed target; `None` for formulas and other complex targets, which
    /// are written back untouched.
    pub(crate) target: Option<NameTarget>,
}

impl DefinedName {
    /// Whether this name points into the sheet at `index` named `sheet`.
    pub(crate) fn refers_to(&self, sheet: &str, index: usize) -> bool {
        let Some(target) = &self.target else {
            return false;
        };
        match target.sheet() {
            Some(prefix) => prefix == sheet,
            None => self.local_sheet_id == Some(index),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Workbook {
    document: Document,
    pub(crate) sheets: Vec<SheetEntry>,
    pub(crate) names: Vec<DefinedName>,
    full_calc_on_load: bool,
}

impl Workbook {
    /// Parse `xl/workbook.xml`, resolving sheet parts through `rels`
    /// (`xl/_rels/workbook.xml.rels`).
    pub(crate) fn parse(xml: &str, rels: &Relationships) -> Result<Self> {
        let document = Document::parse(xml)?;
        let root = &document.root;

        let mut sheets = Vec::new();
        for sheet in root
            .child("sheets")
            .into_iter()
            .flat_map(|s| s.children_named("sheet"))
        {
            let name = sheet.attr("name").unwrap_or_default().to_string();
            let rel_id = sheet
                .attributes
                .iter()
                .find(|(k, _)| k.ends_with(":id"))
                .map(|(_, v)| v.as_str())
                .ok_or_else(|| TemplateError::Malformed(format!("sheet {name:?} has no r:id")))?;
            let rel = rels.get(rel_id).ok_or_else(|| {
                TemplateError::MissingPart(format!("relationship {rel_id} for sheet {name:?}"))
            })?;
            let path = rel
                .part_path("xl/workbook.xml")
                .filter(|_| rel.is("worksheet"));
            sheets.push(SheetEntry { name, path });
        }

        let mut names = Vec::new();
        for defined in root
            .child("definedNames")
            .into_iter()
            .flat_map(|d| d.children_named("definedName"))
        {
            let name = defined.attr("name").unwrap_or_default().to_string();
            let text = defined.text();
            let target = NameTarget::parse(&text);
            if target.is_none() {
                debug!(%name, target = %text, "defined name is not a simple reference, leaving it");
            }
            names.push(DefinedName {
                name,
                local_sheet_id: defined.attr("localSheetId").and_then(|v| v.parse().ok()),
                target,
            });
        }

        Ok(Self {
            document,
            sheets,
            names,
            full_calc_on_load: false,
        })
    }

    /// Ask the application to recalculate every formula on open.
    pub(crate) fn force_full_calc(&mut self) {
        self.full_calc_on_load = true;
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut document = self.document.clone();
        let root = &mut document.root;

        if let Some(container) = root.child_mut("definedNames") {
            for (element, name) in container
                .children_named_mut("definedName")
                .zip(&self.names)
            {
                if let Some(target) = &name.target {
                    element.set_text(target.to_string());
                }
            }
        }

        if self.full_calc_on_load {
            if root.position("calcPr").is_none() {
                let at = root
                    .children
                    .iter()
                    .position(|n| {
                        matches!(n, Node::Element(e) if AFTER_CALC_PR.contains(&e.local_name()))
                    })
                    .unwrap_or(root.children.len());
                root.insert_child(at, Element::new(root.child_name("calcPr")));
            }
            if let Some(calc_pr) = root.child_mut("calcPr") {
                calc_pr.set_attr("fullCalcOnLoad", "1");
            }
        }

        document.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/chartsheet" Target="chartsheets/sheet1.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/></Relationships>"#;

    const WORKBOOK: &str = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Tables" sheetId="1" r:id="rId1"/><sheet name="Chart" sheetId="2" r:id="rId2"/><sheet name="My Sheet" sheetId="3" r:id="rId3"/></sheets><definedNames><definedName name="_xlnm.Print_Area" localSheetId="0">$A$1:$D$10</definedName><definedName name="total">Tables!$B$18</definedName><definedName name="calc">SUM(Tables!$A$1:$A$3)</definedName></definedNames><calcPr calcId="145621"/></workbook>"#;

    fn workbook() -> Workbook {
        Workbook::parse(WORKBOOK, &Relationships::parse(RELS).unwrap()).unwrap()
    }

    #[test]
    fn parse_sheets_in_order() {
        let wb = workbook();
        let names: Vec<_> = wb.sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Tables", "Chart", "My Sheet"]);
        assert_eq!(wb.sheets[0].path.as_deref(), Some("xl/worksheets/sheet1.xml"));
        assert_eq!(wb.sheets[1].path, None);
        assert_eq!(wb.sheets[2].path.as_deref(), Some("xl/worksheets/sheet2.xml"));
    }

    #[test]
    fn parse_missing_relationship() {
        let rels = Relationships::parse(r#"<Relationships xmlns="urn:r"/>"#).unwrap();
        assert!(matches!(
            Workbook::parse(WORKBOOK, &rels),
            Err(TemplateError::MissingPart(_))
        ));
    }

    #[test]
    fn defined_name_scope() {
        let wb = workbook();
        assert!(wb.names[0].refers_to("Tables", 0));
        assert!(!wb.names[0].refers_to("My Sheet", 2));
        assert!(wb.names[1].refers_to("Tables", 0));
        assert!(!wb.names[1].refers_to("My Sheet", 0));
        assert!(wb.names[2].target.is_none());
        assert!(!wb.names[2].refers_to("Tables", 0));
    }

    #[test]
    fn write_updated_names_and_full_calc() {
        let mut wb = workbook();
        if let Some(target) = &mut wb.names[1].target {
            target.set_range(crate::reference::RangeRef::parse("B20").unwrap());
        }
        wb.force_full_calc();
        let xml = String::from_utf8(wb.to_bytes().unwrap()).unwrap();
        assert!(xml.contains(r#"<definedName name="total">Tables!$B$20</definedName>"#));
        assert!(xml.contains(r#"<definedName name="calc">SUM(Tables!$A$1:$A$3)</definedName>"#));
        assert!(xml.contains(r#"<calcPr calcId="145621" fullCalcOnLoad="1"/>"#));
    }

    #[test]
    fn write_inserts_calc_pr_in_schema_order() {
        let xml = WORKBOOK.replace(r#"<calcPr calcId="145621"/>"#, "<extLst/>");
        let mut wb = Workbook::parse(&xml, &Relationships::parse(RELS).unwrap()).unwrap();
        wb.force_full_calc();
        let out = String::from_utf8(wb.to_bytes().unwrap()).unwrap();
        assert!(out.ends_with(r#"</definedNames><calcPr fullCalcOnLoad="1"/><extLst/></workbook>"#));
    }

    #[test]
    fn write_untouched_without_full_calc() {
        let xml = String::from_utf8(workbook().to_bytes().unwrap()).unwrap();
        assert_eq!(xml, WORKBOOK);
    }
}
