//! Table definition parts (`xl/tables/tableN.xml`).
//!
//! Only the table's `ref` and its `<autoFilter>` range are modelled; the
//! column list, styles and everything else are kept as parsed.

use crate::error::{Result, TemplateError};
use crate::reference::RangeRef;
use crate::xml_tree::Document;

#[derive(Debug, Clone)]
pub(crate) struct Table {
    /// Package path of this part.
    pub(crate) path: String,
    /// Package path of the worksheet that owns the table.
    pub(crate) sheet_path: String,
    document: Document,
    pub(crate) range: RangeRef,
    pub(crate) autofilter: Option<RangeRef>,
    pub(crate) dirty: bool,
}

impl Table {
    pub(crate) fn parse(path: &str, sheet_path: &str, xml: &str) -> Result<Self> {
        let document = Document::parse(xml)?;
        let r = document.root.attr("ref").unwrap_or_default();
        let range = RangeRef::parse(r)
            .ok_or_else(|| TemplateError::Malformed(format!("{path}: bad table range {r:?}")))?;
        let autofilter = document
            .root
            .child("autoFilter")
            .and_then(|a| a.attr("ref"))
            .and_then(RangeRef::parse);

        Ok(Self {
            path: path.to_string(),
            sheet_path: sheet_path.to_string(),
            document,
            range,
            autofilter,
            dirty: false,
        })
    }

    /// `displayName`, falling back to `name`, for log messages.
    pub(crate) fn name(&self) -> &str {
        self.document
            .root
            .attr("displayName")
            .or_else(|| self.document.root.attr("name"))
            .unwrap_or_default()
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut document = self.document.clone();
        document.root.set_attr("ref", self.range.to_string());
        if let (Some(filter), Some(range)) = (document.root.child_mut("autoFilter"), self.autofilter) {
            filter.set_attr("ref", range.to_string());
        }
        document.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<table xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" id="1" name="Table1" displayName="Ages" ref="B4:C5" totalsRowShown="0"><autoFilter ref="B4:C5"/><tableColumns count="2"><tableColumn id="1" name="Name"/><tableColumn id="2" name="Age"/></tableColumns><tableStyleInfo name="TableStyleMedium2" showFirstColumn="0" showLastColumn="0" showRowStripes="1" showColumnStripes="0"/></table>"#;

    #[test]
    fn parse_ranges() {
        let table = Table::parse("xl/tables/table1.xml", "xl/worksheets/sheet1.xml", TABLE).unwrap();
        assert_eq!(table.range, RangeRef::parse("B4:C5").unwrap());
        assert_eq!(table.autofilter, RangeRef::parse("B4:C5"));
        assert_eq!(table.name(), "Ages");
    }

    #[test]
    fn write_unchanged() {
        let table = Table::parse("t.xml", "s.xml", TABLE).unwrap();
        assert_eq!(String::from_utf8(table.to_bytes().unwrap()).unwrap(), TABLE);
    }

    #[test]
    fn write_moved_ranges() {
        let mut table = Table::parse("t.xml", "s.xml", TABLE).unwrap();
        table.range = RangeRef::parse("B4:C7").unwrap();
        table.autofilter = RangeRef::parse("B4:C6");
        let xml = String::from_utf8(table.to_bytes().unwrap()).unwrap();
        assert!(xml.contains(r#"ref="B4:C7" totalsRowShown="0"><autoFilter ref="B4:C6"/>"#));
    }

    #[test]
    fn parse_rejects_bad_range() {
        let xml = TABLE.replace(r#"ref="B4:C5" total"#, r#"ref="nope" total"#);
        assert!(Table::parse("t.xml", "s.xml", &xml).is_err());
    }
}
