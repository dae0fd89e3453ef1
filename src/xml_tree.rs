//! Owned XML element tree for reading, patching, and re-serializing parts.
//!
//! Every [`Element`] exclusively owns its children and nothing points back
//! to a parent. Parsing is a thin layer over `quick_xml::Reader` and
//! serialization over `quick_xml::Writer`, so markup the model does not
//! understand survives a round trip in document order.

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::Writer;

use crate::error::{Result, TemplateError};

/// A child of an [`Element`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Element(Element),
    /// Unescaped character data.
    Text(String),
    CData(String),
    /// Comments and processing instructions, written back verbatim.
    Other(Event<'static>),
}

/// An XML element: qualified name, attributes in document order, children.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Element {
    pub(crate) name: String,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) children: Vec<Node>,
}

/// A parsed part: everything before the root element plus the root itself.
#[derive(Debug, Clone)]
pub(crate) struct Document {
    prolog: Vec<Event<'static>>,
    pub(crate) root: Element,
}

impl Element {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub(crate) fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    /// Name without namespace prefix (`x:row` → `row`).
    pub(crate) fn local_name(&self) -> &str {
        self.name.rsplit_once(':').map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Qualified name for a new child, reusing this element's prefix.
    pub(crate) fn child_name(&self, local: &str) -> String {
        match self.name.split_once(':') {
            Some((prefix, _)) => format!("{prefix}:{local}"),
            None => local.to_string(),
        }
    }

    pub(crate) fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    /// Child elements in document order.
    pub(crate) fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub(crate) fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub(crate) fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.local_name() == local)
    }

    pub(crate) fn children_named_mut<'a>(
        &'a mut self,
        local: &'a str,
    ) -> impl Iterator<Item = &'a mut Element> {
        self.elements_mut().filter(move |e| e.local_name() == local)
    }

    pub(crate) fn child(&self, local: &str) -> Option<&Element> {
        self.elements().find(|e| e.local_name() == local)
    }

    pub(crate) fn child_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.local_name() == local)
    }

    /// Index in `children` of the first element with the given local name.
    pub(crate) fn position(&self, local: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|node| matches!(node, Node::Element(e) if e.local_name() == local))
    }

    pub(crate) fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub(crate) fn insert_child(&mut self, index: usize, child: Element) {
        let index = index.min(self.children.len());
        self.children.insert(index, Node::Element(child));
    }

    /// Remove every child element with the given local name.
    pub(crate) fn remove_children(&mut self, local: &str) {
        self.children
            .retain(|node| !matches!(node, Node::Element(e) if e.local_name() == local));
    }

    /// Concatenated character data of the direct children.
    pub(crate) fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(t) | Node::CData(t) => out.push_str(t),
                _ => {}
            }
        }
        out
    }

    pub(crate) fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![Node::Text(text.into())];
    }
}

impl Document {
    /// Wrap a freshly built root with the standard OOXML declaration.
    pub(crate) fn new(root: Element) -> Self {
        Self {
            prolog: vec![
                Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))),
                Event::Text(BytesText::from_escaped("\r\n")),
            ],
            root,
        }
    }

    pub(crate) fn parse(xml: &str) -> Result<Self> {
        let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut prolog = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;

        loop {
            match reader.read_event()? {
                Event::Start(ref e) => stack.push(Element::from_start(e)?),
                Event::Empty(ref e) => {
                    let element = Element::from_start(e)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| TemplateError::Malformed("unbalanced end tag".into()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(t) => match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Text(t.unescape()?.into_owned())),
                    None if root.is_none() => prolog.push(Event::Text(t.into_owned())),
                    None => {}
                },
                Event::CData(c) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                        parent.children.push(Node::CData(text));
                    }
                }
                Event::Eof => break,
                other => match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Other(other.into_owned())),
                    None if root.is_none() => prolog.push(other.into_owned()),
                    None => {}
                },
            }
        }

        if !stack.is_empty() {
            return Err(TemplateError::Malformed("unclosed element".into()));
        }
        let root = root.ok_or_else(|| TemplateError::Malformed("no root element".into()))?;
        Ok(Self { prolog, root })
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.prolog {
            writer.write_event(event.clone())?;
        }
        write_element(&mut writer, &self.root)?;
        Ok(writer.into_inner())
    }
}

/// Hand a completed element to its parent, or make it the root.
fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
    } else if root.is_none() {
        *root = Some(element);
    } else {
        return Err(TemplateError::Malformed("multiple root elements".into()));
    }
    Ok(())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(writer, e)?,
            Node::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
            Node::CData(t) => writer.write_event(Event::CData(BytesCData::new(t.as_str())))?,
            Node::Other(event) => writer.write_event(event.clone())?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(xml: &str) -> String {
        let doc = Document::parse(xml).unwrap();
        String::from_utf8(doc.to_bytes().unwrap()).unwrap()
    }

    #[test]
    fn round_trip_keeps_declaration_and_order() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="urn:x"><sheetPr/><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c></row></sheetData><pageMargins left="0.7"/></worksheet>"#;
        assert_eq!(round_trip(xml), xml);
    }

    #[test]
    fn round_trip_escapes_text_and_attributes() {
        let xml = r#"<root a="x &amp; y"><t>1 &lt; 2</t></root>"#;
        assert_eq!(round_trip(xml), xml);
    }

    #[test]
    fn round_trip_keeps_comments() {
        let xml = "<root><!-- note --><a/></root>";
        assert_eq!(round_trip(xml), xml);
    }

    #[test]
    fn parse_unescapes() {
        let doc = Document::parse(r#"<root a="&quot;q&quot;"><t>a &amp; b</t></root>"#).unwrap();
        assert_eq!(doc.root.attr("a"), Some("\"q\""));
        assert_eq!(doc.root.child("t").unwrap().text(), "a & b");
    }

    #[test]
    fn parse_rejects_unclosed() {
        assert!(Document::parse("<root><a></root>").is_err());
        assert!(Document::parse("<root>").is_err());
    }

    #[test]
    fn prefixed_names() {
        let doc = Document::parse(r#"<x:worksheet xmlns:x="urn:x"><x:sheetData/></x:worksheet>"#)
            .unwrap();
        assert_eq!(doc.root.local_name(), "worksheet");
        assert!(doc.root.child("sheetData").is_some());
        assert_eq!(doc.root.child_name("dimension"), "x:dimension");
    }

    #[test]
    fn attribute_editing() {
        let mut e = Element::new("c").with_attr("r", "A1");
        e.set_attr("t", "s");
        e.set_attr("r", "B2");
        assert_eq!(e.attributes, vec![("r".into(), "B2".into()), ("t".into(), "s".into())]);
        assert_eq!(e.attr("t"), Some("s"));
        assert_eq!(e.attr("s"), None);
    }

    #[test]
    fn child_editing() {
        let mut e = Element::new("root");
        e.push_child(Element::new("b"));
        e.insert_child(0, Element::new("a"));
        e.push_child(Element::new("b"));
        assert_eq!(e.position("b"), Some(1));
        e.remove_children("b");
        assert_eq!(e.elements().count(), 1);
    }

    #[test]
    fn child_lookup_outlives_name() {
        let doc = Document::parse(r#"<x:root xmlns:x="urn:x"><x:a n="1"/><x:b/><x:a n="2"/></x:root>"#).unwrap();
        let found = {
            let name = String::from("a");
            doc.root.child(&name)
        };
        assert_eq!(found.and_then(|a| a.attr("n")), Some("1"));
        assert!(doc.root.child("c").is_none());
    }
}
