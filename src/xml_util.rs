//! Package plumbing shared by the part loaders: relationship files,
//! `_rels` paths, target resolution and `[Content_Types].xml` overrides.

use crate::error::Result;
use crate::xml_tree::{Document, Element, Node};

pub(crate) const REL_SHARED_STRINGS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";
pub(crate) const CT_SHARED_STRINGS: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml";

// ── Relationships ──────────────────────────────────────────────────

/// A borrowed view of one `<Relationship>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Relationship<'a> {
    pub(crate) id: &'a str,
    pub(crate) rel_type: &'a str,
    pub(crate) target: &'a str,
    pub(crate) external: bool,
}

impl Relationship<'_> {
    /// Whether `Type` names the given kind (`.../relationships/<kind>`).
    pub(crate) fn is(&self, kind: &str) -> bool {
        type_is(self.rel_type, kind)
    }

    /// Package path of the target, resolved against `owner_part`. `None`
    /// for external targets, which live outside the package.
    pub(crate) fn part_path(&self, owner_part: &str) -> Option<String> {
        (!self.external).then(|| resolve_target(owner_part, self.target))
    }
}

fn type_is(rel_type: &str, kind: &str) -> bool {
    rel_type.rsplit_once('/').is_some_and(|(_, tail)| tail == kind)
}

/// An editable `.rels` part.
#[derive(Debug, Clone)]
pub(crate) struct Relationships {
    document: Document,
}

impl Relationships {
    pub(crate) fn parse(xml: &str) -> Result<Self> {
        Ok(Self {
            document: Document::parse(xml)?,
        })
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = Relationship<'_>> {
        self.document
            .root
            .children_named("Relationship")
            .filter_map(|e| {
                Some(Relationship {
                    id: e.attr("Id")?,
                    rel_type: e.attr("Type").unwrap_or_default(),
                    target: e.attr("Target")?,
                    external: e
                        .attr("TargetMode")
                        .is_some_and(|m| m.eq_ignore_ascii_case("External")),
                })
            })
    }

    pub(crate) fn get(&self, id: &str) -> Option<Relationship<'_>> {
        self.iter().find(|r| r.id == id)
    }

    /// Replace the `Target` of relationship `id`. Returns whether it exists.
    pub(crate) fn set_target(&mut self, id: &str, target: &str) -> bool {
        match self
            .document
            .root
            .children_named_mut("Relationship")
            .find(|e| e.attr("Id") == Some(id))
        {
            Some(e) => {
                e.set_attr("Target", target);
                true
            }
            None => false,
        }
    }

    /// Append a relationship under a fresh `rIdN` and return that id.
    pub(crate) fn push(&mut self, rel_type: &str, target: &str) -> String {
        let mut n = self.iter().count() + 1;
        let id = loop {
            let candidate = format!("rId{n}");
            if self.get(&candidate).is_none() {
                break candidate;
            }
            n += 1;
        };
        let root = &mut self.document.root;
        let element = Element::new(root.child_name("Relationship"))
            .with_attr("Id", id.as_str())
            .with_attr("Type", rel_type)
            .with_attr("Target", target);
        root.push_child(element);
        id
    }

    /// Drop every relationship of the given kind. Returns how many went.
    pub(crate) fn remove_kind(&mut self, kind: &str) -> usize {
        let before = self.iter().count();
        self.document.root.children.retain(|node| match node {
            Node::Element(e) if e.local_name() == "Relationship" => {
                !type_is(e.attr("Type").unwrap_or_default(), kind)
            }
            _ => true,
        });
        before - self.iter().count()
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        self.document.to_bytes()
    }
}

// ── Paths ──────────────────────────────────────────────────────────

/// Compute the `_rels` file path for a given OOXML part path.
///
/// For `xl/worksheets/sheet1.xml`, returns `xl/worksheets/_rels/sheet1.xml.rels`.
pub(crate) fn rels_path(part_path: &str) -> String {
    if let Some((dir, file)) = part_path.rsplit_once('/') {
        format!("{dir}/_rels/{file}.rels")
    } else {
        format!("_rels/{part_path}.rels")
    }
}

/// Resolve a relationship target against the part that owns it.
///
/// `("xl/worksheets/sheet1.xml", "../tables/table1.xml")` →
/// `"xl/tables/table1.xml"`. Absolute targets (`/xl/...`) are rooted at the
/// package.
pub(crate) fn resolve_target(owner_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return normalize_zip_path(absolute);
    }
    match owner_part.rsplit_once('/') {
        Some((dir, _)) => normalize_zip_path(&format!("{dir}/{target}")),
        None => normalize_zip_path(target),
    }
}

/// Normalize a ZIP path by resolving `..` segments.
///
/// `"ppt/slides/../media/image1.png"` → `"ppt/media/image1.png"`
fn normalize_zip_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        if segment == ".." {
            parts.pop();
        } else if !segment.is_empty() && segment != "." {
            parts.push(segment);
        }
    }
    parts.join("/")
}

// ── Content types ──────────────────────────────────────────────────

/// Add an `<Override>` for `part` unless one exists.
pub(crate) fn add_override(types: &mut Document, part: &str, content_type: &str) {
    let part_name = format!("/{part}");
    let root = &mut types.root;
    if root
        .children_named("Override")
        .any(|e| e.attr("PartName") == Some(part_name.as_str()))
    {
        return;
    }
    let element = Element::new(root.child_name("Override"))
        .with_attr("PartName", part_name)
        .with_attr("ContentType", content_type);
    root.push_child(element);
}

/// Remove the `<Override>` for `part`. Returns whether one was present.
pub(crate) fn remove_override(types: &mut Document, part: &str) -> bool {
    let part_name = format!("/{part}");
    let before = types.root.children.len();
    types.root.children.retain(|node| {
        !matches!(node, Node::Element(e)
            if e.local_name() == "Override" && e.attr("PartName") == Some(part_name.as_str()))
    });
    types.root.children.len() != before
}
