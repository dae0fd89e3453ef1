//! Error types for xlsx-template.
//!
//! Provides a single [`TemplateError`] enum shared by the package loader,
//! the substitution engine and the command-line front end.

use crate::reference::RangeRef;

/// All errors that can occur while loading, filling, or building a template.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// I/O error (file read, archive stream, output write).
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// ZIP archive error (from `zip` crate).
    #[error("{0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML syntax error in one of the package parts.
    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Malformed attribute in one of the package parts.
    #[error("xml attribute: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    /// Context data could not be parsed as JSON.
    #[error("context: {0}")]
    Json(#[from] serde_json::Error),

    /// A part the package cannot be processed without is absent.
    #[error("missing part: {0}")]
    MissingPart(String),

    /// A part is present but its content is not what the schema requires.
    #[error("malformed part: {0}")]
    Malformed(String),

    /// The requested sheet does not exist in the workbook.
    #[error("no such sheet: {0}")]
    SheetNotFound(String),

    /// Filling the sheet would push a cell past row 1048576 or column `XFD`.
    #[error("grid overflow: {0}")]
    GridOverflow(String),

    /// Moving cells right would make a merged range cover part of another.
    #[error("merged range {merge} would overlap {blocking}")]
    MergeOverlap { merge: RangeRef, blocking: RangeRef },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TemplateError>;
