//! `xlsx_template`: fill `.xlsx` templates from structured data.
//!
//! A template is an ordinary workbook whose cells contain `${path}` tokens.
//! [`Template::process`] resolves them against a [`ContextValue`]: scalars
//! are written in place, lists spread across columns, and `${table:path}`
//! tokens repeat their row once per list element. Merged cells, defined
//! names, tables, autofilters, hyperlinks and the sheet dimension are moved
//! to match the new layout.
//!
//! ```no_run
//! use xlsx_template::{ContextValue, Template};
//!
//! # fn main() -> xlsx_template::Result<()> {
//! let bytes = std::fs::read("report.xlsx")?;
//! let mut template = Template::load(&bytes)?;
//! let context = ContextValue::record([("title", "Quarterly")]);
//! template.process("Summary", &context)?;
//! std::fs::write("out.xlsx", template.build()?)?;
//! # Ok(())
//! # }
//! ```

#![allow(clippy::redundant_pub_crate)]

pub mod context;
mod dateconv;
pub mod error;
mod hyperlinks;
mod placeholder;
pub mod reference;
pub mod shared_strings;
mod shift;
mod substitute;
mod tables;
pub mod template;
mod workbook;
mod worksheet;
mod xml_tree;
mod xml_util;

pub use context::{ContextValue, Path};
pub use error::{Result, TemplateError};
pub use reference::{Axis, CellRef, NameTarget, RangeRef};
pub use shared_strings::SharedStrings;
pub use template::{SheetSelector, Template};
