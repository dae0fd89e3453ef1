//! Per-sheet substitution: resolves placeholders in cell text against a
//! context and grows the grid for list and table data.
//!
//! Rows are walked top to bottom and cells left to right in a single pass.
//! Every insertion goes through [`SheetScope::apply`] before the walk moves
//! on, so later placeholders always see the grid as it now is.

use tracing::{debug, warn};

use crate::context::{ContextValue, Path};
use crate::dateconv;
use crate::error::{Result, TemplateError};
use crate::hyperlinks;
use crate::placeholder::{self, Directive, Placeholder};
use crate::reference::{Axis, RangeRef};
use crate::shared_strings::SharedStrings;
use crate::shift::{SheetScope, Shift};
use crate::worksheet::{Cell, CellValue, Formula, Row};
use crate::xml_util::Relationships;

/// What one sheet's substitution did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Summary {
    pub(crate) placeholders: usize,
    pub(crate) rows_inserted: usize,
    pub(crate) links_rewritten: usize,
    pub(crate) dimension: RangeRef,
}

/// A row under construction below a table marker row.
struct Generated {
    row: Row,
    /// Net columns added by nested lists in this row so far.
    offset: i64,
}

/// Marker-row bookkeeping for table directives.
#[derive(Default)]
struct TableRows {
    generated: Vec<Generated>,
    /// Net columns added in the marker row by nested lists of table cells.
    offset: i64,
}

pub(crate) struct Substitution<'a> {
    scope: SheetScope<'a>,
    strings: &'a mut SharedStrings,
    context: &'a ContextValue,
    formula_name: String,
    placeholders: usize,
    rows_inserted: usize,
}

impl<'a> Substitution<'a> {
    pub(crate) fn new(
        scope: SheetScope<'a>,
        strings: &'a mut SharedStrings,
        context: &'a ContextValue,
    ) -> Self {
        let formula_name = scope.worksheet.formula_name();
        Self {
            scope,
            strings,
            context,
            formula_name,
            placeholders: 0,
            rows_inserted: 0,
        }
    }

    /// Fill the sheet, then the hyperlink targets in `rels`, then refresh
    /// the dimension.
    ///
    /// Stops at the first insertion that does not fit the sheet. The sheet
    /// is then partly filled and the caller has to discard it.
    pub(crate) fn run(mut self, rels: Option<&mut Relationships>) -> Result<Summary> {
        let worksheet = &mut *self.scope.worksheet;
        worksheet.sort();
        for cell in worksheet.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
            if let CellValue::Formula(formula) = &mut cell.value {
                formula.cached = None;
            }
        }

        let mut index = 0;
        while index < self.scope.worksheet.rows.len() {
            let number = self.scope.worksheet.rows[index].number;
            let generated = self.process_row(index)?;
            index += 1;
            if generated.is_empty() {
                continue;
            }

            let n = generated.len();
            self.scope.apply(Shift::rows(number, n))?;
            let rows = &mut self.scope.worksheet.rows;
            for (k, mut g) in generated.into_iter().enumerate() {
                g.row.sort();
                rows.insert(index + k, g.row);
            }
            debug!(row = number, inserted = n, "table rows inserted");
            index += n;
            self.rows_inserted += n;
        }

        let links_rewritten = rels.map_or(0, |rels| hyperlinks::substitute_all(rels, self.context));

        let dimension = self.scope.worksheet.compute_dimension();
        self.scope.worksheet.dimension = Some(dimension);

        Ok(Summary {
            placeholders: self.placeholders,
            rows_inserted: self.rows_inserted,
            links_rewritten,
            dimension,
        })
    }

    /// Process every cell of `rows[index]`. Returns the rows its table
    /// directives generated, not yet placed in the sheet.
    fn process_row(&mut self, index: usize) -> Result<Vec<Generated>> {
        let mut tables = TableRows::default();
        let mut i = 0;
        while let Some(cell) = self.scope.worksheet.rows[index].cells.get(i) {
            let Some(text) = self.cell_text(cell) else {
                i += 1;
                continue;
            };
            let found = placeholder::parse(&text);
            match found.as_slice() {
                [] => i += 1,
                [token] if token.full => {
                    self.placeholders += 1;
                    i += match token.directive {
                        Directive::Value => self.full_value(index, i, &token.path)?,
                        Directive::Table => self.table_cell(index, i, &token.path, &mut tables)?,
                    };
                }
                tokens => {
                    self.placeholders += tokens.len();
                    self.partial(index, i, &text, tokens);
                    i += 1;
                }
            }
        }
        Ok(tables.generated)
    }

    fn cell_text(&self, cell: &Cell) -> Option<String> {
        match &cell.value {
            CellValue::SharedString(i) => self.strings.get(*i).map(str::to_string),
            CellValue::InlineString { text, .. } => Some(text.clone()),
            _ => None,
        }
    }

    /// `${path}` as the whole cell. Returns how many cells it now occupies.
    fn full_value(&mut self, index: usize, i: usize, path: &Path) -> Result<usize> {
        let context = self.context;
        match context.resolve(path) {
            Some(ContextValue::List(items)) => self.expand_list(index, i, items),
            value => {
                if value.is_none() {
                    debug!(%path, "unresolved placeholder, clearing cell");
                }
                let mut cell = self.scope.worksheet.rows[index].cells[i].clone();
                self.fill(&mut cell, value);
                self.scope.worksheet.rows[index].cells[i] = cell;
                Ok(1)
            }
        }
    }

    /// Spread `items` across the row starting at cell `i`, shifting the
    /// cells after it. Returns how many cells the list now occupies.
    fn expand_list(&mut self, index: usize, i: usize, items: &[ContextValue]) -> Result<usize> {
        let number = self.scope.worksheet.rows[index].number;
        let template = self.scope.worksheet.rows[index].cells[i].clone();

        if items.is_empty() {
            debug!(row = number, col = template.col, "empty list, collapsing cell");
            self.scope.worksheet.rows[index].cells.remove(i);
            self.scope.apply(Shift::collapse(number, template.col))?;
            return Ok(0);
        }
        if items.len() > 1 {
            self.scope.apply(Shift::columns(number, template.col, items.len() - 1))?;
        }

        let mut cells = Vec::with_capacity(items.len());
        for (k, item) in items.iter().enumerate() {
            let mut cell = if k == 0 {
                template.clone()
            } else {
                template.styled_like(step(Axis::Column, template.col, offset(k))?)
            };
            self.fill(&mut cell, Some(item));
            cells.push(cell);
        }
        self.scope.worksheet.rows[index].cells.splice(i..=i, cells);
        Ok(items.len())
    }

    /// `${table:path}` as the whole cell. Element 0 stays in the marker
    /// row; the rest go to the generated rows shared by the row's table
    /// cells. Returns how many marker-row cells it now occupies.
    fn table_cell(
        &mut self,
        index: usize,
        i: usize,
        path: &Path,
        tables: &mut TableRows,
    ) -> Result<usize> {
        let context = self.context;
        let Some((items, field)) = context.find_list(path) else {
            debug!(%path, "table placeholder does not name a list, clearing cell");
            self.scope.worksheet.rows[index].cells[i].value = CellValue::Empty;
            return Ok(1);
        };
        if items.is_empty() {
            debug!(%path, "empty table, clearing marker cell");
            self.scope.worksheet.rows[index].cells[i].value = CellValue::Empty;
            return Ok(1);
        }

        let marker = &self.scope.worksheet.rows[index];
        let number = marker.number;
        let template = marker.cells[i].clone();

        for (k, item) in items.iter().enumerate().skip(1) {
            if tables.generated.len() < k {
                let row = self.scope.worksheet.rows[index].styled_like(step(Axis::Row, number, offset(k))?);
                tables.generated.push(Generated { row, offset: 0 });
            }
            let g = &mut tables.generated[k - 1];
            let col = step(Axis::Column, template.col, g.offset - tables.offset)?;
            match item.resolve(&field) {
                Some(ContextValue::List(values)) => {
                    for (n, value) in values.iter().enumerate() {
                        let mut cell = template.styled_like(step(Axis::Column, col, offset(n))?);
                        self.fill(&mut cell, Some(value));
                        g.row.put(cell);
                    }
                    g.offset += offset(values.len()) - 1;
                }
                value => {
                    let mut cell = template.styled_like(col);
                    self.fill(&mut cell, value);
                    g.row.put(cell);
                }
            }
        }

        match items[0].resolve(&field) {
            Some(ContextValue::List(values)) => {
                tables.offset += offset(values.len()) - 1;
                self.expand_list(index, i, values)
            }
            value => {
                let mut cell = template;
                self.fill(&mut cell, value);
                self.scope.worksheet.rows[index].cells[i] = cell;
                Ok(1)
            }
        }
    }

    /// Placeholders embedded in longer text: splice their text in.
    fn partial(&mut self, index: usize, i: usize, text: &str, tokens: &[Placeholder]) {
        let context = self.context;
        let rendered = placeholder::interpolate(text, tokens, |token| {
            Some(match token.directive {
                Directive::Table => {
                    warn!(path = %token.path, "table placeholder inside longer text, dropping it");
                    String::new()
                }
                Directive::Value => context.resolve(&token.path).map_or_else(
                    || {
                        debug!(path = %token.path, "unresolved placeholder");
                        String::new()
                    },
                    ContextValue::to_text,
                ),
            })
        });

        let cell = &mut self.scope.worksheet.rows[index].cells[i];
        cell.value = match cell.value {
            CellValue::InlineString { .. } => CellValue::InlineString {
                text: rendered,
                markup: None,
            },
            _ => CellValue::SharedString(self.strings.intern(&rendered)),
        };
    }

    /// Write a resolved value into `cell`, keeping its style.
    fn fill(&mut self, cell: &mut Cell, value: Option<&ContextValue>) {
        cell.value = match value {
            Some(ContextValue::Number(n)) => number(*n),
            Some(ContextValue::Date(d)) => number(dateconv::date_to_serial(*d)),
            Some(ContextValue::Bool(b)) => CellValue::Boolean(*b),
            Some(ContextValue::Text(s)) => match s.strip_prefix('=').filter(|f| !f.is_empty()) {
                Some(formula) => CellValue::Formula(Formula::new(self.formula_name.clone(), formula)),
                None => CellValue::SharedString(self.strings.intern(s)),
            },
            Some(ContextValue::Null | ContextValue::List(_) | ContextValue::Record(_)) | None => {
                CellValue::Empty
            }
        };
    }
}

fn number(n: f64) -> CellValue {
    if n.is_finite() {
        CellValue::Number(dateconv::format_number(n))
    } else {
        CellValue::Error("#NUM!".to_string())
    }
}

fn offset(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// `base + delta` on `axis`, which has to stay on the sheet.
fn step(axis: Axis, base: u32, delta: i64) -> Result<u32> {
    let moved = i64::from(base).saturating_add(delta);
    u32::try_from(moved)
        .ok()
        .filter(|m| (1..=axis.limit()).contains(m))
        .ok_or_else(|| {
            TemplateError::GridOverflow(format!(
                "{axis:?} {base} moved by {delta} lands outside 1..={}",
                axis.limit()
            ))
        })
}
