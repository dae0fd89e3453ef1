//! Row and column insertion with shift propagation.
//!
//! A [`Shift`] says "everything on `axis` at or past `at` moves by
//! `count`". Applying it to a [`SheetScope`] updates the grid and every
//! structure that stores coordinates into it: merged ranges, hyperlink
//! anchors, shared/array formula ranges, defined names scoped to the sheet,
//! and the sheet's tables with their autofilters.
//!
//! Row shifts are sheet-wide. Column shifts only touch one row (the row a
//! list is being spread across), and only ranges that span that row.
//!
//! A shift that would push anything past the last row or column, or make
//! merged ranges overlap, is refused before the sheet is touched.

use tracing::debug;

use crate::error::{Result, TemplateError};
use crate::reference::{translate_coord, Axis, CellRef, RangeRef};
use crate::tables::Table;
use crate::workbook::DefinedName;
use crate::worksheet::{CellValue, Worksheet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Shift {
    pub(crate) axis: Axis,
    /// First coordinate that moves.
    pub(crate) at: u32,
    pub(crate) count: i32,
    /// Row a column shift is confined to; the template row for row shifts.
    pub(crate) row: u32,
}

fn to_count(count: usize) -> i32 {
    let count = i32::try_from(count).unwrap_or(i32::MAX);
    assert!(count > 0, "shift count must be positive");
    count
}

impl Shift {
    /// Make room for `count` rows directly below `template_row`.
    pub(crate) fn rows(template_row: u32, count: usize) -> Self {
        Self {
            axis: Axis::Row,
            at: template_row + 1,
            count: to_count(count),
            row: template_row,
        }
    }

    /// Make room for `count` cells right of `anchor_col` in `row`.
    pub(crate) fn columns(row: u32, anchor_col: u32, count: usize) -> Self {
        Self {
            axis: Axis::Column,
            at: anchor_col + 1,
            count: to_count(count),
            row,
        }
    }

    /// Pull the cells right of `removed_col` in `row` one column left.
    pub(crate) fn collapse(row: u32, removed_col: u32) -> Self {
        Self {
            axis: Axis::Column,
            at: removed_col + 1,
            count: -1,
            row,
        }
    }

    fn applies_to(self, range: RangeRef) -> bool {
        self.axis == Axis::Row || range.contains_row(self.row)
    }

    /// Move the endpoints of `range` that lie at or past the insertion.
    pub(crate) fn translate(self, range: RangeRef) -> RangeRef {
        if !self.applies_to(range) {
            return range;
        }
        range.translate(self.axis, self.at, self.count)
    }

    /// Like [`translate`](Self::translate), but a range whose far edge is
    /// the template row or column stretches over the inserted cells.
    pub(crate) fn translate_or_grow(self, range: RangeRef) -> RangeRef {
        if !self.applies_to(range) {
            return range;
        }
        if self.count > 0 && range.end.coord(self.axis) + 1 == self.at {
            #[allow(clippy::cast_sign_loss)] // count > 0
            return range.grow(self.axis, self.count as u32);
        }
        range.translate(self.axis, self.at, self.count)
    }
}

/// Everything a shift on one sheet has to keep consistent.
pub(crate) struct SheetScope<'a> {
    pub(crate) worksheet: &'a mut Worksheet,
    pub(crate) names: &'a mut [DefinedName],
    pub(crate) tables: Vec<&'a mut Table>,
    pub(crate) sheet_name: &'a str,
    /// 0-based position of the sheet, for `localSheetId` scoping.
    pub(crate) sheet_index: usize,
}

impl SheetScope<'_> {
    /// Move everything `shift` covers. On error nothing has changed.
    pub(crate) fn apply(&mut self, shift: Shift) -> Result<()> {
        debug!(
            sheet = self.sheet_name,
            axis = ?shift.axis,
            at = shift.at,
            count = shift.count,
            row = shift.row,
            "shift"
        );
        self.check_room(shift)?;
        let merges = self.shifted_merges(shift)?;
        self.shift_grid(shift);
        self.worksheet.merges = merges;

        for link in &mut self.worksheet.hyperlinks {
            if let Some(range) = link.range {
                link.range = Some(shift.translate(range));
            }
        }

        for name in self.names.iter_mut() {
            if !name.refers_to(self.sheet_name, self.sheet_index) {
                continue;
            }
            if let Some(target) = &mut name.target {
                let moved = shift.translate_or_grow(target.range());
                if moved != target.range() {
                    debug!(name = %name.name, to = %moved, "defined name moved");
                    target.set_range(moved);
                }
            }
        }

        for table in &mut self.tables {
            let range = shift.translate_or_grow(table.range);
            let autofilter = table.autofilter.map(|r| shift.translate_or_grow(r));
            if range != table.range || autofilter != table.autofilter {
                debug!(table = table.name(), to = %range, "table moved");
                table.range = range;
                table.autofilter = autofilter;
                table.dirty = true;
            }
        }
        Ok(())
    }

    /// Fail if an insertion would push a moving coordinate, or the inserted
    /// cells themselves, past the sheet's last row or column.
    fn check_room(&self, shift: Shift) -> Result<()> {
        let Ok(count) = u32::try_from(shift.count) else {
            return Ok(());
        };
        let axis = shift.axis;
        let ws = &*self.worksheet;

        let mut ranges: Vec<RangeRef> = ws.merges.clone();
        ranges.extend(ws.hyperlinks.iter().filter_map(|link| link.range));
        ranges.extend(
            ws.rows
                .iter()
                .flat_map(|row| &row.cells)
                .filter_map(|cell| match &cell.value {
                    CellValue::Formula(formula) => formula.element.attr("ref").and_then(RangeRef::parse),
                    _ => None,
                }),
        );
        ranges.extend(
            self.names
                .iter()
                .filter(|name| name.refers_to(self.sheet_name, self.sheet_index))
                .filter_map(|name| name.target.as_ref().map(|t| t.range())),
        );
        for table in &self.tables {
            ranges.push(table.range);
            ranges.extend(table.autofilter);
        }

        let grid: Vec<u32> = match axis {
            Axis::Row => ws.rows.iter().map(|row| row.number).collect(),
            Axis::Column => ws
                .rows
                .iter()
                .filter(|row| row.number == shift.row)
                .flat_map(|row| row.cells.iter().map(|cell| cell.col))
                .collect(),
        };
        let reach = ranges
            .into_iter()
            .filter(|range| shift.applies_to(*range))
            .map(|range| range.end.coord(axis))
            .chain(grid)
            .fold(shift.at - 1, u32::max);

        let needed = u64::from(reach) + u64::from(count);
        if needed > u64::from(axis.limit()) {
            let unit = match axis {
                Axis::Row => "row",
                Axis::Column => "column",
            };
            return Err(TemplateError::GridOverflow(format!(
                "sheet {}: inserting {count} {unit}(s) at {unit} {} needs {unit} {needed}, the last is {}",
                self.sheet_name,
                shift.at,
                axis.limit()
            )));
        }
        Ok(())
    }

    /// Renumber rows or move cells, and relocate formula ranges.
    fn shift_grid(&mut self, shift: Shift) {
        let ws = &mut *self.worksheet;
        match shift.axis {
            Axis::Row => {
                for row in &mut ws.rows {
                    row.number = translate_coord(row.number, shift.at, shift.count, shift.axis.limit());
                }
            }
            Axis::Column => {
                if let Some(row) = ws.row_mut(shift.row) {
                    for cell in &mut row.cells {
                        cell.col = translate_coord(cell.col, shift.at, shift.count, shift.axis.limit());
                    }
                }
            }
        }

        for row in &mut ws.rows {
            for cell in &mut row.cells {
                let CellValue::Formula(formula) = &mut cell.value else {
                    continue;
                };
                if let Some(range) = formula.element.attr("ref").and_then(RangeRef::parse) {
                    formula.element.set_attr("ref", shift.translate(range).to_string());
                }
            }
        }
    }

    /// Merges after `shift`. Merges lying on the template row are repeated
    /// on every inserted row.
    ///
    /// Column shifts move merges on one row only, so a moved merge can land
    /// on one that stayed put; that is refused.
    fn shifted_merges(&self, shift: Shift) -> Result<Vec<RangeRef>> {
        let original = &self.worksheet.merges;
        let template_row = shift.at - 1;
        let mut merges = Vec::with_capacity(original.len());
        let mut copies = Vec::new();
        for merge in original {
            if shift.axis == Axis::Row
                && shift.count > 0
                && merge.start.row == template_row
                && merge.end.row == template_row
            {
                #[allow(clippy::cast_sign_loss)] // count > 0
                for row in shift.at..shift.at + shift.count as u32 {
                    copies.push(RangeRef::new(
                        CellRef::new(row, merge.start.col),
                        CellRef::new(row, merge.end.col),
                    ));
                }
            }
            merges.push(shift.translate(*merge));
        }

        if shift.axis == Axis::Column {
            for (i, moved) in merges.iter().enumerate() {
                if *moved == original[i] {
                    continue;
                }
                let blocking = merges.iter().enumerate().find(|&(j, other)| {
                    j != i && moved.intersects(*other) && !original[i].intersects(original[j])
                });
                if let Some((j, _)) = blocking {
                    return Err(TemplateError::MergeOverlap {
                        merge: original[i],
                        blocking: original[j],
                    });
                }
            }
        }

        merges.extend(copies);
        Ok(merges)
    }
}
