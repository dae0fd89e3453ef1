//! A1-style reference arithmetic.
//!
//! Columns are 1-based base-26 letters (`A` = 1, `Z` = 26, `AA` = 27),
//! rows are 1-based integers. Every structural update in the crate goes
//! through [`CellRef::translate`] so that cells, merges, names, tables and
//! hyperlinks agree on where a coordinate moves.

use std::fmt;

/// Largest column a worksheet may address (`XFD`).
pub const MAX_COLUMN: u32 = 16_384;

/// Largest row a worksheet may address.
pub const MAX_ROW: u32 = 1_048_576;

/// Grid axis a shift operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Row,
    Column,
}

impl Axis {
    /// Largest coordinate a worksheet allows on this axis.
    pub fn limit(self) -> u32 {
        match self {
            Self::Row => MAX_ROW,
            Self::Column => MAX_COLUMN,
        }
    }
}

// ── Column letters ─────────────────────────────────────────────────

/// Convert column letters to a 1-based index (`"A"` → 1, `"AB"` → 28).
///
/// Returns `None` for empty input, non-letters, or columns beyond `XFD`.
pub fn column_to_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut index: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        index = index * 26 + u32::from(b.to_ascii_uppercase() - b'A' + 1);
    }
    (index <= MAX_COLUMN).then_some(index)
}

/// Convert a 1-based column index to letters (1 → `"A"`, 28 → `"AB"`).
pub fn index_to_column(index: u32) -> String {
    assert!(index >= 1, "column index must be 1-based, got {index}");
    let mut n = index;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        #[allow(clippy::cast_possible_truncation)] // rem < 26
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Split `"AB12"` into `("AB", "12")` at the first digit.
fn split_letters_digits(s: &str) -> (&str, &str) {
    let idx = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(idx)
}

/// Move a single coordinate: unchanged below `at`, offset by `count` from
/// `at` on. Panics if the result leaves `1..=limit`.
pub(crate) fn translate_coord(coord: u32, at: u32, count: i32, limit: u32) -> u32 {
    if coord < at {
        return coord;
    }
    let moved = i64::from(coord) + i64::from(count);
    assert!(
        (1..=i64::from(limit)).contains(&moved),
        "shift moved coordinate {coord} to {moved}"
    );
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // checked above
    let moved = moved as u32;
    moved
}

// ── Cell references ────────────────────────────────────────────────

/// A single cell address, both coordinates 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        assert!(row >= 1 && col >= 1, "invalid cell coordinates ({row}, {col})");
        Self { row, col }
    }

    /// Parse a relative reference such as `"C4"`. Absolute markers are not
    /// accepted here; see [`NameTarget`] for those.
    pub fn parse(s: &str) -> Option<Self> {
        let (letters, digits) = split_letters_digits(s);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let col = column_to_index(letters)?;
        let row: u32 = digits.parse().ok()?;
        (1..=MAX_ROW).contains(&row).then_some(Self { row, col })
    }

    /// Move this reference if its coordinate on `axis` is at or past `at`.
    ///
    /// Panics if the result would leave the grid.
    #[must_use]
    pub fn translate(self, axis: Axis, at: u32, count: i32) -> Self {
        match axis {
            Axis::Row => Self {
                row: translate_coord(self.row, at, count, MAX_ROW),
                col: self.col,
            },
            Axis::Column => Self {
                row: self.row,
                col: translate_coord(self.col, at, count, MAX_COLUMN),
            },
        }
    }

    pub(crate) fn coord(self, axis: Axis) -> u32 {
        match axis {
            Axis::Row => self.row,
            Axis::Column => self.col,
        }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", index_to_column(self.col), self.row)
    }
}

// ── Ranges ─────────────────────────────────────────────────────────

/// A rectangular range. A single-cell range displays as one reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeRef {
    pub start: CellRef,
    pub end: CellRef,
}

impl RangeRef {
    pub fn new(start: CellRef, end: CellRef) -> Self {
        assert!(
            start.row <= end.row && start.col <= end.col,
            "range start {start} is past its end {end}"
        );
        Self { start, end }
    }

    pub fn single(cell: CellRef) -> Self {
        Self {
            start: cell,
            end: cell,
        }
    }

    /// Parse `"B4:C6"` or `"B4"`. Ranges given bottom-right first are
    /// rejected.
    pub fn parse(s: &str) -> Option<Self> {
        let (start, end) = match s.split_once(':') {
            Some((a, b)) => (CellRef::parse(a)?, CellRef::parse(b)?),
            None => {
                let cell = CellRef::parse(s)?;
                (cell, cell)
            }
        };
        (start.row <= end.row && start.col <= end.col).then_some(Self { start, end })
    }

    /// Translate both endpoints independently.
    #[must_use]
    pub fn translate(self, axis: Axis, at: u32, count: i32) -> Self {
        Self::new(
            self.start.translate(axis, at, count),
            self.end.translate(axis, at, count),
        )
    }

    /// Extend the far edge on `axis` by `count`.
    #[must_use]
    pub fn grow(self, axis: Axis, count: u32) -> Self {
        let mut end = self.end;
        match axis {
            Axis::Row => end.row += count,
            Axis::Column => end.col += count,
        }
        Self::new(self.start, end)
    }

    pub fn contains_row(self, row: u32) -> bool {
        (self.start.row..=self.end.row).contains(&row)
    }

    pub fn contains(self, cell: CellRef) -> bool {
        self.contains_row(cell.row) && (self.start.col..=self.end.col).contains(&cell.col)
    }

    /// Whether the two ranges share at least one cell.
    pub fn intersects(self, other: Self) -> bool {
        self.start.row <= other.end.row
            && other.start.row <= self.end.row
            && self.start.col <= other.end.col
            && other.start.col <= self.end.col
    }

    /// Smallest range covering both.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            start: CellRef {
                row: self.start.row.min(other.start.row),
                col: self.start.col.min(other.start.col),
            },
            end: CellRef {
                row: self.end.row.max(other.end.row),
                col: self.end.col.max(other.end.col),
            },
        }
    }
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

// ── Defined-name targets ───────────────────────────────────────────

/// One endpoint of a defined-name target, remembering its `$` markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Anchored {
    cell: CellRef,
    col_abs: bool,
    row_abs: bool,
}

impl Anchored {
    fn parse(s: &str) -> Option<Self> {
        let (col_abs, rest) = match s.strip_prefix('$') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (letters, digits) = split_letters_digits(rest);
        let (letters, row_abs) = match letters.strip_suffix('$') {
            Some(letters) => (letters, true),
            None => (letters, false),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let col = column_to_index(letters)?;
        let row: u32 = digits.parse().ok()?;
        if !(1..=MAX_ROW).contains(&row) {
            return None;
        }
        Some(Self {
            cell: CellRef { row, col },
            col_abs,
            row_abs,
        })
    }
}

impl fmt::Display for Anchored {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let col_marker = if self.col_abs { "$" } else { "" };
        let row_marker = if self.row_abs { "$" } else { "" };
        write!(
            f,
            "{col_marker}{}{row_marker}{}",
            index_to_column(self.cell.col),
            self.cell.row
        )
    }
}

/// A simple defined-name target: `Sheet!$A$1`, `'My Sheet'!$A$1:$B$4`,
/// or an unprefixed `$A$1`.
///
/// Formulas, unions and whole-row/column references do not parse and are
/// left to the caller to keep verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTarget {
    /// Sheet prefix exactly as written (quotes included), if any.
    prefix: Option<String>,
    start: Anchored,
    end: Option<Anchored>,
}

impl NameTarget {
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (prefix, range) = match s.rsplit_once('!') {
            Some((sheet, range)) => {
                if sheet.is_empty() {
                    return None;
                }
                (Some(sheet.to_string()), range)
            }
            None => (None, s),
        };
        if let Some(prefix) = &prefix {
            // Quoted names may contain anything; bare names may not contain
            // operators or spaces (that would be a formula).
            let quoted = prefix.len() >= 2 && prefix.starts_with('\'') && prefix.ends_with('\'');
            if !quoted && prefix.contains(|c: char| " ()+-*/&,;\"'".contains(c)) {
                return None;
            }
        }
        let (start, end) = match range.split_once(':') {
            Some((a, b)) => (Anchored::parse(a)?, Some(Anchored::parse(b)?)),
            None => (Anchored::parse(range)?, None),
        };
        if let Some(end) = end {
            if start.cell.row > end.cell.row || start.cell.col > end.cell.col {
                return None;
            }
        }
        Some(Self { prefix, start, end })
    }

    /// Unquoted sheet name of the prefix (`'It''s'` → `It's`).
    pub fn sheet(&self) -> Option<String> {
        let prefix = self.prefix.as_deref()?;
        match prefix
            .strip_prefix('\'')
            .and_then(|p| p.strip_suffix('\''))
        {
            Some(inner) => Some(inner.replace("''", "'")),
            None => Some(prefix.to_string()),
        }
    }

    pub fn range(&self) -> RangeRef {
        RangeRef::new(self.start.cell, self.end.map_or(self.start.cell, |e| e.cell))
    }

    /// Replace the coordinates, keeping prefix and `$` markers.
    pub fn set_range(&mut self, range: RangeRef) {
        self.start.cell = range.start;
        match &mut self.end {
            Some(end) => end.cell = range.end,
            None if range.end != range.start => {
                self.end = Some(Anchored {
                    cell: range.end,
                    ..self.start
                });
            }
            None => {}
        }
    }
}

impl fmt::Display for NameTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, "{prefix}!")?;
        }
        write!(f, "{}", self.start)?;
        if let Some(end) = &self.end {
            write!(f, ":{end}")?;
        }
        Ok(())
    }
}
