//! Single-sheet spreadsheet model and storage.
//!
//! A table sheet has a fixed layout:
//!
//! ```text
//! row 0   id(int)   name(string)   reward(Reward).count(int)     <- comment paths
//! row 1   ID        Name           Reward count                  <- labels
//! row 2+  1         sword          3                             <- data
//! ```
//!
//! [`Sheet`] is the in-memory grid with typed cells; a [`SheetStore`] opens
//! and saves it. [`CsvStore`] is the bundled store.

mod csv_store;

pub use csv_store::{decode_content, detect_encoding, CsvStore};

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::SheetResult;

/// Row holding the machine-readable comment paths.
pub const COMMENT_ROW: usize = 0;
/// Row holding the human labels.
pub const LABEL_ROW: usize = 1;
/// First data row.
pub const FIRST_DATA_ROW: usize = 2;

/// A typed cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    /// Typed cell from raw text: integer, then float, then text.
    ///
    /// A number is only taken when it displays as exactly `raw`, so the
    /// cell text never changes (`007`, `1.50`, `+5`, `NaN` stay text).
    pub fn infer(raw: &str) -> Self {
        if raw.is_empty() {
            return CellValue::Empty;
        }
        if let Ok(n) = raw.parse::<i64>() {
            if n.to_string() == raw {
                return CellValue::Int(n);
            }
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() && f.to_string() == raw {
                return CellValue::Float(f);
            }
        }
        CellValue::Text(raw.to_string())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Int(n) => write!(f, "{}", n),
            CellValue::Float(x) => write!(f, "{}", x),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

/// In-memory grid of one sheet.
///
/// Every write counts as a mutation so callers can tell whether a save is
/// needed at all.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    rows: Vec<Vec<CellValue>>,
    mutations: usize,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sheet of text cells, as read from a store.
    pub fn from_rows<S: AsRef<str>>(rows: Vec<Vec<S>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| row.iter().map(|cell| CellValue::from(cell.as_ref())).collect())
            .collect();
        Self { rows, mutations: 0 }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row length.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Number of writes since the sheet was opened.
    pub fn mutations(&self) -> usize {
        self.mutations
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Display text of a cell, empty when out of range.
    pub fn cell_text(&self, row: usize, col: usize) -> String {
        self.cell(row, col).map(|c| c.to_string()).unwrap_or_default()
    }

    /// Text of a whole row, trailing empty cells removed.
    pub fn row_text(&self, row: usize) -> Vec<String> {
        let mut cells: Vec<String> = self
            .rows
            .get(row)
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .unwrap_or_default();
        while cells.last().is_some_and(|c| c.is_empty()) {
            cells.pop();
        }
        cells
    }

    /// Text of every row.
    pub fn rows_text(&self) -> Vec<Vec<String>> {
        (0..self.rows.len()).map(|i| self.row_text(i)).collect()
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: CellValue) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize_with(col + 1, CellValue::default);
        }
        cells[col] = value;
        self.mutations += 1;
    }

    pub fn set_cell_str(&mut self, row: usize, col: usize, value: &str) {
        self.set_cell(row, col, CellValue::from(value));
    }

    /// Empty a row in place, keeping the rows below where they are.
    pub fn clear_row(&mut self, row: usize) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        self.rows[row].clear();
        self.mutations += 1;
    }

    /// Remove every row.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.mutations += 1;
    }
}

/// Name of a zero-based column: `A`, ..., `Z`, `AA`, ...
pub fn column_name(index: usize) -> String {
    let mut index = index + 1;
    let mut name = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        name.push(b'A' + rem as u8);
        index = (index - 1) / 26;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

/// A1-style reference of a zero-based cell.
pub fn cell_name(row: usize, col: usize) -> String {
    format!("{}{}", column_name(col), row + 1)
}

/// Opens and saves sheets of one container format.
pub trait SheetStore {
    /// File extension without the dot.
    fn extension(&self) -> &str;

    /// Open a sheet; `Ok(None)` when the file does not exist.
    fn open(&self, path: &Path) -> SheetResult<Option<Sheet>>;

    /// Save a sheet, replacing the file.
    fn save(&self, path: &Path, sheet: &Sheet) -> SheetResult<()>;

    /// Location of a bean's sheet inside a directory.
    fn sheet_path(&self, dir: &Path, bean: &str) -> PathBuf {
        dir.join(format!("{}.{}", bean, self.extension()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(27), "AB");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
        assert_eq!(cell_name(0, 2), "C1");
    }

    #[test]
    fn test_infer_cell() {
        assert_eq!(CellValue::infer("12"), CellValue::Int(12));
        assert_eq!(CellValue::infer("1.5"), CellValue::Float(1.5));
        assert_eq!(CellValue::infer("sword"), CellValue::Text("sword".into()));
        assert_eq!(CellValue::infer(""), CellValue::Empty);
    }

    #[test]
    fn test_infer_keeps_text_exact() {
        for raw in ["007", "1.50", "+5", "Nan", "NaN", "inf", "Infinity", "-0", "1e3", " 4"] {
            let cell = CellValue::infer(raw);
            assert_eq!(cell.to_string(), raw, "{}", raw);
        }
        assert_eq!(CellValue::infer("-12"), CellValue::Int(-12));
        assert_eq!(CellValue::infer("0.25"), CellValue::Float(0.25));
        assert_eq!(CellValue::infer("1.50"), CellValue::Text("1.50".into()));
    }

    #[test]
    fn test_set_cell_grows_and_counts() {
        let mut sheet = Sheet::new();
        sheet.set_cell(2, 3, CellValue::Int(7));
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.width(), 4);
        assert_eq!(sheet.cell_text(2, 3), "7");
        assert_eq!(sheet.cell_text(9, 9), "");
        assert_eq!(sheet.mutations(), 1);
    }

    #[test]
    fn test_row_text_trims_trailing_empty() {
        let sheet = Sheet::from_rows(vec![vec!["a", "", "b", "", ""]]);
        assert_eq!(sheet.row_text(0), vec!["a", "", "b"]);
        assert_eq!(sheet.mutations(), 0);
    }

    #[test]
    fn test_clear_row_keeps_others() {
        let mut sheet = Sheet::from_rows(vec![vec!["x"], vec!["y"], vec!["z"]]);
        sheet.clear_row(0);
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.cell_text(0, 0), "");
        assert_eq!(sheet.cell_text(2, 0), "z");
    }
}
