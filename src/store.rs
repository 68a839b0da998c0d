//! Tabular store seam: bulk row reads and single-cell writebacks.
//!
//! Rows are 0-based in memory; cells are addressed 1-based and letter-coded
//! (`E17`) the way the sheet itself names them.
mod sheets;
mod workbook;

pub use sheets::GoogleSheetsStore;
pub use workbook::Workbook;

use crate::error::StoreError;
use std::fmt;

/// Read/write access to a spreadsheet-like store of string cells.
pub trait SheetStore {
    /// Every row of `sheet` in order; the first row is the header.
    fn read_all_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>, StoreError>;

    /// Overwrite a single cell of `sheet`.
    fn write_cell(
        &mut self,
        sheet: &str,
        cell: &CellAddress,
        value: &str,
    ) -> Result<(), StoreError>;
}

/// A single cell in A1 notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CellAddress {
    /// 0-based column.
    pub column: usize,
    /// 1-based row.
    pub row: usize,
}

impl CellAddress {
    pub fn new(column: usize, row: usize) -> Self {
        CellAddress { column, row }
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.column), self.row)
    }
}

/// Spreadsheet column name for a 0-based index (`0 -> A`, `26 -> AA`).
pub fn column_letters(column: usize) -> String {
    let mut letters = Vec::new();
    let mut remaining = column + 1;
    while remaining > 0 {
        let rem = (remaining - 1) % 26;
        letters.push(b'A' + rem as u8);
        remaining = (remaining - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}
