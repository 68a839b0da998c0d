//! JSON-file workbook used for offline campaigns and tests.
//!
//! The file maps tab names to row arrays:
//! `{ "Master": [["Name", "Email", ...], ["Alice", "alice@x.com"]] }`.
//! Every cell write rewrites the whole file through a temp file in the same
//! directory so a crash never leaves a half-written workbook.
use super::{CellAddress, SheetStore};
use crate::error::StoreError;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: BTreeMap<String, Vec<Vec<String>>>,
    path: Option<PathBuf>,
}

impl Workbook {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let bytes = fs::read(path)?;
        let sheets: BTreeMap<String, Vec<Vec<String>>> = serde_json::from_slice(&bytes)?;
        tracing::debug!(path = %path.display(), tabs = sheets.len(), "workbook opened");
        Ok(Workbook {
            sheets,
            path: Some(path.to_path_buf()),
        })
    }

    #[cfg(test)]
    pub fn in_memory(sheets: BTreeMap<String, Vec<Vec<String>>>) -> Self {
        Workbook { sheets, path: None }
    }

    #[cfg(test)]
    pub fn sheet(&self, name: &str) -> Option<&[Vec<String>]> {
        self.sheets.get(name).map(Vec::as_slice)
    }

    fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let text = serde_json::to_string_pretty(&self.sheets)?;
        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        staged.write_all(text.as_bytes())?;
        staged.persist(path).map_err(|err| err.error)?;
        Ok(())
    }
}

impl SheetStore for Workbook {
    fn read_all_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>, StoreError> {
        self.sheets
            .get(sheet)
            .cloned()
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))
    }

    fn write_cell(
        &mut self,
        sheet: &str,
        cell: &CellAddress,
        value: &str,
    ) -> Result<(), StoreError> {
        let rows = self
            .sheets
            .get_mut(sheet)
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))?;
        if cell.row == 0 {
            return Err(StoreError::InvalidCell(cell.to_string()));
        }
        let row_offset = cell.row - 1;
        if rows.len() <= row_offset {
            rows.resize_with(row_offset + 1, Vec::new);
        }
        let row = &mut rows[row_offset];
        if row.len() <= cell.column {
            row.resize(cell.column + 1, String::new());
        }
        row[cell.column] = value.to_string();
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BTreeMap<String, Vec<Vec<String>>> {
        let mut sheets = BTreeMap::new();
        sheets.insert(
            "Master".to_string(),
            vec![
                vec!["Name".to_string(), "Email".to_string()],
                vec!["Alice".to_string()],
            ],
        );
        sheets
    }

    #[test]
    fn write_pads_short_rows() {
        let mut book = Workbook::in_memory(sample());
        book.write_cell("Master", &CellAddress::new(4, 2), "Sent")
            .expect("write");
        let rows = book.sheet("Master").expect("sheet");
        assert_eq!(rows[1], vec!["Alice", "", "", "", "Sent"]);
    }

    #[test]
    fn missing_tab_is_reported_as_not_found() {
        let book = Workbook::in_memory(sample());
        let err = book.read_all_rows("Responses").expect_err("missing");
        assert!(err.is_missing_sheet());
    }

    #[test]
    fn writes_persist_to_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("book.json");
        fs::write(&path, serde_json::to_vec(&sample()).expect("json")).expect("seed");

        let mut book = Workbook::open(&path).expect("open");
        book.write_cell("Master", &CellAddress::new(5, 2), "2024-05-01")
            .expect("write");

        let reopened = Workbook::open(&path).expect("reopen");
        let rows = reopened.read_all_rows("Master").expect("rows");
        assert_eq!(rows[1][5], "2024-05-01");
    }
}
