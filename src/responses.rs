//! Response log loader and name-keyed lookup.
use crate::roster::{identity_key, is_header_name};
use crate::store::SheetStore;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const TIMESTAMP_COLUMN: usize = 0;
pub const NAME_COLUMN: usize = 1;
pub const VALUE_COLUMN: usize = 2;
pub const TEXT_COLUMN: usize = 3;

/// Which record wins when one respondent appears more than once.
///
/// Only the record handed to the thank-you message depends on this; whether a
/// contact has responded at all is decided by presence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsePolicy {
    #[default]
    Last,
    First,
}

/// One row of the response log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub row_index: usize,
    pub timestamp: String,
    pub respondent_name: String,
    pub response_value: String,
    pub response_text: String,
}

impl ResponseRecord {
    pub fn identity_key(&self) -> String {
        identity_key(&self.respondent_name)
    }
}

/// Response log rows in log order, with a name index over them.
#[derive(Debug, Clone, Default)]
pub struct ResponseIndex {
    records: Vec<ResponseRecord>,
    by_key: BTreeMap<String, Vec<usize>>,
}

impl ResponseIndex {
    /// Read the response tab. A missing tab yields `None`; any other store
    /// failure is fatal.
    pub fn load_optional(store: &dyn SheetStore, sheet: &str) -> Result<Option<Self>> {
        match store.read_all_rows(sheet) {
            Ok(rows) => {
                let index = Self::from_rows(&rows);
                tracing::debug!(
                    sheet,
                    records = index.records.len(),
                    respondents = index.by_key.len(),
                    "response log loaded"
                );
                Ok(Some(index))
            }
            Err(err) if err.is_missing_sheet() => {
                tracing::warn!(sheet, "response worksheet not found; treating as no responses");
                Ok(None)
            }
            Err(err) => {
                Err(err).with_context(|| format!("read response worksheet '{sheet}'"))
            }
        }
    }

    pub fn from_rows(rows: &[Vec<String>]) -> Self {
        let mut index = ResponseIndex::default();
        for (offset, row) in rows.iter().enumerate().skip(1) {
            let name = cell(row, NAME_COLUMN);
            if name.is_empty() || is_header_name(name) {
                continue;
            }
            let record = ResponseRecord {
                row_index: offset + 1,
                timestamp: cell(row, TIMESTAMP_COLUMN).to_string(),
                respondent_name: name.to_string(),
                response_value: cell(row, VALUE_COLUMN).to_string(),
                response_text: cell(row, TEXT_COLUMN).to_string(),
            };
            index
                .by_key
                .entry(record.identity_key())
                .or_default()
                .push(index.records.len());
            index.records.push(record);
        }
        index
    }

    pub fn records(&self) -> &[ResponseRecord] {
        &self.records
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// The record chosen for `key` under `policy`.
    pub fn lookup(&self, key: &str, policy: ResponsePolicy) -> Option<&ResponseRecord> {
        let positions = self.by_key.get(key)?;
        let position = match policy {
            ResponsePolicy::Last => positions.last(),
            ResponsePolicy::First => positions.first(),
        }?;
        self.records.get(*position)
    }

    /// Every record that shares `key`, in log order.
    pub fn all_for(&self, key: &str) -> Vec<&ResponseRecord> {
        self.by_key
            .get(key)
            .map(|positions| {
                positions
                    .iter()
                    .filter_map(|position| self.records.get(*position))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn respondents(&self) -> BTreeSet<&str> {
        self.by_key.keys().map(String::as_str).collect()
    }

    /// Keys that appear on more than one row.
    pub fn duplicated_keys(&self) -> Vec<&str> {
        self.by_key
            .iter()
            .filter(|(_, positions)| positions.len() > 1)
            .map(|(key, _)| key.as_str())
            .collect()
    }
}

fn cell(row: &[String], column: usize) -> &str {
    row.get(column).map(|value| value.trim()).unwrap_or_default()
}
