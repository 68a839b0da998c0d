//! Typed view over the roster tab.
//!
//! The roster keeps per-contact progress in free-text cells; this module is
//! the only place those cells are interpreted. Everything downstream works on
//! [`Contact`] values and writes back through [`crate::store::CellAddress`]
//! built from the contact's `row_index`.
use crate::store::SheetStore;
use anyhow::{Context, Result};

pub const NAME_COLUMN: usize = 0;
pub const EMAIL_COLUMN: usize = 1;
pub const STATUS_COLUMN: usize = 4;
pub const SENT_DATE_COLUMN: usize = 5;
pub const REMINDER_SENT_COLUMN: usize = 6;
pub const THANK_YOU_SENT_COLUMN: usize = 7;

/// Status cell value written after a successful initial send.
pub const SENT_MARKER: &str = "Sent";
/// Prefix for permanent initial-send failures.
pub const FAILED_PREFIX: &str = "Failed - ";
/// Prefix for transport failures that may be retried by a later send run.
pub const RETRY_PREFIX: &str = "Retry - ";

/// Normalized join key shared by roster contacts and response records.
pub fn identity_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// True when a row is a copy of the header rather than data.
pub(crate) fn is_header_name(name: &str) -> bool {
    identity_key(name) == "name"
}

/// Outcome of the initial send, decoded from the status cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendStatus {
    /// Empty status cell.
    NotStarted,
    /// Status cell reads exactly `Sent`.
    Sent,
    /// A transport failure recorded with [`RETRY_PREFIX`].
    Retryable(String),
    /// Any other non-empty text, including `Failed - ...` markers.
    Failed(String),
}

impl SendStatus {
    pub fn parse(cell: &str) -> Self {
        let cell = cell.trim();
        if cell.is_empty() {
            SendStatus::NotStarted
        } else if cell == SENT_MARKER {
            SendStatus::Sent
        } else if let Some(reason) = cell.strip_prefix(RETRY_PREFIX) {
            SendStatus::Retryable(reason.to_string())
        } else {
            SendStatus::Failed(cell.to_string())
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, SendStatus::Sent)
    }
}

/// One data row of the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// 1-based sheet row; the only address used for writebacks.
    pub row_index: usize,
    pub name: String,
    /// `None` when the row has no email cell at all, `Some("")` when blank.
    pub email: Option<String>,
    pub send_status: SendStatus,
    pub sent_on: Option<String>,
    pub reminded_on: Option<String>,
    pub thanked_on: Option<String>,
}

impl Contact {
    pub fn identity_key(&self) -> String {
        identity_key(&self.name)
    }

    pub fn email_text(&self) -> &str {
        self.email.as_deref().unwrap_or_default()
    }

    fn from_row(row_index: usize, row: &[String]) -> Self {
        Contact {
            row_index,
            name: cell(row, NAME_COLUMN).unwrap_or_default().to_string(),
            email: cell(row, EMAIL_COLUMN).map(str::to_string),
            send_status: SendStatus::parse(cell(row, STATUS_COLUMN).unwrap_or_default()),
            sent_on: non_empty(cell(row, SENT_DATE_COLUMN)),
            reminded_on: non_empty(cell(row, REMINDER_SENT_COLUMN)),
            thanked_on: non_empty(cell(row, THANK_YOU_SENT_COLUMN)),
        }
    }
}

/// A roster row, either decoded or too short to carry a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterEntry {
    Contact(Contact),
    Malformed { row_index: usize, reason: String },
}

/// Roster rows in sheet order, header excluded.
#[derive(Debug, Clone, Default)]
pub struct RosterIndex {
    entries: Vec<RosterEntry>,
}

impl RosterIndex {
    /// Read the roster tab. A missing or unreadable roster is fatal.
    pub fn load(store: &dyn SheetStore, sheet: &str) -> Result<Self> {
        let rows = store
            .read_all_rows(sheet)
            .with_context(|| format!("read roster worksheet '{sheet}'"))?;
        let index = Self::from_rows(&rows);
        tracing::debug!(sheet, rows = index.entries.len(), "roster loaded");
        Ok(index)
    }

    /// Decode raw rows; `rows[0]` is the header and sheet row 1.
    pub fn from_rows(rows: &[Vec<String>]) -> Self {
        let mut entries = Vec::new();
        for (offset, row) in rows.iter().enumerate().skip(1) {
            let row_index = offset + 1;
            if row.is_empty() {
                entries.push(RosterEntry::Malformed {
                    row_index,
                    reason: "Missing name column".to_string(),
                });
                continue;
            }
            let contact = Contact::from_row(row_index, row);
            if is_header_name(&contact.name) {
                tracing::debug!(row_index, "skipping repeated header row");
                continue;
            }
            entries.push(RosterEntry::Contact(contact));
        }
        RosterIndex { entries }
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn contacts(&self) -> impl Iterator<Item = &Contact> {
        self.entries.iter().filter_map(|entry| match entry {
            RosterEntry::Contact(contact) => Some(contact),
            RosterEntry::Malformed { .. } => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn cell(row: &[String], column: usize) -> Option<&str> {
    row.get(column).map(|value| value.trim())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|value| !value.is_empty()).map(str::to_string)
}
