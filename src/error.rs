//! Typed failures raised at the store and transport seams.
//!
//! Everything above these seams reports through `anyhow`; the typed variants
//! exist so the runner and the response-log loader can branch on the kind of
//! failure without string matching.

/// Failure reading from or writing to the backing sheet store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("worksheet '{0}' not found")]
    SheetNotFound(String),
    #[error("sheet API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("sheet store unreachable: {0}")]
    Network(String),
    #[error("invalid cell address '{0}'")]
    InvalidCell(String),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// True when the requested tab does not exist in the store.
    pub fn is_missing_sheet(&self) -> bool {
        matches!(self, StoreError::SheetNotFound(_))
    }
}

/// Failure submitting a message through the outbound transport.
///
/// The three kinds are diagnostic only; the runner treats them the same.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Transport error: {0}")]
    Protocol(String),
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl TransportError {
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Authentication(_) => "authentication",
            TransportError::Protocol(_) => "protocol",
            TransportError::Unexpected(_) => "unexpected",
        }
    }
}
