//! Outbound message transport seam.
mod gmail;
mod mime;
mod outbox;

pub use gmail::GmailTransport;
pub use mime::render_message;
pub use outbox::OutboxTransport;

use crate::error::TransportError;

/// A fully rendered message ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub from_name: String,
    pub from_address: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Submits messages one at a time; a failure affects only that message.
pub trait Transport {
    fn submit(&mut self, message: &OutboundMessage) -> Result<(), TransportError>;

    /// Check credentials without sending anything; returns the sender identity.
    fn verify(&mut self) -> Result<String, TransportError>;
}
