//! Batch execution of a computed candidate set.
//!
//! The runner owns the only side effects in a campaign run: one transport
//! submission per candidate and the status/date writebacks that follow it.
//! Candidates are processed strictly one after another and a failure on one
//! candidate is recorded and counted without touching the rest of the batch.
use crate::email::{classify_suspicious, validate_format};
use crate::message::MessageRenderer;
use crate::reconcile::{Action, Candidate, CandidateSet};
use crate::roster::{
    FAILED_PREFIX, REMINDER_SENT_COLUMN, RETRY_PREFIX, SENT_DATE_COLUMN, SENT_MARKER,
    STATUS_COLUMN, THANK_YOU_SENT_COLUMN,
};
use crate::store::{CellAddress, SheetStore};
use crate::transport::Transport;
use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Process at most this many candidates; `None` processes all of them.
    pub batch_size: Option<usize>,
    pub dry_run: bool,
    /// Persist send-time transport failures with the retry prefix.
    pub retry_transport_failures: bool,
    /// Date written into the date columns.
    pub today: NaiveDate,
}

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Delivered,
    /// Dry run: counted as a success, nothing submitted or written.
    Simulated,
    Failed {
        reason: String,
        /// Status cell text written for the failure, when one was written.
        marker: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub row_index: usize,
    pub name: String,
    pub email: String,
    pub disposition: Disposition,
    /// Soft warning such as a placeholder-looking address.
    pub warning: Option<String>,
}

impl Outcome {
    pub fn succeeded(&self) -> bool {
        !matches!(self.disposition, Disposition::Failed { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let who = if self.name.is_empty() {
            format!("Row {}", self.row_index)
        } else if self.email.is_empty() {
            format!("Row {} ({})", self.row_index, self.name)
        } else {
            format!("Row {} ({} <{}>)", self.row_index, self.name, self.email)
        };
        match &self.disposition {
            Disposition::Delivered => write!(f, "{who}: sent"),
            Disposition::Simulated => write!(f, "{who}: [DRY RUN] would send"),
            Disposition::Failed {
                reason,
                marker: Some(_),
            } => write!(f, "{who}: failed: {reason} (status updated)"),
            Disposition::Failed { reason, .. } => write!(f, "{who}: failed: {reason}"),
        }
    }
}

/// Counts for one run; `remaining` is what the batch cap left for later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub action: Action,
    pub found: usize,
    pub processed: usize,
    pub sent: usize,
    pub failed: usize,
    pub remaining: usize,
    pub outcomes: Vec<Outcome>,
}

impl Summary {
    /// `Sent: X, Failed: Y` (or the remind/thank label).
    pub fn line(&self) -> String {
        format!(
            "{}: {}, Failed: {}",
            self.action.summary_label(),
            self.sent,
            self.failed
        )
    }
}

pub struct BatchRunner<'a> {
    store: &'a mut dyn SheetStore,
    transport: &'a mut dyn Transport,
    renderer: MessageRenderer<'a>,
    sheet: &'a str,
    options: RunOptions,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        store: &'a mut dyn SheetStore,
        transport: &'a mut dyn Transport,
        renderer: MessageRenderer<'a>,
        sheet: &'a str,
        options: RunOptions,
    ) -> Self {
        BatchRunner {
            store,
            transport,
            renderer,
            sheet,
            options,
        }
    }

    /// Process the first `batch_size` candidates of `set`.
    ///
    /// `observe` sees every outcome as soon as it is known, in processing order.
    pub fn run(&mut self, set: CandidateSet, mut observe: impl FnMut(&Outcome)) -> Summary {
        let action = set.action;
        let found = set.len();
        let limit = self.options.batch_size.unwrap_or(found).min(found);
        let mut outcomes = Vec::with_capacity(limit + set.skipped.len());

        for skipped in &set.skipped {
            let outcome = Outcome {
                row_index: skipped.row_index,
                name: String::new(),
                email: String::new(),
                disposition: Disposition::Failed {
                    reason: skipped.reason.clone(),
                    marker: None,
                },
                warning: None,
            };
            observe(&outcome);
            outcomes.push(outcome);
        }

        for candidate in set.candidates.iter().take(limit) {
            let outcome = self.process(action, candidate);
            observe(&outcome);
            outcomes.push(outcome);
        }

        let sent = outcomes.iter().filter(|outcome| outcome.succeeded()).count();
        let summary = Summary {
            action,
            found,
            processed: limit,
            sent,
            failed: outcomes.len() - sent,
            remaining: found - limit,
            outcomes,
        };
        tracing::info!(
            action = action.as_str(),
            found = summary.found,
            processed = summary.processed,
            sent = summary.sent,
            failed = summary.failed,
            dry_run = self.options.dry_run,
            "batch finished"
        );
        summary
    }

    fn process(&mut self, action: Action, candidate: &Candidate) -> Outcome {
        let contact = &candidate.contact;
        tracing::debug!(
            row = contact.row_index,
            action = action.as_str(),
            sent_on = contact.sent_on.as_deref().unwrap_or_default(),
            "processing candidate"
        );
        let mut outcome = Outcome {
            row_index: contact.row_index,
            name: contact.name.clone(),
            email: contact.email_text().to_string(),
            disposition: Disposition::Delivered,
            warning: None,
        };

        let address = match contact.email.as_deref() {
            None => return self.fail(action, outcome, "Missing email address".to_string()),
            Some("") => return self.fail(action, outcome, "Empty email address".to_string()),
            Some(address) => address,
        };
        if let Err(reason) = validate_format(address) {
            let reason = format!("Invalid email format: {reason}");
            return self.fail(action, outcome, reason);
        }
        if let Some(suspicion) = classify_suspicious(address) {
            tracing::warn!(row = contact.row_index, %address, %suspicion, "suspicious address");
            outcome.warning = Some(format!("Suspicious email pattern: {suspicion}"));
        }

        let message = match self.renderer.render(action, candidate) {
            Ok(message) => message,
            Err(err) => {
                let reason = format!("Processing error: {err:#}");
                return self.fail(action, outcome, reason);
            }
        };

        if self.options.dry_run {
            outcome.disposition = Disposition::Simulated;
            return outcome;
        }

        if let Err(err) = self.transport.submit(&message) {
            tracing::warn!(
                row = contact.row_index,
                kind = err.kind(),
                error = %err,
                "transport submission failed"
            );
            let reason = err.to_string();
            if action == Action::Send && self.options.retry_transport_failures {
                let marker = format!("{RETRY_PREFIX}{reason}");
                return self.record_failure(outcome, reason, marker);
            }
            return self.fail(action, outcome, reason);
        }

        if let Err(reason) = self.mark_success(action, contact.row_index) {
            outcome.disposition = Disposition::Failed {
                reason,
                marker: None,
            };
        }
        outcome
    }

    /// Count a failure; only the send action persists a marker.
    fn fail(&mut self, action: Action, outcome: Outcome, reason: String) -> Outcome {
        if action == Action::Send {
            let marker = format!("{FAILED_PREFIX}{reason}");
            return self.record_failure(outcome, reason, marker);
        }
        Outcome {
            disposition: Disposition::Failed {
                reason,
                marker: None,
            },
            ..outcome
        }
    }

    fn record_failure(&mut self, outcome: Outcome, reason: String, marker: String) -> Outcome {
        if self.options.dry_run {
            return Outcome {
                disposition: Disposition::Failed {
                    reason,
                    marker: None,
                },
                ..outcome
            };
        }
        let cell = CellAddress::new(STATUS_COLUMN, outcome.row_index);
        let written = match self.store.write_cell(self.sheet, &cell, &marker) {
            Ok(()) => Some(marker),
            Err(err) => {
                tracing::warn!(%cell, error = %err, "could not record failure marker");
                None
            }
        };
        Outcome {
            disposition: Disposition::Failed {
                reason,
                marker: written,
            },
            ..outcome
        }
    }

    fn mark_success(&mut self, action: Action, row_index: usize) -> Result<(), String> {
        let today = self.options.today.format("%Y-%m-%d").to_string();
        let writes: Vec<(usize, &str)> = match action {
            Action::Send => vec![(STATUS_COLUMN, SENT_MARKER), (SENT_DATE_COLUMN, today.as_str())],
            Action::Remind => vec![(REMINDER_SENT_COLUMN, today.as_str())],
            Action::Thank => vec![(THANK_YOU_SENT_COLUMN, today.as_str())],
        };
        for (column, value) in writes {
            let cell = CellAddress::new(column, row_index);
            self.store
                .write_cell(self.sheet, &cell, value)
                .map_err(|err| {
                    tracing::error!(%cell, error = %err, "message delivered but writeback failed");
                    format!("Delivered, but updating {cell} failed: {err}")
                })?;
            tracing::debug!(%cell, value, "writeback");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
