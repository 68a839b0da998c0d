//! Campaign state reconciliation.
//!
//! Lifecycle state is never stored; it is derived on every run from the
//! roster's status/date cells plus membership in the response log. Each
//! action has an eligibility predicate over that derived state, and the
//! predicates are what make repeated runs idempotent: a completed action
//! leaves a non-empty cell behind and the contact stops qualifying.
use crate::responses::{ResponseIndex, ResponsePolicy, ResponseRecord};
use crate::roster::{Contact, RosterEntry, RosterIndex, SendStatus};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The three campaign actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Send,
    Remind,
    Thank,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Send => "send",
            Action::Remind => "remind",
            Action::Thank => "thank",
        }
    }

    /// Plural noun used in operator output ("3 reminders").
    pub fn noun(self) -> &'static str {
        match self {
            Action::Send => "emails",
            Action::Remind => "reminders",
            Action::Thank => "thank yous",
        }
    }

    /// Label for the success count in the final summary line.
    pub fn summary_label(self) -> &'static str {
        match self {
            Action::Send => "Sent",
            Action::Remind => "Reminders sent",
            Action::Thank => "Thank yous sent",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived lifecycle position of a contact; exactly one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Unsent,
    SendFailed,
    Sent,
    Reminded,
    Responded,
    Thanked,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Unsent,
        Stage::SendFailed,
        Stage::Sent,
        Stage::Reminded,
        Stage::Responded,
        Stage::Thanked,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Unsent => "unsent",
            Stage::SendFailed => "send_failed",
            Stage::Sent => "sent",
            Stage::Reminded => "reminded",
            Stage::Responded => "responded",
            Stage::Thanked => "thanked",
        }
    }
}

/// A contact selected for an action, with the response that justified it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub contact: Contact,
    /// Set for thank-you candidates only.
    pub response: Option<ResponseRecord>,
}

/// A row that qualified for an action but cannot be processed at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub row_index: usize,
    pub reason: String,
}

/// Ordered candidates for one action, computed before any batch cap applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    pub action: Action,
    pub candidates: Vec<Candidate>,
    /// Unprocessable rows; each counts as a failure for the run.
    pub skipped: Vec<Skipped>,
}

impl CandidateSet {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Addresses (case-insensitive) held by more than one candidate, with
    /// their rows in candidate order.
    pub fn shared_addresses(&self) -> Vec<(String, Vec<usize>)> {
        let mut by_address: Vec<(String, Vec<usize>)> = Vec::new();
        for candidate in &self.candidates {
            let address = candidate.contact.email_text().to_lowercase();
            if address.is_empty() {
                continue;
            }
            match by_address.iter_mut().find(|(seen, _)| *seen == address) {
                Some((_, rows)) => rows.push(candidate.contact.row_index),
                None => by_address.push((address, vec![candidate.contact.row_index])),
            }
        }
        by_address.retain(|(_, rows)| rows.len() > 1);
        by_address
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub response_policy: ResponsePolicy,
    /// Treat `Retry - ...` send statuses as eligible for another send.
    pub retry_transport_failures: bool,
}

/// Joins the roster with the (optional) response log.
pub struct Reconciler<'a> {
    roster: &'a RosterIndex,
    responses: Option<&'a ResponseIndex>,
    options: ReconcileOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        roster: &'a RosterIndex,
        responses: Option<&'a ResponseIndex>,
        options: ReconcileOptions,
    ) -> Self {
        Reconciler {
            roster,
            responses,
            options,
        }
    }

    /// Eligible candidates for `action`.
    ///
    /// Send and remind follow roster order; thank follows response-log order,
    /// which decides what a batch cap cuts first.
    pub fn candidates(&self, action: Action) -> CandidateSet {
        let (candidates, skipped) = match action {
            Action::Send => self.send_candidates(),
            Action::Remind => (self.remind_candidates(), Vec::new()),
            Action::Thank => (self.thank_candidates(), Vec::new()),
        };
        tracing::debug!(
            action = action.as_str(),
            candidates = candidates.len(),
            skipped = skipped.len(),
            "candidate set computed"
        );
        CandidateSet {
            action,
            candidates,
            skipped,
        }
    }

    pub fn has_responded(&self, contact: &Contact) -> bool {
        self.responses
            .is_some_and(|responses| responses.contains(&contact.identity_key()))
    }

    pub fn classify(&self, contact: &Contact) -> Stage {
        if contact.thanked_on.is_some() {
            return Stage::Thanked;
        }
        if !contact.name.is_empty() && self.has_responded(contact) {
            return Stage::Responded;
        }
        match contact.send_status {
            SendStatus::Sent if contact.reminded_on.is_some() => Stage::Reminded,
            SendStatus::Sent => Stage::Sent,
            SendStatus::Failed(_) | SendStatus::Retryable(_) => Stage::SendFailed,
            SendStatus::NotStarted => Stage::Unsent,
        }
    }

    /// Contacts per stage, every stage present.
    pub fn stage_counts(&self) -> BTreeMap<Stage, usize> {
        let mut counts: BTreeMap<Stage, usize> =
            Stage::ALL.iter().map(|stage| (*stage, 0)).collect();
        for contact in self.roster.contacts() {
            *counts.entry(self.classify(contact)).or_default() += 1;
        }
        counts
    }

    fn send_eligible(&self, status: &SendStatus) -> bool {
        match status {
            SendStatus::NotStarted => true,
            SendStatus::Retryable(_) => self.options.retry_transport_failures,
            SendStatus::Sent | SendStatus::Failed(_) => false,
        }
    }

    fn send_candidates(&self) -> (Vec<Candidate>, Vec<Skipped>) {
        let mut candidates = Vec::new();
        let mut skipped = Vec::new();
        for entry in self.roster.entries() {
            match entry {
                RosterEntry::Malformed { row_index, reason } => skipped.push(Skipped {
                    row_index: *row_index,
                    reason: reason.clone(),
                }),
                RosterEntry::Contact(contact) => {
                    if !self.send_eligible(&contact.send_status) {
                        continue;
                    }
                    if contact.name.is_empty() {
                        skipped.push(Skipped {
                            row_index: contact.row_index,
                            reason: "Empty name field".to_string(),
                        });
                        continue;
                    }
                    candidates.push(Candidate {
                        contact: contact.clone(),
                        response: None,
                    });
                }
            }
        }
        (candidates, skipped)
    }

    fn remind_candidates(&self) -> Vec<Candidate> {
        self.roster
            .contacts()
            .filter(|contact| !contact.name.is_empty())
            .filter(|contact| contact.send_status.is_sent())
            .filter(|contact| contact.reminded_on.is_none())
            .filter(|contact| !self.has_responded(contact))
            .map(|contact| Candidate {
                contact: contact.clone(),
                response: None,
            })
            .collect()
    }

    fn thank_candidates(&self) -> Vec<Candidate> {
        let Some(responses) = self.responses else {
            return Vec::new();
        };
        // Later roster rows win when two contacts share a name; the earlier
        // row is never thanked.
        let mut by_key: BTreeMap<String, &Contact> = BTreeMap::new();
        for contact in self.roster.contacts().filter(|contact| !contact.name.is_empty()) {
            if let Some(previous) = by_key.insert(contact.identity_key(), contact) {
                tracing::warn!(
                    name = %contact.name,
                    earlier_row = previous.row_index,
                    row = contact.row_index,
                    "duplicate roster name; only the later row can be thanked"
                );
            }
        }

        let mut seen = BTreeSet::new();
        let mut candidates = Vec::new();
        for record in responses.records() {
            let key = record.identity_key();
            let Some(contact) = by_key.get(&key) else {
                continue;
            };
            if contact.thanked_on.is_some() || !seen.insert(contact.row_index) {
                continue;
            }
            tracing::debug!(
                row = contact.row_index,
                response_row = record.row_index,
                responded_at = %record.timestamp,
                has_comment = !record.response_text.is_empty(),
                "thank-you candidate"
            );
            candidates.push(Candidate {
                contact: (*contact).clone(),
                response: responses
                    .lookup(&key, self.options.response_policy)
                    .cloned(),
            });
        }
        candidates
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
