//! Roster-wide address report for the `validate` command.
//!
//! The report is read-only: it never writes back to the roster and never
//! talks to the transport.
use crate::email::{classify_suspicious, domain_of, validate_format};
use crate::roster::{RosterEntry, RosterIndex};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::net::ToSocketAddrs;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    pub row_index: usize,
    pub email: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingAddress {
    pub row_index: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Duplicate {
    /// Spelling from the first row it appears in.
    pub email: String,
    pub rows: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddressReport {
    pub checked: usize,
    pub valid: usize,
    pub invalid: Vec<RowIssue>,
    pub missing: Vec<MissingAddress>,
    pub suspicious: Vec<RowIssue>,
    pub dns_checked: bool,
    pub dns_failures: Vec<RowIssue>,
    pub duplicates: Vec<Duplicate>,
    pub recommendations: Vec<String>,
}

/// Resolve `domain` through the system resolver.
pub fn check_dns(domain: &str) -> Result<(), String> {
    match (domain, 0).to_socket_addrs() {
        Ok(mut addrs) => match addrs.next() {
            Some(_) => Ok(()),
            None => Err("Domain not found (DNS lookup returned no addresses)".to_string()),
        },
        Err(err) => Err(format!("Domain not found (DNS lookup failed): {err}")),
    }
}

impl AddressReport {
    /// Check every roster row. `dns` runs once per distinct domain of a
    /// well-formed address when given.
    pub fn build(roster: &RosterIndex, dns: Option<&dyn Fn(&str) -> Result<(), String>>) -> Self {
        let mut report = AddressReport {
            checked: roster.len(),
            dns_checked: dns.is_some(),
            ..AddressReport::default()
        };
        let mut by_address: Vec<(String, Duplicate)> = Vec::new();
        let mut dns_cache: BTreeMap<String, Result<(), String>> = BTreeMap::new();

        for entry in roster.entries() {
            let contact = match entry {
                RosterEntry::Contact(contact) => contact,
                RosterEntry::Malformed { row_index, .. } => {
                    report.missing.push(MissingAddress {
                        row_index: *row_index,
                        name: String::new(),
                    });
                    continue;
                }
            };
            let email = contact.email_text();
            if email.is_empty() {
                report.missing.push(MissingAddress {
                    row_index: contact.row_index,
                    name: contact.name.clone(),
                });
                continue;
            }

            let key = email.to_lowercase();
            match by_address.iter_mut().find(|(seen, _)| *seen == key) {
                Some((_, duplicate)) => duplicate.rows.push(contact.row_index),
                None => by_address.push((
                    key,
                    Duplicate {
                        email: email.to_string(),
                        rows: vec![contact.row_index],
                    },
                )),
            }

            if let Err(reason) = validate_format(email) {
                report.invalid.push(RowIssue {
                    row_index: contact.row_index,
                    email: email.to_string(),
                    reason: reason.to_string(),
                });
                continue;
            }
            if let Some(suspicion) = classify_suspicious(email) {
                report.suspicious.push(RowIssue {
                    row_index: contact.row_index,
                    email: email.to_string(),
                    reason: suspicion.to_string(),
                });
            }
            if let (Some(resolve), Some(domain)) = (dns, domain_of(email)) {
                let domain = domain.to_lowercase();
                let result = dns_cache
                    .entry(domain)
                    .or_insert_with_key(|domain| resolve(domain.as_str()));
                if let Err(reason) = result {
                    report.dns_failures.push(RowIssue {
                        row_index: contact.row_index,
                        email: email.to_string(),
                        reason: reason.clone(),
                    });
                }
            }
            report.valid += 1;
        }

        report.duplicates = by_address
            .into_iter()
            .map(|(_, duplicate)| duplicate)
            .filter(|duplicate| duplicate.rows.len() > 1)
            .collect();
        report.recommendations = report.recommend();
        tracing::debug!(
            checked = report.checked,
            valid = report.valid,
            invalid = report.invalid.len(),
            "address report built"
        );
        report
    }

    fn recommend(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.invalid.is_empty() {
            out.push(format!(
                "Fix {} invalid format email(s) before sending",
                self.invalid.len()
            ));
        }
        if !self.missing.is_empty() {
            out.push(format!(
                "Add email addresses for {} missing entry/entries",
                self.missing.len()
            ));
        }
        if !self.suspicious.is_empty() {
            out.push(format!(
                "Review {} suspicious/test email(s)",
                self.suspicious.len()
            ));
        }
        if !self.dns_failures.is_empty() {
            out.push(format!(
                "Verify {} domain(s) that failed DNS lookup",
                self.dns_failures.len()
            ));
        }
        if !self.duplicates.is_empty() {
            out.push(format!(
                "Remove or update {} duplicate email(s)",
                self.duplicates.len()
            ));
        }
        out
    }

    /// Human-readable rendering used when `--json` is not given.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Total emails checked: {}", self.checked);
        let _ = writeln!(out, "Valid emails: {}", self.valid);
        let _ = writeln!(out, "Invalid format: {}", self.invalid.len());
        let _ = writeln!(out, "Missing emails: {}", self.missing.len());
        let _ = writeln!(out, "Suspicious/test emails: {}", self.suspicious.len());
        if self.dns_checked {
            let _ = writeln!(out, "DNS failures: {}", self.dns_failures.len());
        }
        let _ = writeln!(out, "Duplicate emails: {}", self.duplicates.len());

        push_issues(&mut out, "INVALID FORMAT", &self.invalid);
        if !self.missing.is_empty() {
            let _ = writeln!(out, "\nMISSING EMAILS:");
            for missing in &self.missing {
                let name = if missing.name.is_empty() {
                    "(no name)"
                } else {
                    missing.name.as_str()
                };
                let _ = writeln!(
                    out,
                    "  Row {}: {name} (empty email field)",
                    missing.row_index
                );
            }
        }
        push_issues(&mut out, "SUSPICIOUS/TEST EMAILS", &self.suspicious);
        push_issues(&mut out, "DNS FAILURES", &self.dns_failures);
        if !self.duplicates.is_empty() {
            let _ = writeln!(out, "\nDUPLICATE EMAILS:");
            for duplicate in &self.duplicates {
                let rows: Vec<String> = duplicate.rows.iter().map(usize::to_string).collect();
                let _ = writeln!(
                    out,
                    "  {} appears in rows: {}",
                    duplicate.email,
                    rows.join(", ")
                );
            }
        }

        let _ = writeln!(out, "\nRecommendations:");
        if self.recommendations.is_empty() {
            let _ = writeln!(out, "All emails are valid! No issues found.");
        }
        for recommendation in &self.recommendations {
            let _ = writeln!(out, "- {recommendation}");
        }
        out
    }
}

fn push_issues(out: &mut String, title: &str, issues: &[RowIssue]) {
    if issues.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{title}:");
    for issue in issues {
        let _ = writeln!(
            out,
            "  Row {}: {} ({})",
            issue.row_index, issue.email, issue.reason
        );
    }
}
