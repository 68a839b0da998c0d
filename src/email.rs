//! Address checks applied before a contact is trusted for transmission.
//!
//! `validate_format` is a hard gate: a failing address is never submitted.
//! `classify_suspicious` is a soft signal that is reported but never blocks.
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("static email pattern")
});

/// Domains that only ever appear in placeholder or test data.
pub const SUSPICIOUS_DOMAINS: &[&str] = &[
    "example.com",
    "example.org",
    "test.com",
    "localhost",
    "invalid",
    "fake.com",
    "test.org",
    "example.net",
];

/// The first format rule an address violates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidEmail {
    Empty,
    ContainsSpaces,
    MissingAt,
    MultipleAt,
    MissingLocalPart,
    MissingDomainPart,
    DomainMissingDot,
    TldTooShort,
    PatternMismatch,
}

impl fmt::Display for InvalidEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            InvalidEmail::Empty => "Email is empty or not a string",
            InvalidEmail::ContainsSpaces => "Email contains spaces",
            InvalidEmail::MissingAt => "Email missing @ symbol",
            InvalidEmail::MultipleAt => "Email contains multiple @ symbols",
            InvalidEmail::MissingLocalPart => "Email missing local part (before @)",
            InvalidEmail::MissingDomainPart => "Email missing domain part (after @)",
            InvalidEmail::DomainMissingDot => "Domain part missing dot (e.g., .com)",
            InvalidEmail::TldTooShort => "Domain TLD too short (must be at least 2 characters)",
            InvalidEmail::PatternMismatch => "Email format does not match standard pattern",
        };
        f.write_str(text)
    }
}

impl std::error::Error for InvalidEmail {}

/// Why an otherwise valid address looks like placeholder data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suspicion {
    TestDomain(&'static str),
    LocalMatchesDomain,
    TestInBothParts,
}

impl fmt::Display for Suspicion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Suspicion::TestDomain(domain) => write!(f, "Test domain: {domain}"),
            Suspicion::LocalMatchesDomain => f.write_str("Local part matches domain part"),
            Suspicion::TestInBothParts => {
                f.write_str("Contains 'test' in both local and domain parts")
            }
        }
    }
}

/// Check an address against the format rules in order, reporting the first
/// violation only.
pub fn validate_format(address: &str) -> Result<(), InvalidEmail> {
    let address = address.trim();
    if address.is_empty() {
        return Err(InvalidEmail::Empty);
    }
    if address.chars().any(char::is_whitespace) {
        return Err(InvalidEmail::ContainsSpaces);
    }
    match address.matches('@').count() {
        0 => return Err(InvalidEmail::MissingAt),
        1 => {}
        _ => return Err(InvalidEmail::MultipleAt),
    }
    let (local, domain) = address.split_once('@').ok_or(InvalidEmail::MissingAt)?;
    if local.is_empty() {
        return Err(InvalidEmail::MissingLocalPart);
    }
    if domain.is_empty() {
        return Err(InvalidEmail::MissingDomainPart);
    }
    if !domain.contains('.') {
        return Err(InvalidEmail::DomainMissingDot);
    }
    let tld = domain.rsplit('.').next().unwrap_or_default();
    if tld.chars().count() < 2 {
        return Err(InvalidEmail::TldTooShort);
    }
    if !EMAIL_PATTERN.is_match(address) {
        return Err(InvalidEmail::PatternMismatch);
    }
    Ok(())
}

/// Flag addresses that look like test or placeholder data.
///
/// Unparseable input is never suspicious; format problems are reported by
/// [`validate_format`] instead.
pub fn classify_suspicious(address: &str) -> Option<Suspicion> {
    let lowered = address.trim().to_lowercase();
    let mut parts = lowered.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };

    for test_domain in SUSPICIOUS_DOMAINS {
        if domain == *test_domain || domain.ends_with(&format!(".{test_domain}")) {
            return Some(Suspicion::TestDomain(test_domain));
        }
    }

    let first_label = domain.split('.').next().unwrap_or_default();
    if local == first_label {
        return Some(Suspicion::LocalMatchesDomain);
    }
    if local.contains("test") && domain.contains("test") {
        return Some(Suspicion::TestInBothParts);
    }
    None
}

/// Domain portion of a syntactically valid address.
pub fn domain_of(address: &str) -> Option<&str> {
    address
        .trim()
        .split_once('@')
        .map(|(_, domain)| domain)
        .filter(|domain| !domain.is_empty())
}

#[cfg(test)]
#[path = "email_tests.rs"]
mod tests;
