//! Shared pieces for the Google-backed store and transport.
//!
//! Both collaborators authenticate with the same OAuth access token and share
//! one HTTP agent configuration with a bounded per-request timeout.
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable that overrides the token file.
pub const ACCESS_TOKEN_ENV: &str = "OUTREACH_ACCESS_TOKEN";

/// Token file payload; `token` and `access_token` spellings are both accepted.
#[derive(Debug, Deserialize)]
struct TokenFile {
    #[serde(alias = "access_token")]
    token: String,
}

/// Bearer credential for Google APIs.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let token = token.trim();
        if token.is_empty() {
            return Err(anyhow!("access token is empty"));
        }
        Ok(AccessToken(token.to_string()))
    }

    /// Resolve the token from the environment, falling back to `token_path`.
    pub fn resolve(token_path: Option<&Path>) -> Result<Self> {
        if let Ok(raw) = env::var(ACCESS_TOKEN_ENV) {
            return Self::new(raw).with_context(|| format!("read {ACCESS_TOKEN_ENV}"));
        }
        let Some(path) = token_path else {
            return Err(anyhow!(
                "no Google credentials: set {ACCESS_TOKEN_ENV} or credentials.token_path in the config"
            ));
        };
        let bytes =
            fs::read(path).with_context(|| format!("read token file {}", path.display()))?;
        let file: TokenFile = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse token file {}", path.display()))?;
        Self::new(file.token).with_context(|| format!("token file {}", path.display()))
    }

    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// HTTP agent that hands non-2xx responses back for inspection instead of
/// turning them into errors, so API error bodies can be reported.
pub(crate) fn http_agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();
    config.into()
}
