//! Campaign configuration.
//!
//! The config is read once at startup, validated, and passed by reference to
//! every component; nothing downstream reads the environment on its own.
use crate::email::validate_format;
use crate::responses::ResponsePolicy;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "campaign.json";
const DEFAULT_SUBJECT: &str = "Support Needed: Grant Initiative";
const DEFAULT_BATCH_SIZE: usize = 50;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignConfig {
    pub sheet_id: String,
    pub master_sheet_tab: String,
    pub responses_sheet_tab: String,
    pub form_base_url: String,
    pub name_field_id: String,
    pub grant_deadline: String,
    #[serde(default)]
    pub image_url: String,
    pub sender_name: String,
    pub sender_email: String,
    /// Subject line of the initial solicitation.
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub response_policy: ResponsePolicy,
    /// Persist send-time transport failures as retryable instead of final.
    #[serde(default)]
    pub retry_transport_failures: bool,
    /// Batch cap for the send action when `--size` is not given.
    #[serde(default = "default_batch_size")]
    pub default_batch_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum StoreConfig {
    GoogleSheets {
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    Workbook {
        path: PathBuf,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::GoogleSheets {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum TransportConfig {
    Gmail {
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    Outbox {
        dir: PathBuf,
    },
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig::Gmail {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_path: Option<PathBuf>,
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl CampaignConfig {
    /// True when a Google access token must be resolved before running.
    pub fn needs_google_token(&self) -> bool {
        matches!(self.store, StoreConfig::GoogleSheets { .. })
            || matches!(self.transport, TransportConfig::Gmail { .. })
    }

    /// Rebase relative file paths onto the directory holding the config.
    fn resolve_paths(&mut self, base: &Path) {
        let rebase = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        if let StoreConfig::Workbook { path } = &mut self.store {
            rebase(path);
        }
        if let TransportConfig::Outbox { dir } = &mut self.transport {
            rebase(dir);
        }
        if let Some(path) = &mut self.credentials.token_path {
            rebase(path);
        }
    }
}

/// Config used by `init`; every value is a placeholder to edit.
pub fn default_config() -> CampaignConfig {
    CampaignConfig {
        sheet_id: "your-google-sheet-id".to_string(),
        master_sheet_tab: "Master".to_string(),
        responses_sheet_tab: "Responses".to_string(),
        form_base_url: "https://docs.google.com/forms/d/e/your-form-id/viewform".to_string(),
        name_field_id: "0000000000".to_string(),
        grant_deadline: "March 1".to_string(),
        image_url: String::new(),
        sender_name: "Your Name".to_string(),
        sender_email: "you@yourdomain.org".to_string(),
        subject: default_subject(),
        store: StoreConfig::default(),
        transport: TransportConfig::default(),
        credentials: CredentialsConfig {
            token_path: Some(PathBuf::from("token.json")),
        },
        response_policy: ResponsePolicy::default(),
        retry_transport_failures: false,
        default_batch_size: DEFAULT_BATCH_SIZE,
    }
}

/// Pretty JSON stub written by `init`.
pub fn config_stub() -> Result<String> {
    serde_json::to_string_pretty(&default_config()).context("serialize config stub")
}

/// Pick the config path: the working directory first, then the user config dir.
pub fn default_config_path() -> PathBuf {
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.is_file() {
        return local;
    }
    dirs::config_dir()
        .map(|dir| dir.join("outreach").join(DEFAULT_CONFIG_FILE))
        .filter(|path| path.is_file())
        .unwrap_or(local)
}

/// Load, path-resolve, and validate the config at `path`.
pub fn load_config(path: &Path) -> Result<CampaignConfig> {
    let bytes = fs::read(path).with_context(|| {
        format!(
            "read config {} (run `outreach init` to create one)",
            path.display()
        )
    })?;
    let mut config: CampaignConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    let base = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base);
    validate_config(&config).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

pub fn validate_config(config: &CampaignConfig) -> Result<()> {
    let required = [
        ("sheet_id", &config.sheet_id),
        ("master_sheet_tab", &config.master_sheet_tab),
        ("responses_sheet_tab", &config.responses_sheet_tab),
        ("form_base_url", &config.form_base_url),
        ("name_field_id", &config.name_field_id),
        ("grant_deadline", &config.grant_deadline),
        ("sender_name", &config.sender_name),
        ("sender_email", &config.sender_email),
        ("subject", &config.subject),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(anyhow!("{field} must be non-empty"));
        }
    }
    if config.master_sheet_tab.trim() == config.responses_sheet_tab.trim() {
        return Err(anyhow!(
            "master_sheet_tab and responses_sheet_tab must name different tabs"
        ));
    }
    validate_format(&config.sender_email)
        .map_err(|reason| anyhow!("sender_email is invalid: {reason}"))?;
    let form_url = Url::parse(&config.form_base_url)
        .with_context(|| format!("form_base_url is not a URL: {}", config.form_base_url))?;
    if form_url.scheme() != "https" && form_url.scheme() != "http" {
        return Err(anyhow!("form_base_url must be an http(s) URL"));
    }
    if config.default_batch_size == 0 {
        return Err(anyhow!("default_batch_size must be at least 1"));
    }
    for timeout in [store_timeout(&config.store), transport_timeout(&config.transport)]
        .into_iter()
        .flatten()
    {
        if timeout == 0 {
            return Err(anyhow!("timeout_secs must be at least 1"));
        }
    }
    Ok(())
}

fn store_timeout(store: &StoreConfig) -> Option<u64> {
    match store {
        StoreConfig::GoogleSheets { timeout_secs } => Some(*timeout_secs),
        StoreConfig::Workbook { .. } => None,
    }
}

fn transport_timeout(transport: &TransportConfig) -> Option<u64> {
    match transport {
        TransportConfig::Gmail { timeout_secs } => Some(*timeout_secs),
        TransportConfig::Outbox { .. } => None,
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
