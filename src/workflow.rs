//! Command orchestration.
//!
//! Each command loads the config once, opens the collaborators it needs and
//! hands them to the core. Operator-facing lines go to stdout; diagnostics go
//! through `tracing`.
use crate::cli::{BatchArgs, InitArgs, SendArgs, StatusArgs, ValidateArgs};
use crate::config::{self, CampaignConfig, StoreConfig, TransportConfig};
use crate::error::TransportError;
use crate::google::AccessToken;
use crate::message::MessageRenderer;
use crate::reconcile::{Action, ReconcileOptions, Reconciler, Stage};
use crate::report::{self, AddressReport};
use crate::responses::ResponseIndex;
use crate::roster::{RosterIndex, SendStatus};
use crate::runner::{BatchRunner, Outcome, RunOptions};
use crate::store::{GoogleSheetsStore, SheetStore, Workbook};
use crate::transport::{GmailTransport, OutboxTransport, Transport};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;

/// Collaborators opened for one command.
struct Campaign {
    config: CampaignConfig,
    token: Option<AccessToken>,
    store: Box<dyn SheetStore>,
}

impl Campaign {
    fn open(config_path: &Path) -> Result<Self> {
        let config = config::load_config(config_path)?;
        let token = if config.needs_google_token() {
            Some(AccessToken::resolve(config.credentials.token_path.as_deref())?)
        } else {
            None
        };
        let store = open_store(&config, token.as_ref())?;
        tracing::debug!(config = %config_path.display(), "campaign opened");
        Ok(Campaign {
            config,
            token,
            store,
        })
    }

    fn roster(&self) -> Result<RosterIndex> {
        RosterIndex::load(self.store.as_ref(), &self.config.master_sheet_tab)
    }

    fn responses(&self) -> Result<Option<ResponseIndex>> {
        ResponseIndex::load_optional(self.store.as_ref(), &self.config.responses_sheet_tab)
    }

    fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            response_policy: self.config.response_policy,
            retry_transport_failures: self.config.retry_transport_failures,
        }
    }

    fn transport(&self) -> Result<Box<dyn Transport>> {
        open_transport(&self.config, self.token.as_ref())
    }
}

fn open_store(config: &CampaignConfig, token: Option<&AccessToken>) -> Result<Box<dyn SheetStore>> {
    match &config.store {
        StoreConfig::GoogleSheets { timeout_secs } => {
            let token = token
                .cloned()
                .ok_or_else(|| anyhow!("Google Sheets store needs an access token"))?;
            Ok(Box::new(GoogleSheetsStore::new(
                &config.sheet_id,
                token,
                Duration::from_secs(*timeout_secs),
            )))
        }
        StoreConfig::Workbook { path } => {
            let book = Workbook::open(path)
                .with_context(|| format!("open workbook {}", path.display()))?;
            Ok(Box::new(book))
        }
    }
}

fn open_transport(
    config: &CampaignConfig,
    token: Option<&AccessToken>,
) -> Result<Box<dyn Transport>> {
    match &config.transport {
        TransportConfig::Gmail { timeout_secs } => {
            let token = token
                .cloned()
                .ok_or_else(|| anyhow!("Gmail transport needs an access token"))?;
            Ok(Box::new(GmailTransport::new(
                token,
                Duration::from_secs(*timeout_secs),
            )))
        }
        TransportConfig::Outbox { dir } => Ok(Box::new(OutboxTransport::new(dir))),
    }
}

pub fn run_send(config_path: &Path, args: &SendArgs) -> Result<()> {
    run_action(config_path, Action::Send, &args.batch, !args.yes)
}

pub fn run_remind(config_path: &Path, args: &BatchArgs) -> Result<()> {
    run_action(config_path, Action::Remind, args, false)
}

pub fn run_thank(config_path: &Path, args: &BatchArgs) -> Result<()> {
    run_action(config_path, Action::Thank, args, false)
}

fn run_action(config_path: &Path, action: Action, args: &BatchArgs, confirm: bool) -> Result<()> {
    let mut campaign = Campaign::open(config_path)?;
    let roster = campaign.roster()?;
    if roster.is_empty() {
        println!("Warning: roster appears to be empty or only contains headers.");
    }
    let responses = match action {
        Action::Send => None,
        Action::Remind | Action::Thank => campaign.responses()?,
    };
    if action != Action::Send && responses.is_none() {
        println!(
            "Warning: responses worksheet '{}' not found; treating it as empty.",
            campaign.config.responses_sheet_tab
        );
    }

    let set =
        Reconciler::new(&roster, responses.as_ref(), campaign.reconcile_options()).candidates(action);
    let batch_size = match action {
        Action::Send => Some(args.size().unwrap_or(campaign.config.default_batch_size)),
        Action::Remind | Action::Thank => args.size(),
    };
    let processing = batch_size.unwrap_or(set.len()).min(set.len());
    println!("Found {} contacts eligible for {}.", set.len(), action.noun());
    if !set.skipped.is_empty() {
        println!("{} rows cannot be processed.", set.skipped.len());
    }
    if action == Action::Send {
        for (address, rows) in set.shared_addresses() {
            let rows: Vec<String> = rows.iter().map(usize::to_string).collect();
            println!(
                "Warning: {address} appears on rows {}; each row gets its own message.",
                rows.join(", ")
            );
        }
    }
    println!("Processing {processing} {} in this batch.", action.noun());
    if args.dry_run {
        println!("[DRY RUN] nothing will be sent and the sheet will not be updated.");
    }

    if processing > 0 && confirm && !args.dry_run && !confirm_send(processing)? {
        println!("Cancelled by user.");
        return Ok(());
    }

    let mut transport = campaign.transport()?;
    let config = &campaign.config;
    let options = RunOptions {
        batch_size,
        dry_run: args.dry_run,
        retry_transport_failures: config.retry_transport_failures,
        today: chrono::Local::now().date_naive(),
    };
    let mut runner = BatchRunner::new(
        campaign.store.as_mut(),
        transport.as_mut(),
        MessageRenderer::new(config),
        &config.master_sheet_tab,
        options,
    );
    let summary = runner.run(set, print_outcome);

    let failed_rows: Vec<String> = summary
        .outcomes
        .iter()
        .filter(|outcome| !outcome.succeeded())
        .map(|outcome| outcome.row_index.to_string())
        .collect();
    println!();
    if !failed_rows.is_empty() {
        println!("Failed rows: {}", failed_rows.join(", "));
    }
    println!("{}", summary.line());
    if summary.remaining > 0 {
        println!(
            "Remaining: {} (run again to continue)",
            summary.remaining
        );
    }
    Ok(())
}

fn print_outcome(outcome: &Outcome) {
    println!("{outcome}");
    if let Some(warning) = &outcome.warning {
        println!("  Warning: {warning}");
    }
}

fn confirm_send(count: usize) -> Result<bool> {
    print!("Ready to send {count} emails. Continue? (yes/no): ");
    io::stdout().flush().context("flush stdout")?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("read confirmation")?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

pub fn run_validate(config_path: &Path, args: &ValidateArgs) -> Result<()> {
    let campaign = Campaign::open(config_path)?;
    let roster = campaign.roster()?;
    let resolver: &dyn Fn(&str) -> Result<(), String> = &report::check_dns;
    let report = AddressReport::build(&roster, args.check_dns.then_some(resolver));
    if args.json {
        let text = serde_json::to_string_pretty(&report).context("serialize report")?;
        println!("{text}");
    } else {
        if !args.check_dns {
            println!("DNS checking: disabled (use --check-dns to enable)");
        }
        print!("{}", report.render_text());
    }
    Ok(())
}

/// Snapshot printed by `status`.
#[derive(Debug, Serialize)]
struct StatusReport {
    contacts: usize,
    stages: BTreeMap<Stage, usize>,
    responses_available: bool,
    respondents: usize,
    /// Respondents with more than one response row.
    duplicate_respondents: Vec<String>,
    pending: BTreeMap<&'static str, usize>,
    send_failures: Vec<SendFailure>,
}

#[derive(Debug, Serialize)]
struct SendFailure {
    row_index: usize,
    name: String,
    status: String,
    retryable: bool,
}

pub fn run_status(config_path: &Path, args: &StatusArgs) -> Result<()> {
    let campaign = Campaign::open(config_path)?;
    let roster = campaign.roster()?;
    let responses = campaign.responses()?;
    let reconciler = Reconciler::new(&roster, responses.as_ref(), campaign.reconcile_options());

    let pending = [Action::Send, Action::Remind, Action::Thank]
        .into_iter()
        .map(|action| (action.as_str(), reconciler.candidates(action).len()))
        .collect();
    let report = StatusReport {
        contacts: roster.contacts().count(),
        stages: reconciler.stage_counts(),
        responses_available: responses.is_some(),
        respondents: responses
            .as_ref()
            .map_or(0, |responses| responses.respondents().len()),
        duplicate_respondents: responses
            .as_ref()
            .map(|responses| {
                responses
                    .duplicated_keys()
                    .into_iter()
                    .map(|key| format!("{key} ({})", responses.all_for(key).len()))
                    .collect()
            })
            .unwrap_or_default(),
        pending,
        send_failures: roster
            .contacts()
            .filter_map(|contact| {
                let (status, retryable) = match &contact.send_status {
                    SendStatus::Failed(status) => (status.clone(), false),
                    SendStatus::Retryable(reason) => (reason.clone(), true),
                    SendStatus::NotStarted | SendStatus::Sent => return None,
                };
                Some(SendFailure {
                    row_index: contact.row_index,
                    name: contact.name.clone(),
                    status,
                    retryable,
                })
            })
            .collect(),
    };

    if args.json {
        let text = serde_json::to_string_pretty(&report).context("serialize status")?;
        println!("{text}");
        return Ok(());
    }
    println!("Contacts: {}", report.contacts);
    for (stage, count) in &report.stages {
        println!("  {:<12} {count}", stage.as_str());
    }
    if report.responses_available {
        println!("Respondents: {}", report.respondents);
    } else {
        println!("Respondents: responses worksheet not found");
    }
    if !report.duplicate_respondents.is_empty() {
        println!(
            "Multiple responses from: {}",
            report.duplicate_respondents.join(", ")
        );
    }
    for (action, count) in &report.pending {
        println!("Pending {action}: {count}");
    }
    if !report.send_failures.is_empty() {
        println!("Send failures:");
        for failure in &report.send_failures {
            let retry = if failure.retryable { " [retryable]" } else { "" };
            println!(
                "  Row {} ({}): {}{retry}",
                failure.row_index, failure.name, failure.status
            );
        }
    }
    Ok(())
}

pub fn run_check_transport(config_path: &Path) -> Result<()> {
    let campaign = Campaign::open(config_path)?;
    let mut transport = campaign.transport()?;
    let identity = transport
        .verify()
        .map_err(|err: TransportError| anyhow!("transport check failed ({}): {err}", err.kind()))?;
    println!("Transport OK: {identity}");
    Ok(())
}

pub fn run_init(config_path: &Path, args: &InitArgs) -> Result<()> {
    if config_path.is_file() && !args.force {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            config_path.display()
        ));
    }
    if let Some(parent) = config_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let stub = config::config_stub()?;
    fs::write(config_path, stub.as_bytes())
        .with_context(|| format!("write {}", config_path.display()))?;
    println!("wrote {}", config_path.display());
    Ok(())
}
