//! Shared test infrastructure for integration tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

pub type Sheets = BTreeMap<String, Vec<Vec<String>>>;

pub const ROSTER_HEADER: &[&str] = &[
    "Name",
    "Email",
    "Organization",
    "Notes",
    "Status",
    "SentDate",
    "ReminderSent",
    "ThankYouSent",
];

/// A campaign directory with a workbook store and an outbox transport.
pub struct CampaignFixture {
    dir: TempDir,
}

impl CampaignFixture {
    pub fn new(roster: &[&[&str]], responses: Option<&[&[&str]]>) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut sheets = Sheets::new();
        let mut master = vec![to_row(ROSTER_HEADER)];
        master.extend(roster.iter().map(|row| to_row(row)));
        sheets.insert("Master".to_string(), master);
        if let Some(responses) = responses {
            let mut log = vec![to_row(&["Timestamp", "Name", "Response", "Comments"])];
            log.extend(responses.iter().map(|row| to_row(row)));
            sheets.insert("Responses".to_string(), log);
        }
        fs::write(
            dir.path().join("workbook.json"),
            serde_json::to_vec_pretty(&sheets).expect("serialize workbook"),
        )
        .expect("write workbook");

        let config = serde_json::json!({
            "sheet_id": "local",
            "master_sheet_tab": "Master",
            "responses_sheet_tab": "Responses",
            "form_base_url": "https://docs.google.com/forms/d/e/test-form/viewform",
            "name_field_id": "123456",
            "grant_deadline": "March 1",
            "sender_name": "Grant Team",
            "sender_email": "team@realcompany.org",
            "store": { "kind": "workbook", "path": "workbook.json" },
            "transport": { "kind": "outbox", "dir": "outbox" }
        });
        fs::write(
            dir.path().join("campaign.json"),
            serde_json::to_vec_pretty(&config).expect("serialize config"),
        )
        .expect("write config");
        CampaignFixture { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.root().join("campaign.json")
    }

    /// Run the binary against this campaign's config.
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_outreach"))
            .arg("--config")
            .arg(self.config_path())
            .args(args)
            .current_dir(self.root())
            .env_remove("OUTREACH_ACCESS_TOKEN")
            .env_remove("RUST_LOG")
            .stdin(Stdio::null())
            .output()
            .expect("run outreach")
    }

    pub fn workbook(&self) -> Sheets {
        let bytes = fs::read(self.root().join("workbook.json")).expect("read workbook");
        serde_json::from_slice(&bytes).expect("parse workbook")
    }

    /// Cell of the roster tab; empty when the row or column is absent.
    pub fn roster_cell(&self, row: usize, column: usize) -> String {
        self.workbook()
            .get("Master")
            .and_then(|rows| rows.get(row - 1))
            .and_then(|cells| cells.get(column))
            .cloned()
            .unwrap_or_default()
    }

    pub fn outbox_messages(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.root().join("outbox")) else {
            return Vec::new();
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "eml"))
            .collect();
        paths.sort();
        paths
            .iter()
            .map(|path| fs::read_to_string(path).expect("read message"))
            .collect()
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "outreach failed: {}\nstdout:\n{}\nstderr:\n{}",
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn to_row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|cell| cell.to_string()).collect()
}
