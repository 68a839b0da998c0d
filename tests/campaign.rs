mod common;

use common::{assert_success, stdout, CampaignFixture};

fn roster() -> Vec<&'static [&'static str]> {
    vec![
        &["Alice", "alice@realcompany.org"],
        &["Bob", "bob@realcompany.org", "", "", "Sent", "2024-01-01"],
        &["Carol", "carol@realcompany.org", "", "", "Sent", "2024-01-01", "2024-01-08"],
        &["Dan", "dan@realcompany"],
    ]
}

#[test]
fn dry_run_send_leaves_the_workbook_untouched() {
    let fixture = CampaignFixture::new(&roster(), None);
    let before = fixture.workbook();

    let output = fixture.run(&["send", "--dry-run"]);
    assert_success(&output);
    let text = stdout(&output);
    assert!(text.contains("Found 2 contacts eligible for emails."), "{text}");
    assert!(text.contains("[DRY RUN]"), "{text}");
    assert!(text.contains("Sent: 1, Failed: 1"), "{text}");

    assert_eq!(fixture.workbook(), before);
    assert!(fixture.outbox_messages().is_empty());
}

#[test]
fn live_send_records_status_and_is_idempotent() {
    let fixture = CampaignFixture::new(&roster(), None);

    let output = fixture.run(&["send", "--yes"]);
    assert_success(&output);
    assert!(stdout(&output).contains("Sent: 1, Failed: 1"));
    assert_eq!(fixture.roster_cell(2, 4), "Sent");
    assert_eq!(fixture.roster_cell(2, 5).len(), "2024-01-01".len());
    assert_eq!(
        fixture.roster_cell(5, 4),
        "Failed - Invalid email format: Domain part missing dot (e.g., .com)"
    );

    let messages = fixture.outbox_messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("To: alice@realcompany.org"));
    assert!(messages[0].contains("Subject: Support Needed: Grant Initiative"));

    let output = fixture.run(&["send", "--yes"]);
    assert_success(&output);
    let text = stdout(&output);
    assert!(text.contains("Found 0 contacts eligible"), "{text}");
    assert!(text.contains("Sent: 0, Failed: 0"), "{text}");
    assert_eq!(fixture.outbox_messages().len(), 1);
}

#[test]
fn send_without_confirmation_is_cancelled() {
    let fixture = CampaignFixture::new(&roster(), None);

    let output = fixture.run(&["send"]);
    assert_success(&output);
    assert!(stdout(&output).contains("Cancelled by user."));
    assert_eq!(fixture.roster_cell(2, 4), "");
}

#[test]
fn batch_size_reports_remaining() {
    let fixture = CampaignFixture::new(
        &[
            &["A", "a@realcompany.org"],
            &["B", "b@realcompany.org"],
            &["C", "c@realcompany.org"],
        ],
        None,
    );

    let output = fixture.run(&["send", "--yes", "--size", "1"]);
    assert_success(&output);
    let text = stdout(&output);
    assert!(text.contains("Processing 1 emails in this batch."), "{text}");
    assert!(text.contains("Remaining: 2"), "{text}");
    assert_eq!(fixture.roster_cell(3, 4), "");
}

#[test]
fn remind_skips_responders_and_thank_follows_the_log() {
    let fixture = CampaignFixture::new(
        &[
            &["Bob", "bob@realcompany.org", "", "", "Sent", "2024-01-01"],
            &["Eve", "eve@realcompany.org", "", "", "Sent", "2024-01-01"],
        ],
        Some(&[&["2024-01-03 10:00", "bob", "No", "busy"]]),
    );

    let output = fixture.run(&["remind"]);
    assert_success(&output);
    assert!(stdout(&output).contains("Reminders sent: 1, Failed: 0"));
    assert_eq!(fixture.roster_cell(2, 6), "");
    assert_ne!(fixture.roster_cell(3, 6), "");

    let output = fixture.run(&["thank"]);
    assert_success(&output);
    assert!(stdout(&output).contains("Thank yous sent: 1, Failed: 0"));
    assert_ne!(fixture.roster_cell(2, 7), "");

    let messages = fixture.outbox_messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("Subject: Reminder: Grant Support Needed by March 1"));
    assert!(messages[1].contains("Subject: Thank You for Your Feedback"));
}

#[test]
fn remind_without_response_tab_treats_everyone_as_silent() {
    let fixture = CampaignFixture::new(&roster(), None);

    let output = fixture.run(&["remind", "--dry-run"]);
    assert_success(&output);
    let text = stdout(&output);
    assert!(text.contains("not found"), "{text}");
    assert!(text.contains("Reminders sent: 1, Failed: 0"), "{text}");
}

#[test]
fn validate_json_reports_every_category() {
    let fixture = CampaignFixture::new(
        &[
            &["Alice", "alice@realcompany.org"],
            &["Bob", ""],
            &["Tess", "test@test.com"],
            &["Alice B", "ALICE@realcompany.org"],
        ],
        None,
    );

    let output = fixture.run(&["validate", "--json"]);
    assert_success(&output);
    let report: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("validate --json emits JSON");
    assert_eq!(report["checked"], 4);
    assert_eq!(report["valid"], 3);
    assert_eq!(report["missing"][0]["row_index"], 3);
    assert_eq!(report["suspicious"][0]["reason"], "Test domain: test.com");
    assert_eq!(report["duplicates"][0]["rows"], serde_json::json!([2, 5]));
}

#[test]
fn status_json_counts_stages() {
    let fixture = CampaignFixture::new(
        &[
            &["Alice", "alice@realcompany.org"],
            &["Bob", "bob@realcompany.org", "", "", "Sent", "2024-01-01"],
            &["Carol", "carol@realcompany.org", "", "", "Sent", "2024-01-01", "2024-01-08"],
            &["Dan", "dan@realcompany", "", "", "Failed - Invalid email format: x"],
        ],
        Some(&[&["t", "Bob", "Yes"]]),
    );

    let output = fixture.run(&["status", "--json"]);
    assert_success(&output);
    let status: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("status --json emits JSON");
    assert_eq!(status["contacts"], 4);
    assert_eq!(status["stages"]["unsent"], 1);
    assert_eq!(status["stages"]["responded"], 1);
    assert_eq!(status["stages"]["reminded"], 1);
    assert_eq!(status["stages"]["send_failed"], 1);
    assert_eq!(status["pending"]["send"], 1);
    assert_eq!(status["pending"]["remind"], 0);
    assert_eq!(status["pending"]["thank"], 1);
    assert_eq!(status["send_failures"][0]["row_index"], 5);
}

#[test]
fn check_transport_reports_the_outbox() {
    let fixture = CampaignFixture::new(&roster(), None);

    let output = fixture.run(&["check-transport"]);
    assert_success(&output);
    assert!(stdout(&output).contains("Transport OK: outbox"));
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let fixture = CampaignFixture::new(&roster(), None);

    let output = fixture.run(&["init"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--force"));

    let output = fixture.run(&["init", "--force"]);
    assert_success(&output);
    let text = std::fs::read_to_string(fixture.config_path()).expect("read config");
    assert!(text.contains("\"default_batch_size\": 50"));
}

#[test]
fn missing_config_is_a_fatal_error() {
    let fixture = CampaignFixture::new(&roster(), None);
    std::fs::remove_file(fixture.config_path()).expect("remove config");

    let output = fixture.run(&["status"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("outreach init"));
}

#[test]
fn send_warns_about_addresses_shared_between_rows() {
    let fixture = CampaignFixture::new(
        &[
            &["Sam", "same@realcompany.org"],
            &["Sam Two", "SAME@realcompany.org"],
        ],
        None,
    );

    let output = fixture.run(&["send", "--dry-run"]);
    assert_success(&output);
    let text = stdout(&output);
    assert!(
        text.contains("Warning: same@realcompany.org appears on rows 2, 3"),
        "{text}"
    );
    assert!(text.contains("Sent: 2, Failed: 0"), "{text}");
}
