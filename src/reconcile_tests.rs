use super::{Action, CandidateSet, ReconcileOptions, Reconciler, Stage};
use crate::responses::{ResponseIndex, ResponsePolicy};
use crate::roster::RosterIndex;

fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
    data.iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

const ROSTER_HEADER: &[&str] = &[
    "Name",
    "Email",
    "Org",
    "Notes",
    "Status",
    "SentDate",
    "ReminderSent",
    "ThankYouSent",
];
const RESPONSE_HEADER: &[&str] = &["Timestamp", "Name", "Response", "Comments"];

fn scenario_roster() -> RosterIndex {
    RosterIndex::from_rows(&rows(&[
        ROSTER_HEADER,
        &["Alice", "alice@x.com", "", "", ""],
        &["Bob", "bob@x.com", "", "", "Sent", "2024-01-01", ""],
        &["Carol", "carol@x.com", "", "", "Sent", "2024-01-01", "2024-01-01"],
    ]))
}

fn scenario_responses() -> ResponseIndex {
    ResponseIndex::from_rows(&rows(&[RESPONSE_HEADER, &["2024-01-03", "Bob", "Yes"]]))
}

fn row_indices(set: &CandidateSet) -> Vec<usize> {
    set.candidates
        .iter()
        .map(|candidate| candidate.contact.row_index)
        .collect()
}

fn names(reconciler: &Reconciler<'_>, action: Action) -> Vec<String> {
    reconciler
        .candidates(action)
        .candidates
        .into_iter()
        .map(|candidate| candidate.contact.name)
        .collect()
}

#[test]
fn three_contact_scenario() {
    let roster = scenario_roster();
    let responses = scenario_responses();
    let reconciler = Reconciler::new(&roster, Some(&responses), ReconcileOptions::default());

    assert!(reconciler.candidates(Action::Remind).is_empty());
    assert_eq!(names(&reconciler, Action::Send), vec!["Alice"]);
    assert_eq!(names(&reconciler, Action::Thank), vec!["Bob"]);
}

#[test]
fn missing_response_log_means_nobody_responded() {
    let roster = scenario_roster();
    let reconciler = Reconciler::new(&roster, None, ReconcileOptions::default());

    assert_eq!(names(&reconciler, Action::Remind), vec!["Bob"]);
    assert!(reconciler.candidates(Action::Thank).is_empty());
}

#[test]
fn any_non_empty_status_blocks_initial_send() {
    let roster = RosterIndex::from_rows(&rows(&[
        ROSTER_HEADER,
        &["A", "a@x.com", "", "", "Sent"],
        &["B", "b@x.com", "", "", "Failed - Invalid email format: Email missing @ symbol"],
        &["C", "c@x.com", "", "", "Retry - Transport error: timeout"],
        &["D", "d@x.com", "", "", "opted out"],
        &["E", "e@x.com"],
    ]));
    let reconciler = Reconciler::new(&roster, None, ReconcileOptions::default());
    assert_eq!(names(&reconciler, Action::Send), vec!["E"]);

    let retrying = Reconciler::new(
        &roster,
        None,
        ReconcileOptions {
            retry_transport_failures: true,
            ..ReconcileOptions::default()
        },
    );
    assert_eq!(names(&retrying, Action::Send), vec!["C", "E"]);
}

#[test]
fn unprocessable_rows_are_skipped_for_send_only() {
    let roster = RosterIndex::from_rows(&rows(&[
        ROSTER_HEADER,
        &[],
        &["", "ghost@x.com"],
        &["Dana", "dana@x.com"],
    ]));
    let reconciler = Reconciler::new(&roster, None, ReconcileOptions::default());

    let send = reconciler.candidates(Action::Send);
    assert_eq!(row_indices(&send), vec![4]);
    let skipped: Vec<_> = send.skipped.iter().map(|skip| skip.row_index).collect();
    assert_eq!(skipped, vec![2, 3]);

    assert!(reconciler.candidates(Action::Remind).skipped.is_empty());
}

#[test]
fn reminder_requires_sent_status_and_empty_reminder_date() {
    let roster = RosterIndex::from_rows(&rows(&[
        ROSTER_HEADER,
        &["Ann", "ann@x.com", "", "", "Sent", "2024-01-01"],
        &["Ben", "ben@x.com", "", "", "Failed - SMTP error", ""],
        &["Cat", "cat@x.com", "", "", "Sent", "2024-01-01", "2024-01-09"],
        &["Dee", "dee@x.com", "", "", "Sent", "2024-01-01"],
    ]));
    let responses = ResponseIndex::from_rows(&rows(&[RESPONSE_HEADER, &["t", " dee ", "No"]]));
    let reconciler = Reconciler::new(&roster, Some(&responses), ReconcileOptions::default());
    assert_eq!(names(&reconciler, Action::Remind), vec!["Ann"]);
}

#[test]
fn thank_you_follows_response_log_order_and_dedupes_rows() {
    let roster = RosterIndex::from_rows(&rows(&[
        ROSTER_HEADER,
        &["Ann", "ann@x.com", "", "", "Sent"],
        &["Ben", "ben@x.com", "", "", ""],
        &["Cat", "cat@x.com", "", "", "Sent", "", "", "2024-02-01"],
    ]));
    let responses = ResponseIndex::from_rows(&rows(&[
        RESPONSE_HEADER,
        &["t1", "Ben", "Yes"],
        &["t2", "Ann", "Yes"],
        &["t3", "Cat", "Yes"],
        &["t4", "Zed", "Yes"],
        &["t5", "ann", "No"],
    ]));
    let reconciler = Reconciler::new(&roster, Some(&responses), ReconcileOptions::default());
    let set = reconciler.candidates(Action::Thank);

    // Ben has no "Sent" status; the response log alone decides.
    assert_eq!(row_indices(&set), vec![3, 2]);
    let ann = &set.candidates[1];
    assert_eq!(
        ann.response.as_ref().map(|record| record.response_value.as_str()),
        Some("No")
    );

    let first_wins = Reconciler::new(
        &roster,
        Some(&responses),
        ReconcileOptions {
            response_policy: ResponsePolicy::First,
            ..ReconcileOptions::default()
        },
    );
    let set = first_wins.candidates(Action::Thank);
    assert_eq!(
        set.candidates[1]
            .response
            .as_ref()
            .map(|record| record.response_value.as_str()),
        Some("Yes")
    );
}

#[test]
fn every_contact_lands_in_exactly_one_stage() {
    let roster = RosterIndex::from_rows(&rows(&[
        ROSTER_HEADER,
        &["Una", "una@x.com"],
        &["Fay", "fay@x.com", "", "", "Failed - Empty email address"],
        &["Sam", "sam@x.com", "", "", "Sent", "2024-01-01"],
        &["Rex", "rex@x.com", "", "", "Sent", "2024-01-01", "2024-01-08"],
        &["Ria", "ria@x.com", "", "", "Sent", "2024-01-01", "2024-01-08"],
        &["Tom", "tom@x.com", "", "", "Sent", "2024-01-01", "", "2024-01-10"],
    ]));
    let responses = ResponseIndex::from_rows(&rows(&[
        RESPONSE_HEADER,
        &["t", "Ria", "Yes"],
        &["t", "Tom", "Yes"],
    ]));
    let reconciler = Reconciler::new(&roster, Some(&responses), ReconcileOptions::default());
    let stages: Vec<Stage> = roster
        .contacts()
        .map(|contact| reconciler.classify(contact))
        .collect();
    assert_eq!(
        stages,
        vec![
            Stage::Unsent,
            Stage::SendFailed,
            Stage::Sent,
            Stage::Reminded,
            Stage::Responded,
            Stage::Thanked,
        ]
    );
    let counts = reconciler.stage_counts();
    assert_eq!(counts.len(), Stage::ALL.len());
    assert!(counts.values().all(|count| *count == 1));
}

#[test]
fn earlier_row_sharing_a_thanked_name_is_never_thanked() {
    let roster = RosterIndex::from_rows(&rows(&[
        ROSTER_HEADER,
        &["Ann", "ann.one@x.com", "", "", "Sent", "2024-01-01"],
        &["ann ", "ann.two@x.com", "", "", "Sent", "2024-01-01", "", "2024-01-10"],
    ]));
    let responses = ResponseIndex::from_rows(&rows(&[RESPONSE_HEADER, &["t", "Ann", "Yes"]]));
    let reconciler = Reconciler::new(&roster, Some(&responses), ReconcileOptions::default());

    assert!(reconciler.candidates(Action::Thank).is_empty());
    assert!(reconciler.candidates(Action::Remind).is_empty());
}

#[test]
fn shared_addresses_are_flagged_but_both_rows_stay_candidates() {
    let roster = RosterIndex::from_rows(&rows(&[
        ROSTER_HEADER,
        &["Sam", "same@realcompany.org"],
        &["Lee", "lee@realcompany.org"],
        &["Sam Two", "SAME@realcompany.org"],
        &["Kim", ""],
    ]));
    let reconciler = Reconciler::new(&roster, None, ReconcileOptions::default());
    let set = reconciler.candidates(Action::Send);

    assert_eq!(row_indices(&set), vec![2, 3, 4, 5]);
    assert_eq!(
        set.shared_addresses(),
        vec![("same@realcompany.org".to_string(), vec![2, 4])]
    );
}
