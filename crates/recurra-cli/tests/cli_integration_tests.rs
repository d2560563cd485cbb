/// Black-box tests for the recurra binary.
///
/// Every test runs against its own temporary database; ids are read back
/// through `list --json`.
use predicates::prelude::*;

mod helpers;
use helpers::{entries, CliTestHarness, TestFixtures};

#[test]
fn test_cli_help_and_version() {
    let harness = CliTestHarness::new();

    harness
        .run_success(&["--help"])
        .stdout(predicate::str::contains("recurring budget entries"))
        .stdout(predicate::str::contains("preview"));

    harness
        .run_success(&["--version"])
        .stdout(predicate::str::contains("recurra"));

    harness
        .run_failure(&["invalid-command"])
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_add_one_off_entry() {
    let harness = CliTestHarness::new();

    harness
        .run_success(&["add", "Groceries", "--amount", "-54.20", "--date", "2024-03-02"])
        .stdout(predicate::str::contains("Created entry"));
    assert!(harness.db_path().exists());

    let listed = harness.list_json("2024-03-01", "2024-03-31");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["label"], "Groceries");
    assert_eq!(listed[0]["amount"], -54.2);
    assert_eq!(listed[0]["is_planned"], true);
    assert!(listed[0]["rule"].is_null());
}

#[test]
fn test_add_recurring_entry_materializes_until_end() {
    let harness = CliTestHarness::new();

    harness
        .run_success(&TestFixtures::monthly_rent_args())
        .stdout(predicate::str::contains("Created recurring entry"))
        .stdout(predicate::str::contains("4 occurrences"));

    let listed = harness.list_json("2024-01-01", "2024-12-31");
    assert_eq!(
        entries::dates(&listed),
        vec!["2024-01-15", "2024-02-15", "2024-03-15", "2024-04-15"]
    );
    assert!(entries::is_head(&listed[0]));
    assert!(listed[1..].iter().all(|entry| entry["series_id"] == listed[0]["id"]));
}

#[test]
fn test_add_rule_text_and_semi_monthly() {
    let harness = CliTestHarness::new();

    harness.run_success(&[
        "add", "Paycheck", "--amount", "1500", "--date", "2024-01-10", "--every", "semi-monthly", "--second-day",
        "25", "--until", "2024-02-29",
    ]);
    harness.run_success(&[
        "add", "Gym", "--amount", "-30", "--date", "2024-01-01", "--rule", "FREQ=WEEKLY;BYDAY=MO", "--until",
        "2024-01-22", "--unplanned",
    ]);

    let listed = harness.list_json("2024-01-01", "2024-02-29");
    let paychecks: Vec<_> = listed.iter().filter(|e| e["label"] == "Paycheck").cloned().collect();
    assert_eq!(
        entries::dates(&paychecks),
        vec!["2024-01-10", "2024-01-25", "2024-02-10", "2024-02-25"]
    );

    let gym: Vec<_> = listed.iter().filter(|e| e["label"] == "Gym").cloned().collect();
    assert_eq!(
        entries::dates(&gym),
        vec!["2024-01-01", "2024-01-08", "2024-01-15", "2024-01-22"]
    );
    assert!(gym.iter().all(|entry| entry["is_planned"] == false));
}

#[test]
fn test_add_rejects_bad_input() {
    let harness = CliTestHarness::new();

    harness
        .run_failure(&["add", "Odd", "--amount", "1", "--rule", "FREQ=HOURLY"])
        .stderr(predicate::str::contains("Invalid recurrence rule"));

    harness
        .run_failure(&["add", "Pay", "--amount", "1", "--date", "2024-01-10", "--every", "semimonthly"])
        .stderr(predicate::str::contains("second day"));

    harness
        .run_failure(&[
            "add", "Backwards", "--amount", "1", "--date", "2024-05-01", "--every", "monthly", "--until",
            "2024-04-01",
        ])
        .stderr(predicate::str::contains("Invalid input"));

    harness
        .run_failure(&["add", "Loose", "--amount", "1", "--until", "2024-04-01"])
        .stderr(predicate::str::contains("--until"));

    harness
        .run_failure(&["add", "When", "--amount", "1", "--date", "whenever you like"])
        .stderr(predicate::str::contains("Failed to parse date"));

    assert!(harness.list_json("2024-01-01", "2024-12-31").is_empty());
}

#[test]
fn test_list_table_and_label_filter() {
    let harness = CliTestHarness::new();
    harness.run_success(&TestFixtures::monthly_rent_args());
    harness.run_success(&["add", "Coffee", "--amount", "-4", "--date", "2024-02-03"]);

    harness
        .run_success(&["list", "--from", "2024-02-01", "--to", "2024-02-29"])
        .stdout(predicate::str::contains("Rent"))
        .stdout(predicate::str::contains("Coffee"))
        .stdout(predicate::str::contains("2 entries, net -904.00"));

    let rent_only = harness
        .command()
        .args(["list", "--from", "2024-01-01", "--to", "2024-12-31", "--label", "Ren", "--json"])
        .output()
        .expect("list runs");
    let rent_only: Vec<serde_json::Value> = serde_json::from_slice(&rent_only.stdout).expect("json");
    assert_eq!(rent_only.len(), 4);

    harness
        .run_success(&["list", "--from", "2030-01-01", "--to", "2030-01-31"])
        .stdout(predicate::str::contains("No entries found"));
}

#[test]
fn test_show_series_by_prefix() {
    let harness = CliTestHarness::new();
    harness.run_success(&TestFixtures::monthly_rent_args());

    let march = harness.id_of("Rent", "2024-03-15");
    harness
        .run_success(&["show", &march[..8]])
        .stdout(predicate::str::contains("monthly until 2024-04-30"))
        .stdout(predicate::str::contains("2024-01-15"))
        .stdout(predicate::str::contains("2024-04-15"));

    harness
        .run_failure(&["show", "ffffffff"])
        .stderr(predicate::str::contains("No entry found"));

    harness
        .run_failure(&["show", "f"])
        .stderr(predicate::str::contains("at least 2 characters"));

    // SQL wildcards are not id digits
    for pattern in ["%%", "__"] {
        harness
            .run_failure(&["show", pattern])
            .stderr(predicate::str::contains("No entry found"));
    }
}

#[test]
fn test_label_filter_matches_wildcards_literally() {
    let harness = CliTestHarness::new();
    harness.run_success(&TestFixtures::monthly_rent_args());
    harness.run_success(&["add", "Sale 20%", "--amount", "15", "--date", "2024-02-03"]);

    let output = harness
        .command()
        .args(["list", "--from", "2024-01-01", "--to", "2024-12-31", "--label", "%", "--json"])
        .output()
        .expect("list runs");
    let listed: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["label"], "Sale 20%");
}

#[test]
fn test_edit_future_splits_series() {
    let harness = CliTestHarness::new();
    harness.run_success(&TestFixtures::monthly_rent_args());

    let march = harness.id_of("Rent", "2024-03-15");
    harness
        .run_success(&["edit", &march, "--scope", "future", "--amount", "-950"])
        .stdout(predicate::str::contains("Updated this and future entries"));

    let listed = harness.list_json("2024-01-01", "2024-12-31");
    assert_eq!(entries::dates(&listed), vec!["2024-01-15", "2024-02-15", "2024-03-15"]);

    let head = &listed[0];
    assert_eq!(head["rule"]["end_date"], "2024-03-14");

    let split = &listed[2];
    assert!(entries::is_head(split));
    assert_eq!(split["amount"], -950.0);
    assert!(split["rule"].is_null());
}

#[test]
fn test_edit_one_and_all() {
    let harness = CliTestHarness::new();
    harness.run_success(&TestFixtures::monthly_rent_args());

    let february = harness.id_of("Rent", "2024-02-15");
    harness
        .run_success(&["edit", &february, "--scope", "one", "--label", "Rent (late)", "--date", "2024-02-18"])
        .stdout(predicate::str::contains("Updated entry"));
    assert_eq!(harness.id_of("Rent (late)", "2024-02-18"), february);

    harness
        .run_success(&["edit", &february, "--scope", "all", "--amount", "-1000", "--unplanned"])
        .stdout(predicate::str::contains("Updated entire series"));

    let listed = harness.list_json("2024-01-01", "2024-12-31");
    assert_eq!(listed.len(), 4);
    assert!(listed.iter().all(|entry| entry["amount"] == -1000.0));
    assert!(listed.iter().all(|entry| entry["is_planned"] == false));
    assert!(listed.iter().all(|entry| entry["label"] == "Rent"));
}

#[test]
fn test_edit_rejects_recurrence_change_on_one() {
    let harness = CliTestHarness::new();
    harness.run_success(&TestFixtures::monthly_rent_args());
    let january = harness.id_of("Rent", "2024-01-15");

    harness
        .run_failure(&["edit", &january, "--scope", "one", "--every", "weekly"])
        .stderr(predicate::str::contains("Invalid input"));

    harness
        .run_failure(&["edit", &january, "--scope", "all"])
        .stderr(predicate::str::contains("Nothing to change"));
}

#[test]
fn test_edit_one_off_needs_no_scope() {
    let harness = CliTestHarness::new();
    harness.run_success(&["add", "Dentist", "--amount", "-120", "--date", "2024-06-04"]);
    let id = harness.id_of("Dentist", "2024-06-04");

    harness.run_success(&["edit", &id, "--amount", "-95.5"]);
    let listed = harness.list_json("2024-06-01", "2024-06-30");
    assert_eq!(listed[0]["amount"], -95.5);
}

#[test]
fn test_delete_scopes() {
    let harness = CliTestHarness::new();
    harness.run_success(&TestFixtures::monthly_rent_args());

    let january = harness.id_of("Rent", "2024-01-15");
    harness
        .run_success(&["delete", &january, "--scope", "one", "--force"])
        .stdout(predicate::str::contains("Deleted 1 entries"))
        .stdout(predicate::str::contains("Series continues from"));

    let listed = harness.list_json("2024-01-01", "2024-12-31");
    assert_eq!(entries::dates(&listed), vec!["2024-02-15", "2024-03-15", "2024-04-15"]);
    assert!(entries::is_head(&listed[0]));
    assert_eq!(listed[0]["rule"]["frequency"], "monthly");

    let march = harness.id_of("Rent", "2024-03-15");
    harness
        .run_success(&["delete", &march, "--scope", "future", "--force"])
        .stdout(predicate::str::contains("Deleted 2 entries"));
    assert_eq!(
        entries::dates(&harness.list_json("2024-01-01", "2024-12-31")),
        vec!["2024-02-15"]
    );

    let february = harness.id_of("Rent", "2024-02-15");
    harness.run_success(&["delete", &february, "--scope", "all", "--force"]);
    assert!(harness.list_json("2024-01-01", "2024-12-31").is_empty());
}

#[test]
fn test_delete_without_confirmation_is_cancelled() {
    let harness = CliTestHarness::new();
    harness.run_success(&["add", "Lunch", "--amount", "-12", "--date", "2024-06-04"]);
    let id = harness.id_of("Lunch", "2024-06-04");

    harness
        .run_success(&["delete", &id])
        .stdout(predicate::str::contains("Deletion cancelled"));
    assert_eq!(harness.list_json("2024-06-01", "2024-06-30").len(), 1);
}

#[test]
fn test_preview_projects_without_saving() {
    let harness = CliTestHarness::new();

    harness
        .run_success(&["preview", "--every", "monthly", "--from", "2024-01-31", "--to", "2024-03-31"])
        .stdout(predicate::str::contains("2024-01-31"))
        .stdout(predicate::str::contains("2024-02-29"))
        .stdout(predicate::str::contains("2024-03-31"))
        .stdout(predicate::str::contains("3 occurrences"));

    harness
        .run_success(&["preview", "--rule", "FREQ=WEEKLY;INTERVAL=2;BYDAY=MO", "--from", "2024-01-01", "--to", "2024-01-22"])
        .stdout(predicate::str::contains("2024-01-15"))
        .stdout(predicate::str::contains("2 occurrences"));

    harness
        .run_failure(&["preview", "--from", "2024-01-01", "--to", "2024-02-01"])
        .stderr(predicate::str::contains("--every or --rule"));

    assert!(harness.list_json("2024-01-01", "2024-12-31").is_empty());
}

#[test]
fn test_workspaces_are_isolated() {
    let harness = CliTestHarness::new();
    let other = harness.in_workspace("018f2b9e-7a4c-7d3e-9b1a-2c3d4e5f6a7b");

    harness.run_success(&["add", "Mine", "--amount", "10", "--date", "2024-06-01"]);
    other.run_success(&["add", "Theirs", "--amount", "20", "--date", "2024-06-01"]);

    let mine = harness.list_json("2024-06-01", "2024-06-30");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["label"], "Mine");

    let theirs_id = other.id_of("Theirs", "2024-06-01");
    harness
        .run_failure(&["show", &theirs_id])
        .stderr(predicate::str::contains("not found"));
}
