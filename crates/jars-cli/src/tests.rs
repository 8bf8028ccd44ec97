//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::collections::HashSet;

use clap::Parser;
use jars_core::{JarCode, JarSettings, Notification, Store};
use tempfile::TempDir;

use crate::cli::{Cli, Commands};
use crate::commands::{self, format_amount};

fn setup_test_store(dir: &TempDir) -> Store {
    commands::open_store(&dir.path().join("db.json")).unwrap()
}

fn notification(id: &str, status: u8) -> Notification {
    Notification {
        notification_id: id.into(),
        title: format!("Title {}", id),
        status,
        ..Default::default()
    }
}

// ========== Helper Tests ==========

#[test]
fn test_format_amount() {
    assert_eq!(format_amount(0.0), "0");
    assert_eq!(format_amount(150000.0), "150,000");
    assert_eq!(format_amount(1234567.5), "1,234,567.50");
    assert_eq!(format_amount(-2000.0), "-2,000");
    assert_eq!(format_amount(999.0), "999");
}

#[test]
fn test_data_file_path_prefers_flag() {
    let dir = TempDir::new().unwrap();
    let explicit = dir.path().join("custom.json");
    assert_eq!(commands::data_file_path(Some(&explicit)), explicit);
    assert!(commands::data_file_path(None).ends_with("db.json"));
}

// ========== Init Tests ==========

#[test]
fn test_cmd_init_seeds_and_writes_config() {
    let dir = TempDir::new().unwrap();
    let data_file = dir.path().join("db.json");
    let config_path = dir.path().join("config").join("jars.toml");

    commands::cmd_init(&data_file, &config_path, false).unwrap();

    assert!(data_file.exists());
    assert!(config_path.exists());
    let settings = JarSettings::load_from(&config_path).unwrap();
    assert_eq!(settings.percent(JarCode::Nec), 55.0);
    assert!(settings.is_balanced());
}

#[test]
fn test_cmd_init_force_reseeds() {
    let dir = TempDir::new().unwrap();
    let data_file = dir.path().join("db.json");
    let config_path = dir.path().join("jars.toml");

    commands::cmd_init(&data_file, &config_path, false).unwrap();
    let store = commands::open_store(&data_file).unwrap();
    store
        .remove::<jars_core::Goal>("goal-001")
        .unwrap();
    drop(store);

    // Without --force the edited file is kept
    commands::cmd_init(&data_file, &config_path, false).unwrap();
    let goals: Vec<jars_core::Goal> = commands::open_store(&data_file).unwrap().list().unwrap();
    assert!(goals.is_empty());

    commands::cmd_init(&data_file, &config_path, true).unwrap();
    let goals: Vec<jars_core::Goal> = commands::open_store(&data_file).unwrap().list().unwrap();
    assert_eq!(goals.len(), 1);
}

#[test]
fn test_write_default_config_keeps_existing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("jars.toml");
    std::fs::write(&path, "fallback = \"random\"\n").unwrap();

    let written = commands::write_default_config(&path).unwrap();

    assert!(!written);
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content, "fallback = \"random\"\n");
}

#[test]
fn test_load_settings_missing_file_is_error() {
    let dir = TempDir::new().unwrap();
    let result = commands::load_settings(Some(&dir.path().join("nope.toml")));
    assert!(result.is_err());
}

// ========== Report Tests ==========

#[test]
fn test_budget_report_for_month() {
    let dir = TempDir::new().unwrap();
    let store = setup_test_store(&dir);

    let report = commands::budget_report(&store, &JarSettings::default(), Some("2024-06")).unwrap();

    assert_eq!(report.total_expense, 6_550_000.0);
    let nec = report.jar(JarCode::Nec).unwrap();
    assert_eq!(nec.spent, 1_350_000.0);
    let ply = report.jar(JarCode::Ply).unwrap();
    assert!(ply.is_exceeded());
    assert_eq!(report.exceeded().count(), 1);
}

#[test]
fn test_budget_report_rejects_bad_month() {
    let dir = TempDir::new().unwrap();
    let store = setup_test_store(&dir);

    let result = commands::budget_report(&store, &JarSettings::default(), Some("2024-13"));
    assert!(result.is_err());
}

#[test]
fn test_cmd_budget_and_goals_print() {
    let dir = TempDir::new().unwrap();
    let store = setup_test_store(&dir);
    let settings = JarSettings::default();

    assert!(commands::cmd_budget(&store, &settings, None, false).is_ok());
    assert!(commands::cmd_budget(&store, &settings, Some("2024-06"), true).is_ok());
    assert!(commands::cmd_goals(&store, false).is_ok());
    assert!(commands::cmd_goals(&store, true).is_ok());
}

#[test]
fn test_goals_report_with_eta() {
    let dir = TempDir::new().unwrap();
    let store = setup_test_store(&dir);

    let goals = commands::goals_report(&store).unwrap();

    assert_eq!(goals.len(), 1);
    assert_eq!(goals[0].percent, 20.0);
    // One month with a 2,000,000 deposit; 8,000,000 left
    assert_eq!(goals[0].eta_months, Some(4));
}

#[test]
fn test_cmd_classify_and_allocate() {
    let settings = JarSettings::default();
    assert!(commands::cmd_classify(&settings, "Học phí tháng 9").is_ok());
    assert!(commands::cmd_allocate(&settings, 10_000_000.0).is_ok());
    assert!(commands::cmd_allocate(&settings, -1.0).is_err());
}

// ========== Notification Tests ==========

#[test]
fn test_new_notifications_reports_each_once() {
    let mut seen = HashSet::new();

    let first = commands::new_notifications(&mut seen, &[notification("a", 0), notification("b", 1)]);
    assert_eq!(first.len(), 2);

    let second =
        commands::new_notifications(&mut seen, &[notification("a", 1), notification("c", 0)]);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].notification_id, "c");
}

#[test]
fn test_api_client_uses_given_url() {
    let client = commands::api_client("http://example.test/api/");
    assert_eq!(client.base_url(), "http://example.test/api");
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_serve_flags() {
    let cli = Cli::try_parse_from([
        "jars",
        "serve",
        "--port",
        "8080",
        "--no-auth",
        "--gateway",
        "http://gw.test",
        "--allowed-origins",
        "http://a.test,http://b.test",
    ])
    .unwrap();

    match cli.command {
        Commands::Serve {
            port,
            no_auth,
            gateway,
            allowed_origins,
            ..
        } => {
            assert_eq!(port, 8080);
            assert!(no_auth);
            assert_eq!(gateway.as_deref(), Some("http://gw.test"));
            assert_eq!(allowed_origins, vec!["http://a.test", "http://b.test"]);
        }
        _ => panic!("expected serve"),
    }
}

#[test]
fn test_parse_budget_and_classify() {
    let cli = Cli::try_parse_from(["jars", "budget", "-m", "2024-06", "--json"]).unwrap();
    match cli.command {
        Commands::Budget { month, income, json } => {
            assert_eq!(month.as_deref(), Some("2024-06"));
            assert!(income.is_none());
            assert!(json);
        }
        _ => panic!("expected budget"),
    }

    let cli = Cli::try_parse_from(["jars", "classify", "Grab", "taxi"]).unwrap();
    match cli.command {
        Commands::Classify { description } => assert_eq!(description.join(" "), "Grab taxi"),
        _ => panic!("expected classify"),
    }

    assert!(Cli::try_parse_from(["jars", "classify"]).is_err());
}
