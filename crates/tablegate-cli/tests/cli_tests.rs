//! CLI integration tests for tablegate.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for various error conditions. Nothing here reaches a
//! live database.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the tablegate binary.
fn cmd() -> Command {
    Command::cargo_bin("tablegate").unwrap()
}

/// A syntactically valid configuration pointing at nothing.
fn valid_config() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "connection:").unwrap();
    writeln!(file, "  host: 127.0.0.1").unwrap();
    writeln!(file, "  database: appdb").unwrap();
    writeln!(file, "  user: reader").unwrap();
    writeln!(file, "  password: secret").unwrap();
    file
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("tables"))
        .stdout(predicate::str::contains("schema"))
        .stdout(predicate::str::contains("rows"))
        .stdout(predicate::str::contains("insert"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("delete"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_rows_subcommand_help() {
    cmd()
        .args(["rows", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--page"))
        .stdout(predicate::str::contains("--page-size"))
        .stdout(predicate::str::contains("--order-by"))
        .stdout(predicate::str::contains("--desc"))
        .stdout(predicate::str::contains("--filter"));
}

#[test]
fn test_update_subcommand_help() {
    cmd()
        .args(["update", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--where"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tablegate"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_log_format_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"));
}

#[test]
fn test_verbosity_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"));
}

#[test]
fn test_pretty_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--pretty"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_7() {
    // Missing file is an IO error (code 7), not a config error (code 1)
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "tables"])
        .assert()
        .code(7);
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "tables"])
        .assert()
        .code(1);
}

#[test]
fn test_missing_required_fields_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    // Valid YAML but missing required connection fields
    writeln!(file, "connection:").unwrap();
    writeln!(file, "  host: localhost").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "tables"])
        .assert()
        .code(1);
}

#[test]
fn test_insert_rejects_non_object_payload() {
    let config = valid_config();
    cmd()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "insert",
            "Orders",
            "[1, 2, 3]",
        ])
        .assert()
        .code(3); // validation error, rejected before any connection attempt
}

#[test]
fn test_insert_rejects_malformed_json() {
    let config = valid_config();
    cmd()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "insert",
            "Orders",
            "{not json",
        ])
        .assert()
        .code(1);
}

// =============================================================================
// Subcommand Existence Tests
// =============================================================================

#[test]
fn test_health_check_command_exists() {
    cmd()
        .args(["health-check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Test database connectivity"));
}

#[test]
fn test_schema_table_arg_is_optional() {
    cmd()
        .args(["schema", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("omit to dump every table"));
}

#[test]
fn test_delete_requires_where_flag() {
    let config = valid_config();
    cmd()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "delete",
            "Orders",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--where"));
}

// =============================================================================
// Config Path Tests
// =============================================================================

#[test]
fn test_config_default_path() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: config.yaml]"));
}

#[test]
fn test_short_config_flag() {
    // -c should work as short for --config
    cmd()
        .args(["-c", "some_config.yaml", "--help"])
        .assert()
        .success();
}

// =============================================================================
// No Subcommand Tests
// =============================================================================

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}
