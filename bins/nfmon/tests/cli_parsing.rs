//! CLI argument parsing tests for nfmon.
//!
//! These tests verify that command-line arguments are correctly parsed
//! without requiring network access or root privileges.

use assert_cmd::Command;
use predicates::prelude::*;

fn nfmon_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_nfmon"))
}

#[test]
fn test_help() {
    nfmon_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Netfilter netlink event monitor"));
}

#[test]
fn test_version() {
    nfmon_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nfmon"));
}

#[test]
fn test_missing_subcommand() {
    nfmon_cmd().assert().failure();
}

#[test]
fn test_monitor_help_lists_groups() {
    nfmon_cmd()
        .args(["monitor", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ct-destroy"));
}

#[test]
fn test_unknown_group() {
    nfmon_cmd()
        .args(["monitor", "--group", "bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown multicast group: bogus"));
}

#[test]
fn test_dump_family_conflict() {
    nfmon_cmd()
        .args(["dump", "-4", "-6"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_missing_namespace() {
    nfmon_cmd()
        .args(["--netns", "nfmon-test-does-not-exist", "dump"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nfmon-test-does-not-exist"));
}
