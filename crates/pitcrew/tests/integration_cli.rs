//! Integration tests for the CLI surface: help, usage, and environment
//! diagnostics.

use assert_cmd::cargo;
use predicates::prelude::*;

fn pitcrew() -> assert_cmd::Command {
    let mut cmd = cargo::cargo_bin_cmd!("pitcrew");
    // Isolate from any real credentials in the developer's environment.
    cmd.env_remove("BUILDKITE_ORGANIZATION")
        .env_remove("BUILDKITE_API_TOKEN")
        .env_remove("TEAMCITY_URL")
        .env_remove("TEAMCITY_USER")
        .env_remove("TEAMCITY_PASSWORD");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    pitcrew()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("buildkite"))
        .stdout(predicate::str::contains("teamcity"))
        .stdout(predicate::str::contains("cluster"));
}

#[test]
fn test_version_flag() {
    pitcrew()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pitcrew"));
}

#[test]
fn test_no_args_shows_usage() {
    pitcrew()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_buildkite_requires_organization() {
    pitcrew()
        .args(["buildkite", "rebuild-cancelled", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("BUILDKITE_ORGANIZATION"));
}

#[test]
fn test_buildkite_requires_token() {
    pitcrew()
        .env("BUILDKITE_ORGANIZATION", "acme")
        .args(["buildkite", "rebuild-cancelled", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("BUILDKITE_API_TOKEN"));
}

#[test]
fn test_buildkite_rejects_bad_since() {
    pitcrew()
        .env("BUILDKITE_ORGANIZATION", "acme")
        .env("BUILDKITE_API_TOKEN", "bkua_token")
        .args([
            "buildkite",
            "rebuild-cancelled",
            "--since",
            "yesterday",
            "--dry-run",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("RFC 3339"));
}

#[test]
fn test_export_vcs_roots_requires_credentials() {
    pitcrew()
        .args(["teamcity", "export-vcs-roots"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TEAMCITY_USER"));
}

#[test]
fn test_cluster_up_requires_credentials() {
    pitcrew()
        .args(["cluster", "up"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TEAMCITY_USER"));
}

#[test]
fn test_cluster_rejects_unknown_subcommand() {
    pitcrew()
        .args(["cluster", "restart"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("restart"));
}
