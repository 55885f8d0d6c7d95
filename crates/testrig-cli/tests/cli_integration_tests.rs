//! Integration tests for `testrig unit` and `testrig integration`.

#![cfg(unix)]

mod common;

use common::{FakeRepo, INTEGRATION_DIR, UNIT_DIR};
use predicates::prelude::*;

#[test]
fn unit_runs_from_the_project_directory() {
    let repo = FakeRepo::new();

    repo.testrig().arg("unit").assert().success();

    let calls = repo.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].args, "test Neo4j.Driver.Tests.csproj");
    assert_eq!(calls[0].cwd, repo.canonical_root().join(UNIT_DIR));
    assert_eq!(calls[0].teamcity_project, "unittests");
}

#[test]
fn unit_failure_exits_with_runner_code() {
    let repo = FakeRepo::new();

    repo.testrig()
        .arg("unit")
        .env("FAKE_DOTNET_FAIL_ON", "test")
        .env("FAKE_DOTNET_CODE", "2")
        .assert()
        .code(2);
}

#[test]
fn integration_runs_the_five_categories_in_order() {
    let repo = FakeRepo::new();

    repo.testrig().arg("integration").assert().success();

    let calls = repo.calls();
    let filters: Vec<&str> = calls
        .iter()
        .map(|c| c.args.rsplit(' ').next().unwrap_or_default())
        .collect();
    assert_eq!(
        filters,
        vec![
            "DisplayName~Internals",
            "DisplayName~Direct",
            "DisplayName~Reactive",
            "DisplayName~Types",
            "DisplayName~Examples",
        ]
    );
    for call in &calls {
        assert!(
            call.args
                .starts_with("test Neo4j.Driver.Tests.Integration.csproj --filter ")
        );
        assert_eq!(call.cwd, repo.canonical_root().join(INTEGRATION_DIR));
        assert_eq!(call.teamcity_project, "integrationtests");
    }
    assert!(!calls.iter().any(|c| c.args.contains("Routing")));
}

#[test]
fn integration_aggregates_failures_by_default() {
    let repo = FakeRepo::new();

    repo.testrig()
        .arg("integration")
        .env("FAKE_DOTNET_FAIL_ON", "Reactive")
        .env("FAKE_DOTNET_CODE", "4")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Reactive exited with code 4"));

    assert_eq!(repo.calls().len(), 5);
}

#[test]
fn integration_fail_fast_stops_at_first_failure() {
    let repo = FakeRepo::new();

    repo.testrig()
        .args(["integration", "--policy", "fail-fast"])
        .env("FAKE_DOTNET_FAIL_ON", "Direct")
        .assert()
        .code(1);

    assert_eq!(repo.calls().len(), 2);
}

#[test]
fn configured_categories_never_include_routing() {
    let repo =
        FakeRepo::with_config("[integration]\ncategories = [\"Routing\", \"Types\", \"Direct\"]\n");

    repo.testrig().arg("integration").assert().success();

    let args = repo.args();
    assert_eq!(args.len(), 2);
    assert!(args[0].ends_with("DisplayName~Direct"));
    assert!(args[1].ends_with("DisplayName~Types"));
}

#[test]
fn unknown_policy_is_a_usage_error() {
    let repo = FakeRepo::new();

    repo.testrig()
        .args(["integration", "--policy", "sometimes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sometimes"));

    assert!(repo.calls().is_empty());
}

#[test]
fn categories_with_nothing_runnable_are_a_config_error() {
    for config in [
        "[integration]\ncategories = []\n",
        "[integration]\ncategories = [\"Routing\"]\n",
    ] {
        let repo = FakeRepo::with_config(config);

        repo.testrig()
            .arg("integration")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("selects no runnable category"));

        assert!(repo.calls().is_empty(), "{config}");
    }
}
