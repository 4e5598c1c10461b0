#![cfg(unix)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use fiorunner_agent::job::validate;
use fiorunner_agent::job::validator::split_diagnostics;
use fiorunner_core::job::JobRequest;

use fake_fio::FakeFio;

fn job(text: &str) -> JobRequest {
    JobRequest::new(text).unwrap()
}

#[test]
fn diagnostics_drop_only_the_trailing_empty_line() {
    assert_eq!(split_diagnostics("unknown option foo\n"), vec!["unknown option foo"]);
    assert_eq!(split_diagnostics("a\n\nb\n"), vec!["a", "", "b"]);
    assert_eq!(split_diagnostics("no newline"), vec!["no newline"]);
    assert!(split_diagnostics("").is_empty());
}

#[tokio::test]
async fn accepts_valid_job() {
    let fio = FakeFio::new();
    let report = validate(&fio.fio_section(), &job("[seq]\nrw=read\nsize=4k\n"))
        .await
        .unwrap();

    assert!(report.ok);
    assert!(report.diagnostics.is_empty());
    assert!(fio.job_files().is_empty(), "job file left behind");
}

#[tokio::test]
async fn rejects_with_fio_diagnostics() {
    let fio = FakeFio::new();
    let report = validate(&fio.fio_section(), &job("[seq]\nfoo=1\n"))
        .await
        .unwrap();

    assert!(!report.ok);
    assert_eq!(report.diagnostics, vec!["unknown option foo"]);
    assert!(fio.job_files().is_empty(), "job file left behind");

    let err = report.into_result().unwrap_err();
    assert_eq!(err.client_code().as_str(), "VALIDATION_FAILED");
    assert_eq!(err.diagnostics().to_vec(), vec!["unknown option foo"]);
}

#[tokio::test]
async fn hung_dry_run_times_out() {
    let fio = FakeFio::new();
    let mut cfg = fio.fio_section();
    cfg.validate_timeout_ms = 200;

    let report = validate(&cfg, &job("[seq]\n; slowparse\n")).await.unwrap();

    assert!(!report.ok);
    assert_eq!(report.diagnostics, vec!["syntax check timed out after 200ms"]);
    assert!(fio.job_files().is_empty(), "job file left behind");
}

#[tokio::test]
async fn missing_binary_is_spawn_failure() {
    let fio = FakeFio::new();
    let mut cfg = fio.fio_section();
    cfg.binary = fio.job_dir().join("no-such-fio");

    let err = validate(&cfg, &job("[seq]\n")).await.unwrap_err();

    assert_eq!(err.client_code().as_str(), "INTERNAL");
    assert!(err.to_string().starts_with("failed to launch fio"), "{err}");
    assert!(fio.job_files().is_empty(), "job file left behind");
}

#[tokio::test]
async fn crashed_dry_run_fails_and_cleans_up() {
    let fio = FakeFio::new();
    let report = validate(&fio.fio_section(), &job("[seq]\n; crashparse\n"))
        .await
        .unwrap();

    assert!(!report.ok);
    assert_eq!(report.diagnostics, vec!["fio: parsing job"]);
    assert!(fio.job_files().is_empty(), "job file left behind");
}
