#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::path::Path;

use fiorunner_agent::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
fio:
  binary: "/usr/bin/fio"
  status_intervall_secs: 2 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "INTERNAL");
    assert!(err.to_string().starts_with("config:"), "{err}");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.agent.listen, "0.0.0.0:8081");
    assert_eq!(cfg.agent.max_body_bytes, 1024 * 1024);
    assert_eq!(cfg.fio.binary, Path::new("fio"));
    assert_eq!(cfg.fio.status_interval_secs, 1);
    assert_eq!(cfg.fio.validate_timeout_ms, 30_000);
    assert_eq!(cfg.fio.max_report_bytes, 16 * 1024 * 1024);
    assert!(cfg.fio.job_dir.is_none());
}

#[test]
fn full_config() {
    let ok = r#"
version: 1
agent:
  listen: "127.0.0.1:9000"
  max_body_bytes: 4096
fio:
  binary: "/opt/fio/bin/fio"
  status_interval_secs: 5
  validate_timeout_ms: 1000
  max_report_bytes: 65536
  job_dir: "/var/tmp"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.agent.listen, "127.0.0.1:9000");
    assert_eq!(cfg.fio.status_interval_secs, 5);
    assert_eq!(cfg.fio.job_dir.as_deref(), Some(Path::new("/var/tmp")));
}

#[test]
fn rejects_out_of_range_values() {
    for bad in [
        "version: 2\n",
        "version: 1\nagent:\n  listen: \"not-an-addr\"\n",
        "version: 1\nagent:\n  max_body_bytes: 10\n",
        "version: 1\nfio:\n  status_interval_secs: 0\n",
        "version: 1\nfio:\n  validate_timeout_ms: 1\n",
        "version: 1\nfio:\n  binary: \"\"\n",
    ] {
        assert!(config::load_from_str(bad).is_err(), "accepted: {bad}");
    }
}

#[test]
fn missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = config::load_from_file(dir.path().join("nope.yaml")).expect_err("must fail");
    assert!(err.to_string().contains("nope.yaml"), "{err}");
}
