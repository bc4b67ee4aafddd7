#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use askrelay_gateway::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
gateway:
  listen: "0.0.0.0:2000"
relay:
  peer_queue_capacty: 10 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "bad_request");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.gateway.listen, "0.0.0.0:2000");
    assert_eq!(cfg.gateway.ping_interval(), Duration::from_secs(54));
    assert_eq!(cfg.gateway.read_deadline(), Duration::from_secs(60));
    assert_eq!(cfg.gateway.max_frame_bytes, 4 * 1024 * 1024);
    assert_eq!(cfg.relay.peer_queue_capacity, 10);
    assert!(!cfg.relay.legacy_global_broadcast);

    let settings = cfg.relay.router_settings();
    assert_eq!(settings.default_timeout, Duration::from_secs(3600));
}

#[test]
fn full_config_roundtrips_values() {
    let ok = r#"
version: 1
gateway:
  listen: "127.0.0.1:9000"
  ping_interval_ms: 5000
  read_deadline_ms: 15000
  write_timeout_ms: 2000
  max_frame_bytes: 65536
relay:
  peer_queue_capacity: 32
  default_timeout_secs: 120
  legacy_global_broadcast: true
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.gateway.write_timeout(), Duration::from_secs(2));
    assert_eq!(cfg.relay.peer_queue_capacity, 32);

    let settings = cfg.relay.router_settings();
    assert!(settings.legacy_global_broadcast);
    assert_eq!(settings.default_timeout, Duration::from_secs(120));
}

#[test]
fn rejects_unsupported_version() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert!(err.to_string().contains("version"));
}

#[test]
fn read_deadline_must_exceed_ping_interval() {
    let bad = r#"
version: 1
gateway:
  ping_interval_ms: 30000
  read_deadline_ms: 30000
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(err.to_string().contains("read_deadline_ms"));
}

#[test]
fn queue_capacity_bounds() {
    let bad = "version: 1\nrelay:\n  peer_queue_capacity: 0\n";
    assert!(config::load_from_str(bad).is_err());

    let bad = "version: 1\nrelay:\n  peer_queue_capacity: 4096\n";
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let cfg = config::load_or_default("/nonexistent/askrelay-test.yaml").expect("defaults");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.relay.default_timeout_secs, 3600);
}
