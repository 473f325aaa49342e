use super::*;
use crate::error::SyncError;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

// --- config.rs tests ---

#[test]
fn test_config_defaults() {
    let config = SyncConfig::default();

    assert_eq!(config.peer, PeerSource::mdns("screamrouter"));
    assert_eq!(config.burst_size, 8);
    assert_eq!(config.probe_timeout, Duration::from_millis(100));
    assert_eq!(config.inter_probe_delay, Duration::from_millis(10));
    assert_eq!(config.lock_burst_count, 10);
    assert_eq!(config.lock_interval, Duration::from_millis(200));
    assert_eq!(config.steady_interval, Duration::from_secs(1));
    assert_eq!(config.max_consecutive_failures, 3);
    assert_eq!(config.resolution_retry_interval, Duration::from_secs(5));
    assert_eq!(config.resolution_timeout, Duration::from_secs(3));
    assert_ok!(config.validate());
}

#[test]
fn test_config_builder() {
    let config = SyncConfig::builder()
        .peer(PeerSource::host("10.0.0.5", 1123))
        .burst_size(4)
        .probe_timeout(Duration::from_millis(50))
        .lock_phase(5, Duration::from_millis(100))
        .steady_interval(Duration::from_secs(2))
        .max_consecutive_failures(5)
        .build();

    assert_eq!(config.peer.name(), "10.0.0.5");
    assert_eq!(config.peer.port(), 1123);
    assert_eq!(config.burst_size, 4);
    assert_eq!(config.probe_timeout, Duration::from_millis(50));
    assert_eq!(config.lock_burst_count, 5);
    assert_eq!(config.lock_interval, Duration::from_millis(100));
    assert_eq!(config.steady_interval, Duration::from_secs(2));
    assert_eq!(config.max_consecutive_failures, 5);
}

#[test]
fn test_config_validate_rejects_zero_burst() {
    let config = SyncConfig::builder().burst_size(0).build();
    let err = config.validate().unwrap_err();
    assert!(matches!(err, SyncError::InvalidParameter { ref name, .. } if name == "burst_size"));
}

#[test]
fn test_config_validate_rejects_zero_interval() {
    let config = SyncConfig::builder()
        .steady_interval(Duration::ZERO)
        .build();
    assert_err!(config.validate());
}

#[test]
fn test_config_validate_rejects_empty_host() {
    let config = SyncConfig::builder().peer(PeerSource::host("", 0)).build();
    assert_err!(config.validate());
}

#[test]
fn test_config_validate_rejects_zero_resolution_timeout() {
    let config = SyncConfig {
        resolution_timeout: Duration::ZERO,
        ..SyncConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(
        matches!(err, SyncError::InvalidParameter { ref name, .. } if name == "resolution_timeout")
    );
}

#[test]
fn test_config_validate_rejects_oversized_durations() {
    let huge = Duration::MAX;
    let cases: [(&str, fn(&mut SyncConfig, Duration)); 5] = [
        ("probe_timeout", |c: &mut SyncConfig, d: Duration| c.probe_timeout = d),
        ("inter_probe_delay", |c: &mut SyncConfig, d: Duration| c.inter_probe_delay = d),
        ("lock_interval", |c: &mut SyncConfig, d: Duration| c.lock_interval = d),
        ("steady_interval", |c: &mut SyncConfig, d: Duration| c.steady_interval = d),
        ("resolution_retry_interval", |c: &mut SyncConfig, d: Duration| {
            c.resolution_retry_interval = d;
        }),
    ];

    for (field, set) in cases {
        let mut config = SyncConfig::default();
        set(&mut config, huge);
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, SyncError::InvalidParameter { ref name, .. } if name == field),
            "{field}: {err:?}"
        );

        let mut config = SyncConfig::default();
        set(&mut config, MAX_CONFIG_DURATION);
        assert_ok!(config.validate());
    }
}

#[test]
fn test_max_burst_duration_saturates() {
    let config = SyncConfig {
        burst_size: usize::MAX,
        probe_timeout: Duration::MAX,
        inter_probe_delay: Duration::MAX,
        ..SyncConfig::default()
    };
    assert_eq!(config.max_burst_duration(), Duration::MAX);
}

#[test]
fn test_max_burst_duration() {
    let config = SyncConfig::default();
    // 8 x 100ms timeouts plus 7 x 10ms gaps
    assert_eq!(config.max_burst_duration(), Duration::from_millis(870));
}

#[test]
fn test_config_partial_json_uses_defaults() {
    let json = r#"{ "burst_size": 4, "peer": { "Host": { "host": "time.lan", "port": 123 } } }"#;
    let config: SyncConfig = serde_json::from_str(json).unwrap();

    assert_eq!(config.burst_size, 4);
    assert_eq!(config.peer, PeerSource::host("time.lan", 123));
    assert_eq!(config.lock_burst_count, 10);
}

// --- PeerSource ---

#[test]
fn test_peer_source_zero_port_uses_well_known() {
    assert_eq!(PeerSource::host("time.lan", 0).port(), NTP_PORT);
    assert_eq!(PeerSource::host("time.lan", 9123).port(), 9123);
}

#[test]
fn test_peer_source_display() {
    assert_eq!(
        PeerSource::mdns("screamrouter").to_string(),
        "mdns:screamrouter.local:123"
    );
    assert_eq!(PeerSource::host("10.0.0.5", 123).to_string(), "10.0.0.5:123");
}
