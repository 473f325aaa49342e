use std::time::Duration;

use crate::scheduler::{CadencePhase, CadenceState};
use crate::types::SyncConfig;

#[test]
fn test_starts_locking() {
    let cadence = CadenceState::new(&SyncConfig::default());

    assert_eq!(cadence.phase(), CadencePhase::Locking);
    assert_eq!(cadence.interval(), Duration::from_millis(200));
    assert_eq!(cadence.bursts_completed(), 0);
}

#[test]
fn test_steady_after_lock_bursts() {
    let mut cadence = CadenceState::new(&SyncConfig::default());

    for _ in 0..9 {
        assert!(!cadence.record_burst());
        assert_eq!(cadence.phase(), CadencePhase::Locking);
    }
    assert!(cadence.record_burst());
    assert_eq!(cadence.phase(), CadencePhase::Steady);
    assert_eq!(cadence.interval(), Duration::from_secs(1));
    assert_eq!(cadence.bursts_completed(), 10);

    // Transition is reported once
    assert!(!cadence.record_burst());
    assert_eq!(cadence.bursts_completed(), 11);
    assert_eq!(cadence.interval(), Duration::from_secs(1));
}

#[test]
fn test_restart_returns_to_lock_phase() {
    let mut cadence = CadenceState::new(&SyncConfig::default());
    for _ in 0..12 {
        cadence.record_burst();
    }

    cadence.restart();

    assert_eq!(cadence, CadenceState::new(&SyncConfig::default()));
}

#[test]
fn test_custom_lock_phase() {
    let config = SyncConfig::builder()
        .lock_phase(2, Duration::from_millis(50))
        .steady_interval(Duration::from_secs(4))
        .build();
    let mut cadence = CadenceState::new(&config);

    assert_eq!(cadence.interval(), Duration::from_millis(50));
    cadence.record_burst();
    assert!(cadence.record_burst());
    assert_eq!(cadence.interval(), Duration::from_secs(4));
}
