use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::clock::{ClockModel, ModelPhase, MonotonicClock, SharedClockModel};
use crate::error::SyncError;
use crate::probe::ProbeSample;
use crate::testing::ManualClock;

fn sample(offset_us: i64) -> ProbeSample {
    ProbeSample {
        offset_us,
        round_trip_us: 1_500,
    }
}

#[test]
fn test_reader_not_ready_before_first_sample() {
    let shared = SharedClockModel::new(Arc::new(ManualClock::new(0)));
    let reader = shared.reader();

    assert!(!reader.is_synchronized());
    assert!(matches!(reader.get_state(), Err(SyncError::ModelNotReady)));
    assert!(matches!(reader.now_master(), Err(SyncError::ModelNotReady)));
    assert!(matches!(reader.master_to_local(5), Err(SyncError::ModelNotReady)));
    assert_eq!(reader.snapshot().phase, ModelPhase::Uninitialized);
}

#[test]
fn test_apply_stamps_with_shared_clock() {
    let clock = Arc::new(ManualClock::new(1_000_000));
    let shared = SharedClockModel::new(clock.clone());
    let reader = shared.reader();

    assert_eq!(shared.apply(&sample(50_000)), 1);
    assert_eq!(reader.snapshot().last_sample_mono_us, 1_000_000);

    clock.set(3_000_000);
    assert_eq!(shared.apply(&sample(51_000)), 2);

    let state = reader.get_state().unwrap();
    assert!((state.offset_us - 50_300.0).abs() < 1e-6);
    assert_eq!(reader.now_local(), 3_000_000);
    assert_eq!(reader.now_master().unwrap(), reader.local_to_master(3_000_000).unwrap());
}

#[test]
fn test_reset_visible_to_readers() {
    let shared = SharedClockModel::new(Arc::new(ManualClock::new(10)));
    let reader = shared.reader();
    shared.apply(&sample(1));
    assert!(reader.is_synchronized());

    shared.reset();

    assert!(!reader.is_synchronized());
    assert_eq!(reader.snapshot().sample_count, 0);
}

#[test]
fn test_readers_never_see_torn_state() {
    const UPDATES: i64 = 2_000;

    let clock = Arc::new(ManualClock::new(0));
    let shared = SharedClockModel::new(clock.clone());

    // Every (skew, offset) pair the writer will publish
    let mut expected = ClockModel::new();
    let mut states = HashSet::new();
    states.insert((expected.skew().to_bits(), expected.offset_us().to_bits()));
    for i in 0..UPDATES {
        expected.update(&sample(i * 37 % 5_000), (i + 1) * 700_000);
        states.insert((expected.skew().to_bits(), expected.offset_us().to_bits()));
    }
    let states = Arc::new(states);
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let reader = shared.reader();
            let states = Arc::clone(&states);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                let mut reads = 0_u64;
                while !done.load(Ordering::Acquire) {
                    let snap = reader.snapshot();
                    assert!(
                        states.contains(&(snap.skew.to_bits(), snap.offset_us.to_bits())),
                        "torn read: skew={} offset={}",
                        snap.skew,
                        snap.offset_us
                    );
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    for i in 0..UPDATES {
        clock.set((i + 1) * 700_000);
        shared.apply(&sample(i * 37 % 5_000));
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(shared.reader().snapshot().sample_count, 2_000);
    assert_eq!(clock.now_micros(), UPDATES * 700_000);
}
