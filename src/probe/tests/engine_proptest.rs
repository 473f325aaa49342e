use std::net::SocketAddr;
use std::sync::Arc;

use proptest::prelude::*;

use crate::clock::MonotonicClock;
use crate::error::SyncError;
use crate::probe::{ProbeEngine, ProbeSample, ProbeTransport};
use crate::testing::{ManualClock, ScriptedReply, ScriptedTransport};
use crate::types::SyncConfig;

const PEER: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(std::net::Ipv4Addr::new(192, 0, 2, 10)),
    123,
);

fn outcome() -> impl Strategy<Value = ScriptedReply> {
    prop_oneof![
        3 => (1_i64..50_000, -1_000_000_i64..1_000_000)
            .prop_map(|(rtt, offset)| ScriptedReply::reply(rtt, offset)),
        1 => Just(ScriptedReply::Timeout),
        1 => Just(ScriptedReply::Error),
    ]
}

fn run_burst(script: Vec<ScriptedReply>) -> Result<ProbeSample, SyncError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();

    let burst_size = script.len();
    let transport: Arc<dyn ProbeTransport> =
        Arc::new(ScriptedTransport::new().with_script(script));
    let clock: Arc<dyn MonotonicClock> = Arc::new(ManualClock::new(10_000_000));
    let config = SyncConfig::builder().burst_size(burst_size).build();
    let engine = ProbeEngine::new(transport, clock, &config);

    runtime.block_on(engine.probe_burst(PEER))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_burst_picks_smallest_round_trip(script in prop::collection::vec(outcome(), 1..=8)) {
        let answered: Vec<i64> = script
            .iter()
            .filter_map(|reply| match reply {
                ScriptedReply::Reply { round_trip_us, .. } => Some(*round_trip_us),
                _ => None,
            })
            .collect();
        let attempts = script.len();

        match run_burst(script) {
            Ok(best) => {
                prop_assert!(!answered.is_empty());
                prop_assert!(answered.iter().all(|rtt| best.round_trip_us <= *rtt));
                prop_assert_eq!(Some(&best.round_trip_us), answered.iter().min());
            }
            Err(SyncError::BurstExhausted { attempts: reported }) => {
                prop_assert!(answered.is_empty());
                prop_assert_eq!(reported, attempts);
            }
            Err(e) => prop_assert!(false, "unexpected burst error: {e}"),
        }
    }
}
