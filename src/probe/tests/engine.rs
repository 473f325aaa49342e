use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use crate::clock::MonotonicClock;
use crate::error::SyncError;
use crate::probe::{ProbeEngine, ProbeTransport};
use crate::protocol::ntp::NTP_PACKET_SIZE;
use crate::testing::{ManualClock, ScriptedReply, ScriptedTransport};
use crate::types::SyncConfig;

const PEER: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(std::net::Ipv4Addr::new(192, 0, 2, 10)),
    123,
);

fn engine(transport: &Arc<ScriptedTransport>) -> ProbeEngine {
    let transport: Arc<dyn ProbeTransport> = transport.clone();
    let clock: Arc<dyn MonotonicClock> = Arc::new(ManualClock::new(10_000_000));
    ProbeEngine::new(transport, clock, &SyncConfig::default())
}

#[tokio::test(start_paused = true)]
async fn test_probe_once_measures_offset_and_rtt() {
    let transport =
        Arc::new(ScriptedTransport::new().with_script([ScriptedReply::reply(2_400, 75_000)]));
    let sample = engine(&transport).probe_once(PEER).await.unwrap();

    assert_eq!(sample.round_trip_us, 2_400);
    assert_eq!(sample.offset_us, 75_000);
    assert_eq!(transport.peers(), vec![PEER]);
}

#[tokio::test(start_paused = true)]
async fn test_probe_once_times_out() {
    let transport = Arc::new(ScriptedTransport::new());
    let started = Instant::now();

    let result = engine(&transport).probe_once(PEER).await;

    assert!(matches!(
        result,
        Err(SyncError::Timeout { duration }) if duration == Duration::from_millis(100)
    ));
    assert_eq!(started.elapsed(), Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_probe_once_rejects_short_reply() {
    let transport = Arc::new(
        ScriptedTransport::new().with_script([ScriptedReply::Raw(Bytes::from_static(&[0x24; 20]))]),
    );
    let result = engine(&transport).probe_once(PEER).await;
    assert!(matches!(result, Err(SyncError::MalformedReply { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_probe_once_rejects_zero_transmit_time() {
    let mut reply = vec![0u8; NTP_PACKET_SIZE];
    reply[0] = 0x24;
    let transport = Arc::new(
        ScriptedTransport::new().with_script([ScriptedReply::Raw(Bytes::from(reply))]),
    );
    let result = engine(&transport).probe_once(PEER).await;
    assert!(matches!(result, Err(SyncError::MalformedReply { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_probe_once_surfaces_socket_error() {
    let transport = Arc::new(ScriptedTransport::new().with_script([ScriptedReply::Error]));
    let result = engine(&transport).probe_once(PEER).await;
    assert!(result.as_ref().is_err_and(SyncError::is_transport_failure));
    assert!(matches!(result, Err(SyncError::Transport(_))));
}

#[tokio::test(start_paused = true)]
async fn test_burst_selects_minimum_rtt() {
    // Probe #3 and #7 answer; everything else times out
    let script = (1..=8).map(|n| match n {
        3 => ScriptedReply::reply(5_000, 11_000),
        7 => ScriptedReply::reply(3_000, 12_000),
        _ => ScriptedReply::Timeout,
    });
    let transport = Arc::new(ScriptedTransport::new().with_script(script));

    let best = engine(&transport).probe_burst(PEER).await.unwrap();

    assert_eq!(best.round_trip_us, 3_000);
    assert_eq!(best.offset_us, 12_000);
    assert_eq!(transport.calls(), 8);
}

#[tokio::test(start_paused = true)]
async fn test_burst_skips_bad_replies() {
    let transport = Arc::new(ScriptedTransport::new().with_script([
        ScriptedReply::Error,
        ScriptedReply::reply(900, -300),
        ScriptedReply::Raw(Bytes::from_static(b"short")),
        ScriptedReply::reply(400, -250),
        ScriptedReply::reply(400, -260),
        ScriptedReply::Timeout,
        ScriptedReply::reply(1_200, -500),
        ScriptedReply::reply(401, -1),
    ]));

    let best = engine(&transport).probe_burst(PEER).await.unwrap();

    assert_eq!(best.round_trip_us, 400);
    assert_eq!(best.offset_us, -250);
}

#[tokio::test(start_paused = true)]
async fn test_burst_exhausted_when_nothing_answers() {
    let transport = Arc::new(ScriptedTransport::new());
    let started = Instant::now();

    let result = engine(&transport).probe_burst(PEER).await;

    assert!(matches!(result, Err(SyncError::BurstExhausted { attempts: 8 })));
    assert_eq!(transport.calls(), 8);
    // Worst case: every probe times out, plus the spacing between them
    assert_eq!(started.elapsed(), SyncConfig::default().max_burst_duration());
}

#[tokio::test(start_paused = true)]
async fn test_burst_probes_are_spaced() {
    let transport =
        Arc::new(ScriptedTransport::new().with_fallback(ScriptedReply::reply(1_000, 0)));
    let started = Instant::now();

    engine(&transport).probe_burst(PEER).await.unwrap();

    assert_eq!(transport.calls(), 8);
    assert_eq!(started.elapsed(), Duration::from_millis(70));
}

#[tokio::test(start_paused = true)]
async fn test_burst_size_from_config() {
    let transport =
        Arc::new(ScriptedTransport::new().with_fallback(ScriptedReply::reply(1_000, 0)));
    let dyn_transport: Arc<dyn ProbeTransport> = transport.clone();
    let config = SyncConfig::builder().burst_size(3).build();
    let engine = ProbeEngine::new(dyn_transport, Arc::new(ManualClock::new(0)), &config);

    assert_eq!(engine.burst_size(), 3);
    engine.probe_burst(PEER).await.unwrap();
    assert_eq!(transport.calls(), 3);
}
