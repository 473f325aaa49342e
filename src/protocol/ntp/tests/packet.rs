use crate::error::SyncError;
use crate::protocol::ntp::packet::{
    CLIENT_MODE_FLAGS, NTP_PACKET_SIZE, SERVER_MODE_FLAGS, TimeReply, TimeRequest,
};
use crate::protocol::ntp::timestamp::NtpTimestamp;

fn stamp(unix_micros: i64) -> NtpTimestamp {
    NtpTimestamp::from_unix_micros(unix_micros).unwrap()
}

#[test]
fn test_request_encode() {
    let encoded = TimeRequest.encode();

    assert_eq!(encoded.len(), NTP_PACKET_SIZE);
    assert_eq!(encoded[0], CLIENT_MODE_FLAGS);
    assert!(encoded[1..].iter().all(|&b| b == 0));
}

#[test]
fn test_reply_encode_decode() {
    let reply = TimeReply {
        originate_time: NtpTimestamp::ZERO,
        receive_time: stamp(1_704_067_200_000_000),
        transmit_time: stamp(1_704_067_200_000_250),
    };

    let encoded = reply.encode();
    assert_eq!(encoded.len(), NTP_PACKET_SIZE);
    assert_eq!(encoded[0], SERVER_MODE_FLAGS);
    assert_eq!(encoded[1], 1);

    let decoded = TimeReply::decode(&encoded).unwrap();
    assert_eq!(decoded, reply);
    assert_eq!(decoded.transmit_micros().unwrap(), 1_704_067_200_000_250);
}

#[test]
fn test_reply_transmit_field_position() {
    let mut buf = [0u8; NTP_PACKET_SIZE];
    buf[0] = SERVER_MODE_FLAGS;
    let t3 = stamp(1_704_067_200_500_000);
    buf[40..48].copy_from_slice(&t3.encode());

    let decoded = TimeReply::decode(&buf).unwrap();
    assert_eq!(decoded.transmit_time, t3);
    assert!(decoded.receive_time.is_zero());
}

#[test]
fn test_reply_rejects_short_buffer() {
    let err = TimeReply::decode(&[0u8; 47]).unwrap_err();
    assert!(matches!(err, SyncError::MalformedReply { .. }));
}

#[test]
fn test_reply_rejects_oversized_buffer() {
    let mut buf = vec![0u8; 64];
    buf[40..48].copy_from_slice(&stamp(1_704_067_200_000_000).encode());
    assert!(TimeReply::decode(&buf).is_err());
}

#[test]
fn test_reply_rejects_zero_transmit() {
    let mut buf = [0u8; NTP_PACKET_SIZE];
    buf[0] = SERVER_MODE_FLAGS;
    let err = TimeReply::decode(&buf).unwrap_err();
    assert!(err.to_string().contains("zero transmit"));
}

#[test]
fn test_answering_copies_request_transmit() {
    let mut request = TimeRequest.encode();
    let client_t1 = stamp(1_704_067_200_000_001);
    request[40..48].copy_from_slice(&client_t1.encode());

    let reply = TimeReply::answering(&request, NtpTimestamp::now(), NtpTimestamp::now());
    assert_eq!(reply.originate_time, client_t1);
}
