//! Round trip of every type tag through real guest memory.
//!
//! The guest's `echo` export hands the first argument's buffer straight back
//! as a result entry, so what comes back is exactly what the encoder wrote.

mod common;

use guestcall_bridge::{HostValue, TypeTag};

use common::*;

/// One sample value per tag, plus a few edge cases.
fn samples() -> Vec<HostValue> {
    vec![
        HostValue::U8(255),
        HostValue::I8(-128),
        HostValue::U16(65535),
        HostValue::I16(-2),
        HostValue::U32(4294967295),
        HostValue::I32(i32::MIN),
        HostValue::U64(u64::MAX),
        HostValue::I64(-1),
        HostValue::F32(1.5),
        HostValue::F64(-0.25),
        HostValue::Bool(true),
        HostValue::Bool(false),
        HostValue::Rune('ß'),
        HostValue::Rune('🦀'),
        HostValue::Bytes(vec![0, 1, 2, 254, 255]),
        HostValue::Bytes(vec![]),
        HostValue::I8Array(vec![-1, 0, 1]),
        HostValue::U16Array(vec![1, 256]),
        HostValue::I16Array(vec![-300, 300]),
        HostValue::U32Array(vec![0, u32::MAX]),
        HostValue::I32Array(vec![]),
        HostValue::U64Array(vec![1 << 40]),
        HostValue::I64Array(vec![i64::MIN, i64::MAX]),
        HostValue::String("héllo, wörld".into()),
        HostValue::String(String::new()),
    ]
}

#[test]
fn test_samples_cover_every_tag() {
    let tags: Vec<TypeTag> = samples().iter().map(|v| v.tag()).collect();
    for tag in TypeTag::ALL {
        assert!(tags.contains(&tag), "no sample for {}", tag);
    }
}

#[test]
fn test_header_round_trip() {
    let mut bridge = header_bridge();
    for value in samples() {
        let results = bridge.call("echo", &echo_args(&value)).unwrap();
        assert_eq!(results, vec![value.clone()], "round trip of {:?}", value);
    }
}

#[test]
fn test_callback_round_trip() {
    let mut bridge = callback_bridge();
    for value in samples() {
        let results = bridge.call("cb_echo", &echo_args(&value)).unwrap();
        assert_eq!(results, vec![value.clone()], "round trip of {:?}", value);
    }
}

#[test]
fn test_large_array_round_trip() {
    let mut bridge = header_bridge();
    let value = HostValue::U64Array((0..4000).collect());
    let results = bridge.call("echo", &echo_args(&value)).unwrap();
    assert_eq!(results, vec![value]);
}
