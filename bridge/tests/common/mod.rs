//! Shared test helpers for integration tests.
//!
//! Provides inline WAT guests for both result protocols and bridge factory
//! functions used across all integration test files. Both guests share the
//! same allocator: a bump allocator that counts `allocate` / `deallocate`
//! calls, traps on requests above 64 KiB, and rewinds once every
//! allocation has been returned. Result records are built in a fixed
//! scratch area below the heap, since the guest owns result memory.
//!
//! Scratch layout:
//! ```text
//! [32..36)   "boom"
//! [40..42)   "hi"
//! [64..73)   result descriptor
//! [80..256)  result entries
//! [256..1024) result payloads
//! [1024..)   heap
//! ```

#![allow(dead_code)]

use std::time::Duration;

use guestcall_bridge::{
    Bridge, BridgeConfig, CallbackBridge, HeaderBridge, HostValue, ResultProtocol,
};

/// Allocator and counters shared by both guests.
const ALLOCATOR: &str = r#"
    (memory (export "memory") 2)
    (data (i32.const 32) "boom")
    (data (i32.const 40) "hi")
    (global $next (mut i32) (i32.const 1024))
    (global $allocs (mut i32) (i32.const 0))
    (global $deallocs (mut i32) (i32.const 0))

    (func (export "allocate") (param $size i32) (result i32)
        (local $p i32)
        (if (i32.gt_u (local.get $size) (i32.const 65536))
            (then unreachable))
        (global.set $allocs (i32.add (global.get $allocs) (i32.const 1)))
        (local.set $p (global.get $next))
        (global.set $next
            (i32.and
                (i32.add (i32.add (global.get $next) (local.get $size)) (i32.const 7))
                (i32.const -8)))
        (local.get $p))

    (func (export "deallocate") (param i32 i32)
        (global.set $deallocs (i32.add (global.get $deallocs) (i32.const 1)))
        (if (i32.eq (global.get $allocs) (global.get $deallocs))
            (then (global.set $next (i32.const 1024)))))

    (func (export "alloc_count") (result i32) global.get $allocs)
    (func (export "dealloc_count") (result i32) global.get $deallocs)

    ;; Write one result entry at 80.
    (func $entry (param $p i32) (param $tag i32) (param $len i32)
        (i32.store (i32.const 80) (local.get $p))
        (i32.store (i32.const 84) (local.get $tag))
        (i32.store (i32.const 88) (local.get $len)))

    ;; Sum every argument, read as a u32, into 256.
    (func $sum (param $t i32) (param $n i32)
        (local $i i32)
        (local $acc i32)
        (block $done
            (loop $next
                (br_if $done (i32.ge_u (local.get $i) (local.get $n)))
                (local.set $acc
                    (i32.add (local.get $acc)
                        (i32.load (i32.load
                            (i32.add (local.get $t) (i32.shl (local.get $i) (i32.const 3)))))))
                (local.set $i (i32.add (local.get $i) (i32.const 1)))
                (br $next)))
        (i32.store (i32.const 256) (local.get $acc)))
"#;

/// Guest using the synchronous result descriptor protocol.
pub fn header_guest() -> String {
    format!(
        r#"
        (module
            {ALLOCATOR}

            ;; Success descriptor for `n` entries at 80.
            (func $ok (param $n i32) (result i32)
                (i32.store8 (i32.const 64) (i32.const 0))
                (i32.store (i32.const 65) (i32.const 80))
                (i32.store (i32.const 69) (local.get $n))
                (i32.const 64))

            (func $ok1 (param $p i32) (param $tag i32) (param $len i32) (result i32)
                (call $entry (local.get $p) (local.get $tag) (local.get $len))
                (call $ok (i32.const 1)))

            (func $err (param $p i32) (param $len i32) (result i32)
                (i32.store8 (i32.const 64) (i32.const 1))
                (i32.store (i32.const 65) (local.get $p))
                (i32.store (i32.const 69) (local.get $len))
                (i32.const 64))

            (func (export "sum_u32") (param $t i32) (param $n i32) (result i32)
                (call $sum (local.get $t) (local.get $n))
                (call $ok1 (i32.const 256) (i32.const 5) (i32.const 4)))

            ;; echo(value, tag: i32, byte_len: u32) -> value re-tagged
            (func (export "echo") (param $t i32) (param $n i32) (result i32)
                (call $ok1
                    (i32.load (local.get $t))
                    (i32.load (i32.load (i32.add (local.get $t) (i32.const 8))))
                    (i32.load (i32.load (i32.add (local.get $t) (i32.const 16))))))

            ;; Descriptor lengths of every argument, as [u32].
            (func (export "arg_lens") (param $t i32) (param $n i32) (result i32)
                (local $i i32)
                (block $done
                    (loop $next
                        (br_if $done (i32.ge_u (local.get $i) (local.get $n)))
                        (i32.store
                            (i32.add (i32.const 256) (i32.shl (local.get $i) (i32.const 2)))
                            (i32.load
                                (i32.add
                                    (i32.add (local.get $t) (i32.shl (local.get $i) (i32.const 3)))
                                    (i32.const 4))))
                        (local.set $i (i32.add (local.get $i) (i32.const 1)))
                        (br $next)))
                (call $ok1 (i32.const 256) (i32.const 25) (i32.shl (local.get $n) (i32.const 2))))

            (func (export "count_args") (param $t i32) (param $n i32) (result i32)
                (i32.store (i32.const 256) (local.get $n))
                (call $ok1 (i32.const 256) (i32.const 5) (i32.const 4)))

            ;; u32 42, "hi", true
            (func (export "multi") (param i32 i32) (result i32)
                (i32.store (i32.const 256) (i32.const 42))
                (i32.store8 (i32.const 260) (i32.const 1))
                (i32.store (i32.const 80) (i32.const 256))
                (i32.store (i32.const 84) (i32.const 5))
                (i32.store (i32.const 88) (i32.const 4))
                (i32.store (i32.const 92) (i32.const 40))
                (i32.store (i32.const 96) (i32.const 31))
                (i32.store (i32.const 100) (i32.const 2))
                (i32.store (i32.const 104) (i32.const 260))
                (i32.store (i32.const 108) (i32.const 11))
                (i32.store (i32.const 112) (i32.const 1))
                (call $ok (i32.const 3)))

            (func (export "nothing") (param i32 i32) (result i32)
                (call $ok (i32.const 0)))

            (func (export "fail") (param i32 i32) (result i32)
                (call $err (i32.const 32) (i32.const 4)))

            (func (export "unknown_tag") (param i32 i32) (result i32)
                (call $ok1 (i32.const 256) (i32.const 99) (i32.const 4)))

            ;; An unknown entry followed by a known u32.
            (func (export "unknown_then_u32") (param i32 i32) (result i32)
                (i32.store (i32.const 256) (i32.const 7))
                (i32.store (i32.const 80) (i32.const 256))
                (i32.store (i32.const 84) (i32.const 99))
                (i32.store (i32.const 88) (i32.const 4))
                (i32.store (i32.const 92) (i32.const 256))
                (i32.store (i32.const 96) (i32.const 5))
                (i32.store (i32.const 100) (i32.const 4))
                (call $ok (i32.const 2)))

            (func (export "wrong_width") (param i32 i32) (result i32)
                (call $ok1 (i32.const 256) (i32.const 5) (i32.const 3)))

            (func (export "bad_pointer") (param i32 i32) (result i32)
                (call $ok1 (i32.const 0x7fff0000) (i32.const 5) (i32.const 4)))

            (func (export "bad_descriptor") (param i32 i32) (result i32)
                (i32.const 0x7ffffff0))

            ;; Grow memory by arg0 pages; returns the old size or -1 as i32.
            (func (export "grow") (param $t i32) (param $n i32) (result i32)
                (i32.store (i32.const 256)
                    (memory.grow (i32.load (i32.load (local.get $t)))))
                (call $ok1 (i32.const 256) (i32.const 6) (i32.const 4)))

            (func (export "trap") (param i32 i32) (result i32)
                unreachable)

            (func (export "spin") (param i32 i32) (result i32)
                (loop $forever (br $forever))
                (i32.const 0))

            (func (export "no_result") (param i32 i32))
        )
        "#
    )
}

/// Guest using the `return_result` / `return_error` callbacks.
pub fn callback_guest() -> String {
    format!(
        r#"
        (module
            (import "env" "return_result" (func $return_result (param i32 i32)))
            (import "env" "return_error" (func $return_error (param i32 i32)))
            {ALLOCATOR}

            (func (export "cb_sum") (param $t i32) (param $n i32)
                (call $sum (local.get $t) (local.get $n))
                (call $entry (i32.const 256) (i32.const 5) (i32.const 4))
                (call $return_result (i32.const 80) (i32.const 1)))

            (func (export "cb_echo") (param $t i32) (param $n i32)
                (call $entry
                    (i32.load (local.get $t))
                    (i32.load (i32.load (i32.add (local.get $t) (i32.const 8))))
                    (i32.load (i32.load (i32.add (local.get $t) (i32.const 16)))))
                (call $return_result (i32.const 80) (i32.const 1)))

            (func (export "cb_nothing") (param i32 i32)
                (call $return_result (i32.const 80) (i32.const 0)))

            (func (export "cb_fail") (param i32 i32)
                (call $return_error (i32.const 32) (i32.const 4)))

            (func (export "cb_silent") (param i32 i32))

            (func (export "cb_twice") (param i32 i32)
                (i32.store (i32.const 256) (i32.const 1))
                (call $entry (i32.const 256) (i32.const 5) (i32.const 4))
                (call $return_result (i32.const 80) (i32.const 1))
                (call $return_error (i32.const 32) (i32.const 4)))

            (func (export "cb_unknown_tag") (param i32 i32)
                (call $entry (i32.const 256) (i32.const 99) (i32.const 4))
                (call $return_result (i32.const 80) (i32.const 1)))

            (func (export "cb_bad_pointer") (param i32 i32)
                (call $return_error (i32.const 0x7fff0000) (i32.const 4)))

            (func (export "cb_fail_then_trap") (param i32 i32)
                (call $return_error (i32.const 32) (i32.const 4))
                unreachable)

            (func (export "cb_with_result") (param i32 i32) (result i32)
                (i32.const 0))
        )
        "#
    )
}

/// Config with a short callback deadline so silent-guest tests stay fast.
pub fn test_config() -> BridgeConfig {
    BridgeConfig {
        callback_timeout: Duration::from_millis(50),
        ..BridgeConfig::default()
    }
}

pub fn header_bridge() -> HeaderBridge {
    header_bridge_with(test_config())
}

pub fn header_bridge_with(config: BridgeConfig) -> HeaderBridge {
    HeaderBridge::new(header_guest().as_bytes(), config).unwrap()
}

pub fn callback_bridge() -> CallbackBridge {
    callback_bridge_with(test_config())
}

pub fn callback_bridge_with(config: BridgeConfig) -> CallbackBridge {
    CallbackBridge::new(callback_guest().as_bytes(), config).unwrap()
}

/// `(allocate calls, deallocate calls)` made so far by the guest allocator.
pub fn counters<P: ResultProtocol>(bridge: &mut Bridge<P>) -> (i32, i32) {
    let instance = *bridge.instance();
    let store = bridge.store_mut();
    let allocs = instance
        .get_typed_func::<(), i32>(&mut *store, "alloc_count")
        .unwrap()
        .call(&mut *store, ())
        .unwrap();
    let deallocs = instance
        .get_typed_func::<(), i32>(&mut *store, "dealloc_count")
        .unwrap()
        .call(&mut *store, ())
        .unwrap();
    (allocs, deallocs)
}

/// Arguments for `echo`: the value, its tag, and its encoded byte length.
pub fn echo_args(value: &HostValue) -> Vec<HostValue> {
    vec![
        value.clone(),
        HostValue::I32(value.tag().as_i32()),
        HostValue::U32(value.wire_len() as u32),
    ]
}
