//! Tests for Engine
//!
//! These tests verify:
//! - Command routing and reply shapes
//! - TTL behavior through lazy and background expiration
//! - Sorted-set semantics end to end
//! - Validation errors as ERR replies
//! - Concurrent access patterns

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use zestkv::config::Config;
use zestkv::engine::Engine;
use zestkv::protocol::{Command, Reply, Request};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_engine() -> Engine {
    Engine::open(Config::default()).unwrap()
}

/// Engine whose reaper wakes often, for expiration tests
fn setup_fast_reaping_engine() -> Engine {
    let config = Config::builder().reap_interval_ms(5).build();
    Engine::open(config).unwrap()
}

fn run(engine: &Engine, parts: &[&str]) -> Reply {
    engine.handle(Request::from_parts(parts))
}

fn strs(items: &[&str]) -> Reply {
    Reply::Arr(items.iter().map(|s| Reply::str(s.to_string())).collect())
}

// =============================================================================
// Scalar Tests
// =============================================================================

#[test]
fn test_never_written_key() {
    let engine = setup_engine();
    assert_eq!(run(&engine, &["get", "k"]), Reply::Nil);
    assert_eq!(run(&engine, &["pttl", "k"]), Reply::Int(-2));
    assert_eq!(run(&engine, &["del", "k"]), Reply::Int(0));
}

#[test]
fn test_set_get_del() {
    let engine = setup_engine();
    assert_eq!(run(&engine, &["set", "k", "v"]), Reply::Nil);
    assert_eq!(run(&engine, &["get", "k"]), Reply::str("v"));
    assert_eq!(run(&engine, &["pttl", "k"]), Reply::Int(-1));
    assert_eq!(run(&engine, &["del", "k"]), Reply::Int(1));
    assert_eq!(run(&engine, &["get", "k"]), Reply::Nil);
}

#[test]
fn test_ping() {
    let engine = setup_engine();
    assert_eq!(run(&engine, &["ping"]), Reply::str("pong"));
}

#[test]
fn test_keys_lists_every_type() {
    let engine = setup_engine();
    run(&engine, &["set", "a", "1"]);
    run(&engine, &["zadd", "b", "1", "m"]);

    let mut keys = match run(&engine, &["keys"]) {
        Reply::Arr(items) => items,
        other => panic!("expected array, got {:?}", other),
    };
    keys.sort_by_key(|r| format!("{:?}", r));
    assert_eq!(keys, vec![Reply::str("a"), Reply::str("b")]);
}

#[test]
fn test_execute_typed_command() {
    let engine = setup_engine();
    let reply = engine
        .execute(Command::Set {
            key: "k".into(),
            value: "v".into(),
        })
        .unwrap();
    assert_eq!(reply, Reply::Nil);
    assert_eq!(
        engine.execute(Command::Get { key: "k".into() }).unwrap(),
        Reply::str("v")
    );
}

// =============================================================================
// TTL Tests
// =============================================================================

#[test]
fn test_pexpire_reply_and_bounds() {
    let engine = setup_engine();
    assert_eq!(run(&engine, &["pexpire", "k", "1000"]), Reply::Int(0));

    run(&engine, &["set", "k", "v"]);
    assert_eq!(run(&engine, &["pexpire", "k", "1000"]), Reply::Int(1));
    match run(&engine, &["pttl", "k"]) {
        Reply::Int(ttl) => assert!((1..=1000).contains(&ttl), "ttl {}", ttl),
        other => panic!("expected int, got {:?}", other),
    }
}

#[test]
fn test_one_millisecond_ttl_reads_back_as_one() {
    let engine = setup_engine();
    run(&engine, &["set", "k", "v"]);
    assert_eq!(run(&engine, &["pexpire", "k", "1"]), Reply::Int(1));
    assert_eq!(run(&engine, &["pttl", "k"]), Reply::Int(1));
}

#[test]
fn test_ttl_elapses() {
    let engine = setup_engine();
    run(&engine, &["set", "k", "v"]);
    run(&engine, &["pexpire", "k", "30"]);
    thread::sleep(Duration::from_millis(60));

    match run(&engine, &["pttl", "k"]) {
        Reply::Int(ttl) => assert!(ttl == 0 || ttl == -2, "ttl {}", ttl),
        other => panic!("expected int, got {:?}", other),
    }
    assert_eq!(run(&engine, &["get", "k"]), Reply::Nil);
    assert_eq!(run(&engine, &["del", "k"]), Reply::Int(0));
}

#[test]
fn test_background_reaper_removes_untouched_keys() {
    let engine = setup_fast_reaping_engine();
    for i in 0..50 {
        let key = format!("k{}", i);
        run(&engine, &["set", key.as_str(), "v"]);
        run(&engine, &["pexpire", key.as_str(), "10"]);
    }
    assert_eq!(engine.key_count(), 50);

    let deadline = Instant::now() + Duration::from_secs(5);
    while engine.key_count() > 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(engine.key_count(), 0);
    assert_eq!(engine.expiring_count(), 0);
}

#[test]
fn test_manual_reap() {
    // reaper effectively idle so only the manual sweep runs
    let config = Config::builder().reap_interval_ms(60_000).build();
    let engine = Engine::open(config).unwrap();

    run(&engine, &["set", "a", "1"]);
    run(&engine, &["set", "b", "2"]);
    run(&engine, &["pexpire", "a", "1"]);
    thread::sleep(Duration::from_millis(10));

    assert_eq!(engine.reap_expired(), 1);
    assert_eq!(engine.key_count(), 1);
    assert_eq!(engine.reap_expired(), 0);
}

#[test]
fn test_set_clears_ttl() {
    let engine = setup_engine();
    run(&engine, &["set", "k", "v"]);
    run(&engine, &["pexpire", "k", "50"]);
    run(&engine, &["set", "k", "w"]);
    thread::sleep(Duration::from_millis(80));
    assert_eq!(run(&engine, &["get", "k"]), Reply::str("w"));
    assert_eq!(run(&engine, &["pttl", "k"]), Reply::Int(-1));
}

#[test]
fn test_negative_pexpire_persists_key() {
    let engine = setup_engine();
    run(&engine, &["set", "k", "v"]);
    run(&engine, &["pexpire", "k", "50"]);
    assert_eq!(run(&engine, &["pexpire", "k", "-1"]), Reply::Int(1));
    assert_eq!(run(&engine, &["pttl", "k"]), Reply::Int(-1));
}

// =============================================================================
// Sorted Set Tests
// =============================================================================

#[test]
fn test_zset_end_to_end() {
    let engine = setup_engine();
    assert_eq!(run(&engine, &["zadd", "z", "1", "n1"]), Reply::Int(1));
    assert_eq!(run(&engine, &["zadd", "z", "2", "n2"]), Reply::Int(1));
    assert_eq!(run(&engine, &["zadd", "z", "1.1", "n1"]), Reply::Int(0));
    assert_eq!(run(&engine, &["zscore", "z", "n1"]), Reply::str("1.1"));
    assert_eq!(
        run(&engine, &["zquery", "z", "1", "", "0", "10"]),
        strs(&["n1", "1.1", "n2", "2"])
    );
    assert_eq!(
        run(&engine, &["zquery", "z", "1.1", "", "1", "10"]),
        strs(&["n2", "2"])
    );
    assert_eq!(run(&engine, &["zquery", "z", "1.1", "", "2", "10"]), strs(&[]));
    assert_eq!(run(&engine, &["zrem", "z", "n1"]), Reply::Int(1));
    assert_eq!(
        run(&engine, &["zquery", "z", "1", "", "0", "10"]),
        strs(&["n2", "2"])
    );
}

#[test]
fn test_zadd_update_changes_score() {
    let engine = setup_engine();
    run(&engine, &["zadd", "s", "3", "m"]);
    assert_eq!(run(&engine, &["zadd", "s", "-7.25", "m"]), Reply::Int(0));
    assert_eq!(run(&engine, &["zscore", "s", "m"]), Reply::str("-7.25"));
}

#[test]
fn test_extreme_scores_use_exponent_form() {
    let engine = setup_engine();
    run(&engine, &["zadd", "s", "1e300", "big"]);
    run(&engine, &["zadd", "s", "-2.5e-7", "tiny"]);
    assert_eq!(run(&engine, &["zscore", "s", "big"]), Reply::str("1e300"));
    assert_eq!(run(&engine, &["zscore", "s", "tiny"]), Reply::str("-2.5e-7"));
}

#[test]
fn test_zrem_counts_and_last_member() {
    let engine = setup_engine();
    assert_eq!(run(&engine, &["zrem", "s", "m"]), Reply::Int(0));
    run(&engine, &["zadd", "s", "1", "m"]);
    assert_eq!(run(&engine, &["zrem", "s", "m"]), Reply::Int(1));
    assert_eq!(run(&engine, &["zrem", "s", "m"]), Reply::Int(0));
    assert_eq!(run(&engine, &["zscore", "s", "m"]), Reply::Nil);
    assert_eq!(run(&engine, &["pttl", "s"]), Reply::Int(-2));
    assert_eq!(engine.key_count(), 0);
}

#[test]
fn test_zquery_never_created_key() {
    let engine = setup_engine();
    assert_eq!(run(&engine, &["zquery", "nope", "0", "", "0", "10"]), strs(&[]));
}

#[test]
fn test_zquery_ties_break_by_member() {
    let engine = setup_engine();
    for name in ["c", "a", "b"] {
        run(&engine, &["zadd", "z", "5", name]);
    }
    assert_eq!(
        run(&engine, &["zquery", "z", "5", "b", "0", "10"]),
        strs(&["b", "5", "c", "5"])
    );
}

#[test]
fn test_zquery_negative_offset_walks_back() {
    let engine = setup_engine();
    for (score, name) in [("1", "a"), ("2", "b"), ("3", "c"), ("4", "d")] {
        run(&engine, &["zadd", "z", score, name]);
    }
    assert_eq!(
        run(&engine, &["zquery", "z", "3", "", "-1", "2"]),
        strs(&["b", "2", "c", "3"])
    );
}

#[test]
fn test_zquery_paginated_windows_concatenate() {
    let engine = setup_engine();
    for i in 0..30 {
        let score = (i / 3).to_string();
        let name = format!("m{:02}", i);
        run(&engine, &["zadd", "z", score.as_str(), name.as_str()]);
    }

    let full = match run(&engine, &["zquery", "z", "-inf", "", "0", "100"]) {
        Reply::Arr(items) => items,
        other => panic!("expected array, got {:?}", other),
    };
    assert_eq!(full.len(), 60);

    let mut paged = Vec::new();
    for offset in (0..30).step_by(4) {
        let offset = offset.to_string();
        match run(&engine, &["zquery", "z", "-inf", "", offset.as_str(), "4"]) {
            Reply::Arr(items) => paged.extend(items),
            other => panic!("expected array, got {:?}", other),
        }
    }
    assert_eq!(paged, full);
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_type_errors() {
    let engine = setup_engine();
    run(&engine, &["set", "s", "v"]);
    run(&engine, &["zadd", "z", "1", "m"]);

    assert_eq!(run(&engine, &["get", "z"]), Reply::error("expect string"));
    assert_eq!(run(&engine, &["zadd", "s", "1", "m"]), Reply::error("expect zset"));
    assert_eq!(run(&engine, &["zscore", "s", "m"]), Reply::error("expect zset"));
    assert_eq!(run(&engine, &["zquery", "s", "0", "", "0", "10"]), Reply::error("expect zset"));
}

#[test]
fn test_validation_errors_are_replies() {
    let engine = setup_engine();
    assert!(run(&engine, &["nosuch"]).is_error());
    assert!(run(&engine, &["get"]).is_error());
    assert!(run(&engine, &["zadd", "z", "one", "m"]).is_error());
    assert!(run(&engine, &["pexpire", "k", "soon"]).is_error());
    assert!(engine.handle(Request::new(vec![])).is_error());

    // a bad request leaves the engine usable
    assert_eq!(run(&engine, &["ping"]), Reply::str("pong"));
}

#[test]
fn test_invalid_config_rejected() {
    let config = Config::builder().reap_interval_ms(0).build();
    assert!(Engine::open(config).is_err());
}

// =============================================================================
// Concurrent Access Tests
// =============================================================================

#[test]
fn test_engine_concurrent_zadds() {
    let engine = Arc::new(setup_engine());

    let mut handles = vec![];
    for t in 0..4 {
        let engine_clone = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for i in 0..100 {
                let score = (t * 100 + i).to_string();
                let name = format!("t{}m{}", t, i);
                assert_eq!(run(&engine_clone, &["zadd", "shared", score.as_str(), name.as_str()]), Reply::Int(1));
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    match run(&engine, &["zquery", "shared", "-inf", "", "0", "1000"]) {
        Reply::Arr(items) => assert_eq!(items.len(), 800),
        other => panic!("expected array, got {:?}", other),
    }
}

#[test]
fn test_engine_concurrent_score_updates() {
    let engine = Arc::new(setup_engine());
    run(&engine, &["zadd", "z", "0", "m"]);

    let mut handles = vec![];
    for t in 0..4 {
        let engine_clone = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for i in 0..200 {
                let score = (t * 1000 + i).to_string();
                assert_eq!(run(&engine_clone, &["zadd", "z", score.as_str(), "m"]), Reply::Int(0));
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    // one member, never duplicated in the order index
    assert_eq!(
        match run(&engine, &["zquery", "z", "-inf", "", "0", "10"]) {
            Reply::Arr(items) => items.len(),
            _ => 0,
        },
        2
    );
}

#[test]
fn test_engine_expiry_races_with_access() {
    let engine = Arc::new(setup_fast_reaping_engine());
    for i in 0..200 {
        let key = format!("k{}", i);
        run(&engine, &["zadd", key.as_str(), "1", "m"]);
        run(&engine, &["pexpire", key.as_str(), "5"]);
    }

    let mut handles = vec![];
    for _ in 0..4 {
        let engine_clone = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_millis(100);
            while Instant::now() < deadline {
                for i in 0..200 {
                    let key = format!("k{}", i);
                    let reply = run(&engine_clone, &["zscore", key.as_str(), "m"]);
                    assert!(reply == Reply::Nil || reply == Reply::str("1"));
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.key_count(), 0);
    assert_eq!(engine.expiring_count(), 0);
}
