// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

#[test]
fn id_buf_hash_map_lookup() {
    let mut map = HashMap::new();
    map.insert(IdBuf::new("nav-S1-123"), 42);
    assert_eq!(map.get("nav-S1-123"), Some(&42));
}

#[test]
fn id_buf_round_trips_through_display() {
    let id = IdBuf::new("nav-S1-123456789");
    assert_eq!(id.as_str(), "nav-S1-123456789");
    assert_eq!(id.to_string(), "nav-S1-123456789");
}

#[test]
fn id_buf_empty_is_empty() {
    assert!(IdBuf::empty().is_empty());
    assert!(!IdBuf::new("x").is_empty());
}

#[test]
fn short_fn_truncates() {
    let s = "abcdefghijklmnop";
    assert_eq!(short(s, 8), "abcdefgh");
    assert_eq!(short(s, 100), s);
    assert_eq!(short("abc", 8), "abc");
}

#[test]
fn id_buf_serde_round_trip() {
    let id = IdBuf::new("mcoord-X1-AU21-42");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"mcoord-X1-AU21-42\"");
    let back: IdBuf = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
