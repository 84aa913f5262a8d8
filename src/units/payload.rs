// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Small helpers for walking JSON payloads by dotted path.

use serde_json::{Map, Value};

/// Resolve `a.b.c` inside `payload`. Numeric segments index into arrays.
pub fn lookup_path<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(payload, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Mutable variant of [`lookup_path`].
pub fn lookup_path_mut<'a>(payload: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.').try_fold(payload, |current, segment| match current {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |i| items.get_mut(i)),
        _ => None,
    })
}

/// Insert `value` at `path`, creating intermediate objects as needed.
///
/// Fails when an intermediate segment exists but is not an object.
pub fn insert_path(payload: &mut Value, path: &str, value: Value) -> Result<(), String> {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return Err("empty field path".to_string());
    };

    let mut current = payload;
    for segment in segments {
        let Value::Object(map) = current else {
            return Err(format!("'{}' is not inside an object", segment));
        };
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    match current {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            Ok(())
        }
        _ => Err(format!("cannot set '{}' on a non-object value", path)),
    }
}

/// JSON equality that treats `1` and `1.0` as the same number.
pub fn numbers_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => lhs == rhs,
    }
}
