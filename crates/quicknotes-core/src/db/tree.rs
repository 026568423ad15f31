//! Local JSON tree mirroring a database location.
//!
//! Writes follow Realtime Database semantics: `null` removes a value, and
//! objects left without children disappear.

use serde_json::{Map, Value};

pub fn get<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(root, |node, segment| node.as_object()?.get(segment))
}

/// Replace the value at `segments`.
pub fn set(root: &mut Value, segments: &[String], value: Value) {
    let value = normalize(value);
    if value.is_null() {
        remove(root, segments);
        return;
    }

    let mut node = root;
    for segment in segments {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map.entry(segment.clone()).or_insert(Value::Null),
            _ => return,
        };
    }
    *node = value;
}

/// Apply a multi-location update: each key of `children` is a path
/// relative to `segments`.
pub fn update(root: &mut Value, segments: &[String], children: Map<String, Value>) {
    for (key, value) in children {
        let mut target = segments.to_vec();
        target.extend(
            key.split('/')
                .filter(|part| !part.is_empty())
                .map(str::to_string),
        );
        set(root, &target, value);
    }
}

fn remove(node: &mut Value, segments: &[String]) {
    let Some((first, rest)) = segments.split_first() else {
        *node = Value::Null;
        return;
    };
    let Value::Object(map) = &mut *node else {
        return;
    };

    if rest.is_empty() {
        map.remove(first);
    } else if let Some(child) = map.get_mut(first) {
        remove(child, rest);
        if child.is_null() {
            map.remove(first);
        }
    }

    if map.is_empty() {
        *node = Value::Null;
    }
}

fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let cleaned = map
                .into_iter()
                .filter_map(|(key, child)| {
                    let child = normalize(child);
                    (!child.is_null()).then_some((key, child))
                })
                .collect::<Map<_, _>>();
            if cleaned.is_empty() {
                Value::Null
            } else {
                Value::Object(cleaned)
            }
        }
        other => other,
    }
}
