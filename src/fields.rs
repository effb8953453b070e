/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

use serde_json::Value;

/// `Fields` is the ordered set of key/value pairs that becomes one logfmt line. Keys keep the
/// position of their first insertion; inserting an existing key replaces its value in place.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Fields {
    pairs: Vec<(String, Value)>,
}

impl Fields {
    pub fn new() -> Self {
        Fields { pairs: Vec::new() }
    }

    /// Insert a pair, keeping the original position if the key already exists.
    pub fn insert(&mut self, key: impl Into<String>, val: impl Into<Value>) {
        let key = key.into();
        let val = val.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = val,
            None => self.pairs.push((key, val)),
        }
    }

    /// Chaining form of `insert`, used when building a kind's fixed field order.
    pub fn with(mut self, key: impl Into<String>, val: impl Into<Value>) -> Self {
        self.insert(key, val);
        self
    }

    /// Remove `key` and append it at the end with the given value.
    pub fn push_last(&mut self, key: &str, val: impl Into<Value>) {
        self.pairs.retain(|(k, _)| k != key);
        self.pairs.push((key.to_owned(), val.into()));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Promote a lone structured `data` field to top-level keys.
    ///
    /// When the mapping is exactly `{data: {...}}`, the result holds the inner object's entries
    /// instead, with nested objects and arrays JSON-encoded. Every other mapping, including
    /// `{data: <scalar>}`, comes back unchanged.
    pub fn flatten(self) -> Fields {
        let inner = match self.pairs.as_slice() {
            [(key, Value::Object(inner))] if key == "data" => inner,
            _ => return self,
        };

        let mut flat = Fields::new();
        for (key, val) in inner {
            match val {
                // null is written as JSON too, so it still shows up as `key=null`
                Value::Object(_) | Value::Array(_) | Value::Null => {
                    flat.insert(key.as_str(), val.to_string())
                }
                _ => flat.insert(key.as_str(), val.clone()),
            }
        }
        flat
    }
}

/// Render a field value as text: strings as-is, numbers and booleans in their textual form, and
/// objects or arrays as compact JSON. `null` has no text and yields `None`.
pub fn render_value(val: &Value) -> Option<String> {
    match val {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        // Value's Display is infallible compact JSON
        Value::Object(_) | Value::Array(_) => Some(val.to_string()),
    }
}

/// `render_value` for places that need a string regardless, such as tag lists.
pub fn render_text(val: &Value) -> String {
    render_value(val).unwrap_or_default()
}
