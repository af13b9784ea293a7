//! Bounded reconstruction of one instance subtree from events.
//!
//! Whole-value keywords (`enum`, `const`, `uniqueItems`) cannot be checked
//! incrementally, so they buffer the value they apply to. This is the one
//! place evaluators pay O(subtree) memory; everything else in the engine is
//! O(depth).

use serde_json::{Map, Value};

use crate::stream::Event;

enum Partial {
    Array(Vec<Value>),
    Object { map: Map<String, Value>, key: Option<String> },
}

/// Incrementally rebuilds one value from the event stream.
///
/// Feed every event of the value, starting with the one that begins it.
/// [`InstanceBuilder::append`] returns `true` while more events are needed;
/// once it returns `false` the completed value is available from
/// [`InstanceBuilder::take`].
pub(crate) struct InstanceBuilder {
    stack: Vec<Partial>,
    done: Option<Value>,
}

impl InstanceBuilder {
    pub fn new() -> Self {
        InstanceBuilder {
            stack: Vec::new(),
            done: None,
        }
    }

    /// Feed one event. Returns `true` while the value is still incomplete.
    pub fn append(&mut self, event: &Event) -> bool {
        match event {
            Event::StartArray => self.stack.push(Partial::Array(Vec::new())),
            Event::StartObject => self.stack.push(Partial::Object {
                map: Map::new(),
                key: None,
            }),
            Event::Key(k) => {
                if let Some(Partial::Object { key, .. }) = self.stack.last_mut() {
                    *key = Some(k.clone());
                }
            }
            Event::EndArray | Event::EndObject => {
                let completed = match self.stack.pop() {
                    Some(Partial::Array(items)) => Value::Array(items),
                    Some(Partial::Object { map, .. }) => Value::Object(map),
                    None => Value::Null,
                };
                self.push_value(completed);
            }
            Event::String(s) => self.push_value(Value::String(s.clone())),
            Event::Number(n) => self.push_value(Value::Number(n.clone())),
            Event::Bool(b) => self.push_value(Value::Bool(*b)),
            Event::Null => self.push_value(Value::Null),
        }
        self.done.is_none()
    }

    fn push_value(&mut self, value: Value) {
        match self.stack.last_mut() {
            None => self.done = Some(value),
            Some(Partial::Array(items)) => items.push(value),
            Some(Partial::Object { map, key }) => {
                if let Some(name) = key.take() {
                    map.insert(name, value);
                }
            }
        }
    }

    /// Take the completed value. Returns `Null` if called early.
    pub fn take(&mut self) -> Value {
        self.done.take().unwrap_or(Value::Null)
    }
}

/// A canonical string encoding for value identity: object keys are sorted
/// recursively so that member order does not affect equality.
pub(crate) fn canonical_key(value: &Value) -> String {
    canonicalize(value).to_string()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                if let Some(v) = map.get(key) {
                    sorted.insert(key.clone(), canonicalize(v));
                }
            }
            Value::Object(sorted)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{TokenSource, ValueSource};
    use serde_json::json;

    fn rebuild(value: &Value) -> Value {
        let mut source = ValueSource::new(value);
        let mut builder = InstanceBuilder::new();
        while let Some(ev) = source.next_event().unwrap() {
            if !builder.append(&ev) {
                break;
            }
        }
        builder.take()
    }

    #[test]
    fn scalar_completes_on_one_event() {
        let mut builder = InstanceBuilder::new();
        assert!(!builder.append(&Event::Number(7.into())));
        assert_eq!(builder.take(), json!(7));
    }

    #[test]
    fn rebuilds_nested_structures() {
        let value = json!({"a": [1, {"b": null}], "c": "x"});
        assert_eq!(rebuild(&value), value);
    }

    #[test]
    fn signals_incomplete_mid_container() {
        let mut builder = InstanceBuilder::new();
        assert!(builder.append(&Event::StartArray));
        assert!(builder.append(&Event::Number(1.into())));
        assert!(!builder.append(&Event::EndArray));
        assert_eq!(builder.take(), json!([1]));
    }

    #[test]
    fn canonical_key_ignores_member_order() {
        let a = json!({"x": 1, "y": [true]});
        let b = json!({"y": [true], "x": 1});
        assert_eq!(canonical_key(&a), canonical_key(&b));
    }

    #[test]
    fn canonical_key_distinguishes_values() {
        assert_ne!(canonical_key(&json!([1])), canonical_key(&json!([2])));
        assert_ne!(canonical_key(&json!(1)), canonical_key(&json!("1")));
    }
}
