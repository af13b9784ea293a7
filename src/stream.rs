//! Token sources: the forward-only event streams the engine consumes.

use serde_json::{Number, Value};

use crate::error::StreamError;
use crate::types::InstanceType;

/// One structural or scalar event in a JSON token stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    /// A field name inside an object.
    Key(String),
    String(String),
    Number(Number),
    Bool(bool),
    Null,
}

impl Event {
    /// Whether this event opens a container.
    pub fn is_open(&self) -> bool {
        matches!(self, Event::StartObject | Event::StartArray)
    }

    /// Whether this event closes a container.
    pub fn is_close(&self) -> bool {
        matches!(self, Event::EndObject | Event::EndArray)
    }

    /// Whether this event begins a value (scalar or container open).
    pub fn begins_value(&self) -> bool {
        !matches!(self, Event::Key(_) | Event::EndObject | Event::EndArray)
    }

    /// The instance type of the value this event begins, if any.
    pub fn instance_type(&self) -> Option<InstanceType> {
        match self {
            Event::StartObject => Some(InstanceType::Object),
            Event::StartArray => Some(InstanceType::Array),
            Event::String(_) => Some(InstanceType::String),
            Event::Number(n) => Some(InstanceType::of_number(n)),
            Event::Bool(_) => Some(InstanceType::Boolean),
            Event::Null => Some(InstanceType::Null),
            Event::Key(_) | Event::EndObject | Event::EndArray => None,
        }
    }

    /// A short name for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Event::StartObject => "start-object",
            Event::EndObject => "end-object",
            Event::StartArray => "start-array",
            Event::EndArray => "end-array",
            Event::Key(_) => "key",
            Event::String(_) => "string",
            Event::Number(_) => "number",
            Event::Bool(_) => "boolean",
            Event::Null => "null",
        }
    }
}

/// A forward-only producer of token events.
///
/// The source must guarantee well-formed nesting: every open is matched by
/// exactly one close at the same depth. The engine derives depth by
/// counting open/close events and reports malformed nesting as a
/// [`StreamError`], not as a validation problem.
pub trait TokenSource {
    /// Produce the next event, or `None` at end of stream.
    fn next_event(&mut self) -> Result<Option<Event>, StreamError>;
}

enum Frame<'a> {
    Value(&'a Value),
    Object(serde_json::map::Iter<'a>),
    Array(std::slice::Iter<'a, Value>),
    Member(&'a str, &'a Value),
}

/// A [`TokenSource`] over an already-parsed [`Value`].
///
/// Walks the tree iteratively with an explicit frame stack, so arbitrarily
/// deep documents stream without recursion.
pub struct ValueSource<'a> {
    stack: Vec<Frame<'a>>,
}

impl<'a> ValueSource<'a> {
    pub fn new(value: &'a Value) -> Self {
        ValueSource {
            stack: vec![Frame::Value(value)],
        }
    }
}

impl TokenSource for ValueSource<'_> {
    fn next_event(&mut self) -> Result<Option<Event>, StreamError> {
        loop {
            match self.stack.pop() {
                None => return Ok(None),
                Some(Frame::Value(value)) => {
                    return Ok(Some(match value {
                        Value::Null => Event::Null,
                        Value::Bool(b) => Event::Bool(*b),
                        Value::Number(n) => Event::Number(n.clone()),
                        Value::String(s) => Event::String(s.clone()),
                        Value::Array(items) => {
                            self.stack.push(Frame::Array(items.iter()));
                            Event::StartArray
                        }
                        Value::Object(map) => {
                            self.stack.push(Frame::Object(map.iter()));
                            Event::StartObject
                        }
                    }))
                }
                Some(Frame::Array(mut items)) => match items.next() {
                    Some(item) => {
                        self.stack.push(Frame::Array(items));
                        self.stack.push(Frame::Value(item));
                    }
                    None => return Ok(Some(Event::EndArray)),
                },
                Some(Frame::Object(mut members)) => match members.next() {
                    Some((key, value)) => {
                        self.stack.push(Frame::Object(members));
                        self.stack.push(Frame::Member(key, value));
                    }
                    None => return Ok(Some(Event::EndObject)),
                },
                Some(Frame::Member(key, value)) => {
                    self.stack.push(Frame::Value(value));
                    return Ok(Some(Event::Key(key.to_string())));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn drain(value: &Value) -> Vec<Event> {
        let mut source = ValueSource::new(value);
        let mut events = Vec::new();
        while let Some(ev) = source.next_event().unwrap() {
            events.push(ev);
        }
        events
    }

    #[test]
    fn scalar_is_one_event() {
        assert_eq!(drain(&json!(42)), vec![Event::Number(42.into())]);
        assert_eq!(drain(&json!(null)), vec![Event::Null]);
    }

    #[test]
    fn array_events_in_order() {
        let events = drain(&json!([1, "two"]));
        assert_eq!(
            events,
            vec![
                Event::StartArray,
                Event::Number(1.into()),
                Event::String("two".into()),
                Event::EndArray,
            ]
        );
    }

    #[test]
    fn object_events_interleave_keys() {
        let events = drain(&json!({"a": 1, "b": {"c": true}}));
        assert_eq!(
            events,
            vec![
                Event::StartObject,
                Event::Key("a".into()),
                Event::Number(1.into()),
                Event::Key("b".into()),
                Event::StartObject,
                Event::Key("c".into()),
                Event::Bool(true),
                Event::EndObject,
                Event::EndObject,
            ]
        );
    }

    #[test]
    fn nesting_is_balanced() {
        let events = drain(&json!({"a": [[{"b": []}]]}));
        let mut depth = 0i64;
        for ev in &events {
            if ev.is_open() {
                depth += 1;
            } else if ev.is_close() {
                depth -= 1;
                assert!(depth >= 0);
            }
        }
        assert_eq!(depth, 0);
    }

    #[test]
    fn event_instance_types() {
        assert_eq!(
            Event::StartArray.instance_type(),
            Some(InstanceType::Array)
        );
        assert_eq!(
            Event::Number(serde_json::Number::from_f64(1.5).unwrap()).instance_type(),
            Some(InstanceType::Number)
        );
        assert_eq!(Event::Key("k".into()).instance_type(), None);
        assert_eq!(Event::EndObject.instance_type(), None);
    }
}
