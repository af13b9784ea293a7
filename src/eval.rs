//! The evaluation engine: the evaluator protocol and the dispatch loop.
//!
//! An [`Evaluator`] is the atomic resumable unit of validation. It is fed
//! one event at a time together with a nesting depth relative to the value
//! it was created for, and answers with a tri-state [`Outcome`]. Once an
//! evaluator returns a non-`Pending` outcome it is retired; callers never
//! feed a retired evaluator again.
//!
//! No evaluator controls stream advancement. The engine alone pulls events
//! from the source and derives absolute depth by counting container
//! open/close events: opens dispatch at the depth they open from and then
//! increment, closes decrement and then dispatch. A value therefore
//! occupies depth 0 at its first and last events and depth >= 1 inside.

use crate::error::StreamError;
use crate::problem::Problem;
use crate::schema::{SchemaId, SchemaStore};
use crate::stream::{Event, TokenSource};
use crate::validator::ValidationReport;

/// The tri-state result of feeding one event to an evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// More events are needed.
    Pending,
    /// The keyword holds for this value. The evaluator is retired.
    Satisfied,
    /// The keyword does not hold. Problems have been reported and the
    /// evaluator is retired.
    Violated,
}

impl Outcome {
    /// Whether this outcome retires the evaluator.
    pub fn is_final(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }
}

pub(crate) trait Evaluator {
    fn evaluate(
        &mut self,
        event: &Event,
        depth: usize,
        cursor: &Cursor,
        problems: &mut Vec<Problem>,
    ) -> Outcome;
}

pub(crate) type BoxedEvaluator<'s> = Box<dyn Evaluator + 's>;

/// Rebases absolute depth to evaluator-local depth.
///
/// Captures the depth at which the wrapped evaluator was instantiated, so
/// the same evaluator logic works no matter where in the document its
/// value sits: the wrapped evaluator always sees its own value at relative
/// depth 0.
pub(crate) struct Scoped<'s> {
    base: usize,
    inner: BoxedEvaluator<'s>,
}

impl<'s> Scoped<'s> {
    pub fn new(base: usize, inner: BoxedEvaluator<'s>) -> Self {
        Scoped { base, inner }
    }
}

impl Evaluator for Scoped<'_> {
    fn evaluate(
        &mut self,
        event: &Event,
        depth: usize,
        cursor: &Cursor,
        problems: &mut Vec<Problem>,
    ) -> Outcome {
        debug_assert!(depth >= self.base);
        self.inner
            .evaluate(event, depth.saturating_sub(self.base), cursor, problems)
    }
}

/// The evaluator of the `true` schema: satisfied by any value.
pub(crate) struct AlwaysSatisfied;

impl Evaluator for AlwaysSatisfied {
    fn evaluate(&mut self, _: &Event, _: usize, _: &Cursor, _: &mut Vec<Problem>) -> Outcome {
        Outcome::Satisfied
    }
}

/// The evaluator of the `false` schema: violated by any value.
pub(crate) struct FalseSchema {
    pub schema: SchemaId,
}

impl Evaluator for FalseSchema {
    fn evaluate(
        &mut self,
        _: &Event,
        _: usize,
        cursor: &Cursor,
        problems: &mut Vec<Problem>,
    ) -> Outcome {
        problems.push(Problem::new("schema", cursor.pointer(), self.schema));
        Outcome::Violated
    }
}

enum Frame {
    Object { key: Option<String> },
    Array { index: Option<usize> },
}

/// Tracks the JSON-Pointer location of the event being dispatched.
///
/// Maintained by the engine, read by evaluators when they report problems,
/// so individual evaluators never track paths themselves.
pub(crate) struct Cursor {
    frames: Vec<Frame>,
}

impl Cursor {
    pub fn new() -> Self {
        Cursor { frames: Vec::new() }
    }

    fn set_key(&mut self, key: &str) {
        if let Some(Frame::Object { key: slot }) = self.frames.last_mut() {
            *slot = Some(key.to_string());
        }
    }

    /// Advance the innermost slot for a value that is about to begin.
    fn enter_value(&mut self) {
        if let Some(Frame::Array { index }) = self.frames.last_mut() {
            *index = Some(index.map_or(0, |i| i + 1));
        }
    }

    fn push(&mut self, event: &Event) {
        match event {
            Event::StartObject => self.frames.push(Frame::Object { key: None }),
            Event::StartArray => self.frames.push(Frame::Array { index: None }),
            _ => {}
        }
    }

    /// Pop the innermost frame, returning the container kind that closed.
    fn pop(&mut self) -> Option<&'static str> {
        self.frames.pop().map(|frame| match frame {
            Frame::Object { .. } => "object",
            Frame::Array { .. } => "array",
        })
    }

    /// The RFC 6901 pointer of the current dispatch position.
    pub fn pointer(&self) -> String {
        let mut out = String::new();
        for frame in &self.frames {
            match frame {
                Frame::Object { key: Some(key) } => {
                    out.push('/');
                    out.push_str(&key.replace('~', "~0").replace('/', "~1"));
                }
                Frame::Array { index: Some(i) } => {
                    out.push('/');
                    out.push_str(&i.to_string());
                }
                _ => {}
            }
        }
        out
    }
}

/// Drive one validation run: build the root evaluator for the type of the
/// first event, dispatch every event into it, and keep draining the source
/// after the root resolves so the stream is fully consumed and its nesting
/// verified.
pub(crate) fn run(
    store: &SchemaStore,
    root: SchemaId,
    source: &mut dyn TokenSource,
) -> Result<ValidationReport, StreamError> {
    let first = source.next_event()?.ok_or(StreamError::EmptyStream)?;
    let ty = first.instance_type().ok_or(StreamError::NotAValue {
        actual: first.describe(),
    })?;

    let mut evaluator: Option<BoxedEvaluator<'_>> = Some(store.evaluator_for(root, ty));
    let mut problems = Vec::new();
    let mut cursor = Cursor::new();
    let mut verdict: Option<bool> = None;
    let mut depth: usize = 0;

    let mut next = Some(first);
    while let Some(event) = next {
        let dispatch_depth = match &event {
            Event::Key(key) => {
                cursor.set_key(key);
                depth
            }
            Event::EndObject | Event::EndArray => {
                if depth == 0 {
                    return Err(StreamError::UnbalancedClose);
                }
                depth -= 1;
                let open_kind = cursor.pop().ok_or(StreamError::UnbalancedClose)?;
                let close_kind = if event == Event::EndObject {
                    "object"
                } else {
                    "array"
                };
                if open_kind != close_kind {
                    return Err(StreamError::MismatchedClose {
                        expected: open_kind,
                        actual: close_kind,
                    });
                }
                depth
            }
            _ => {
                cursor.enter_value();
                depth
            }
        };

        if let Some(active) = evaluator.as_mut() {
            match active.evaluate(&event, dispatch_depth, &cursor, &mut problems) {
                Outcome::Pending => {}
                Outcome::Satisfied => {
                    verdict = Some(true);
                    evaluator = None;
                }
                Outcome::Violated => {
                    verdict = Some(false);
                    evaluator = None;
                }
            }
        }

        if event.is_open() {
            cursor.push(&event);
            depth += 1;
        }
        next = source.next_event()?;
    }

    if depth != 0 {
        return Err(StreamError::UnexpectedEnd { depth });
    }
    match verdict {
        Some(valid) => Ok(ValidationReport { valid, problems }),
        None => Err(StreamError::UnexpectedEnd { depth: 0 }),
    }
}
