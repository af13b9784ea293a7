//! Structural combinators: per-property and per-item evaluation.
//!
//! These install a child evaluator for each member value as it begins,
//! wrapped in a depth-scoping adapter so the child sees its own value at
//! relative depth 0. Members are sequential, so at most one child is live
//! at a time; verdicts accumulate until the enclosing container closes.

use crate::combinator::Conjunction;
use crate::eval::{BoxedEvaluator, Cursor, Evaluator, Outcome, Scoped};
use crate::keyword::{ItemsKind, PatternProperty};
use crate::problem::Problem;
use crate::schema::{SchemaId, SchemaStore};
use crate::stream::Event;

/// Evaluates an item that the tuple form does not allow: `additionalItems`
/// is the `false` schema, so the item's first event is a violation.
pub(crate) struct RedundantItem {
    pub index: usize,
    pub schema: SchemaId,
}

impl Evaluator for RedundantItem {
    fn evaluate(
        &mut self,
        _: &Event,
        _: usize,
        cursor: &Cursor,
        problems: &mut Vec<Problem>,
    ) -> Outcome {
        problems.push(
            Problem::new("additionalItems", cursor.pointer(), self.schema)
                .param("index", self.index as u64),
        );
        Outcome::Violated
    }
}

/// Evaluates a property that `additionalProperties: false` disallows.
pub(crate) struct RedundantProperty {
    pub name: String,
    pub schema: SchemaId,
}

impl Evaluator for RedundantProperty {
    fn evaluate(
        &mut self,
        _: &Event,
        _: usize,
        cursor: &Cursor,
        problems: &mut Vec<Problem>,
    ) -> Outcome {
        problems.push(
            Problem::new("additionalProperties", cursor.pointer(), self.schema)
                .param("name", self.name.clone()),
        );
        Outcome::Violated
    }
}

/// Feed a freshly created child its first event and fold the result into
/// the parent's bookkeeping. Returns the child back if it is still live.
fn start_child<'s>(
    mut child: BoxedEvaluator<'s>,
    event: &Event,
    depth: usize,
    cursor: &Cursor,
    problems: &mut Vec<Problem>,
    violated: &mut bool,
) -> Option<BoxedEvaluator<'s>> {
    match child.evaluate(event, depth, cursor, problems) {
        Outcome::Pending => Some(child),
        Outcome::Satisfied => None,
        Outcome::Violated => {
            *violated = true;
            None
        }
    }
}

/// Per-property conjunctive combinator.
///
/// Routes each member value to the schemas that apply to its name:
/// the declared property schema, every matching pattern schema, and the
/// additional-properties schema when nothing else matched.
pub(crate) struct PropertiesEvaluator<'s> {
    store: &'s SchemaStore,
    named: &'s [(String, SchemaId)],
    patterns: &'s [PatternProperty],
    additional: Option<SchemaId>,
    schema: SchemaId,
    pending_key: Option<String>,
    child: Option<BoxedEvaluator<'s>>,
    violated: bool,
}

impl<'s> PropertiesEvaluator<'s> {
    pub fn new(
        store: &'s SchemaStore,
        named: &'s [(String, SchemaId)],
        patterns: &'s [PatternProperty],
        additional: Option<SchemaId>,
        schema: SchemaId,
    ) -> Self {
        PropertiesEvaluator {
            store,
            named,
            patterns,
            additional,
            schema,
            pending_key: None,
            child: None,
            violated: false,
        }
    }

    fn child_for(&self, key: &str, event: &Event, depth: usize) -> Option<BoxedEvaluator<'s>> {
        let ty = event.instance_type()?;
        let mut subschemas: Vec<SchemaId> = Vec::new();
        if let Some((_, id)) = self.named.iter().find(|(name, _)| name == key) {
            subschemas.push(*id);
        }
        for pattern in self.patterns {
            if pattern.pattern.regex.is_match(key) {
                subschemas.push(pattern.schema);
            }
        }
        if subschemas.is_empty() {
            let additional = self.additional?;
            if self.store.is_false(additional) {
                let redundant = RedundantProperty {
                    name: key.to_string(),
                    schema: additional,
                };
                return Some(Box::new(Scoped::new(depth, Box::new(redundant))));
            }
            subschemas.push(additional);
        }
        let inner: BoxedEvaluator<'s> = if subschemas.len() == 1 {
            self.store.evaluator_for(subschemas[0], ty)
        } else {
            Box::new(Conjunction::new(
                subschemas
                    .iter()
                    .map(|id| self.store.evaluator_for(*id, ty))
                    .collect(),
            ))
        };
        Some(Box::new(Scoped::new(depth, inner)))
    }
}

impl Evaluator for PropertiesEvaluator<'_> {
    fn evaluate(
        &mut self,
        event: &Event,
        depth: usize,
        cursor: &Cursor,
        problems: &mut Vec<Problem>,
    ) -> Outcome {
        if let Some(child) = self.child.as_mut() {
            match child.evaluate(event, depth, cursor, problems) {
                Outcome::Pending => {}
                Outcome::Satisfied => self.child = None,
                Outcome::Violated => {
                    self.child = None;
                    self.violated = true;
                }
            }
            return Outcome::Pending;
        }
        match event {
            Event::Key(key) if depth == 1 => {
                self.pending_key = Some(key.clone());
                Outcome::Pending
            }
            ev if depth == 1 && ev.begins_value() => {
                if let Some(key) = self.pending_key.take() {
                    if let Some(child) = self.child_for(&key, ev, depth) {
                        self.child =
                            start_child(child, ev, depth, cursor, problems, &mut self.violated);
                    }
                }
                Outcome::Pending
            }
            Event::EndObject if depth == 0 => {
                if self.violated {
                    Outcome::Violated
                } else {
                    Outcome::Satisfied
                }
            }
            _ => Outcome::Pending,
        }
    }
}

/// Per-item conjunctive combinator for `items` / `additionalItems`.
pub(crate) struct ItemsEvaluator<'s> {
    store: &'s SchemaStore,
    kind: &'s ItemsKind,
    index: usize,
    child: Option<BoxedEvaluator<'s>>,
    violated: bool,
}

impl<'s> ItemsEvaluator<'s> {
    pub fn new(store: &'s SchemaStore, kind: &'s ItemsKind) -> Self {
        ItemsEvaluator {
            store,
            kind,
            index: 0,
            child: None,
            violated: false,
        }
    }

    fn child_for(&self, event: &Event, depth: usize) -> Option<BoxedEvaluator<'s>> {
        let ty = event.instance_type()?;
        let (selected, from_rest) = match self.kind {
            ItemsKind::Uniform(id) => (Some(*id), false),
            ItemsKind::Tuple { prefix, rest } => match prefix.get(self.index) {
                Some(id) => (Some(*id), false),
                None => (*rest, true),
            },
        };
        let id = selected?;
        let inner: BoxedEvaluator<'s> = if from_rest && self.store.is_false(id) {
            Box::new(RedundantItem {
                index: self.index,
                schema: id,
            })
        } else {
            self.store.evaluator_for(id, ty)
        };
        Some(Box::new(Scoped::new(depth, inner)))
    }
}

impl Evaluator for ItemsEvaluator<'_> {
    fn evaluate(
        &mut self,
        event: &Event,
        depth: usize,
        cursor: &Cursor,
        problems: &mut Vec<Problem>,
    ) -> Outcome {
        if let Some(child) = self.child.as_mut() {
            match child.evaluate(event, depth, cursor, problems) {
                Outcome::Pending => {}
                Outcome::Satisfied => self.child = None,
                Outcome::Violated => {
                    self.child = None;
                    self.violated = true;
                }
            }
            return Outcome::Pending;
        }
        match event {
            ev if depth == 1 && ev.begins_value() => {
                if let Some(child) = self.child_for(ev, depth) {
                    self.child =
                        start_child(child, ev, depth, cursor, problems, &mut self.violated);
                }
                self.index += 1;
                Outcome::Pending
            }
            Event::EndArray if depth == 0 => {
                if self.violated {
                    Outcome::Violated
                } else {
                    Outcome::Satisfied
                }
            }
            _ => Outcome::Pending,
        }
    }
}
