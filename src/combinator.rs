//! Logical combinators: conjunction, disjunction, exactly-one, negation.
//!
//! Combinators aggregate live child evaluators over the same value. They
//! dispatch every event to every live child, retire children on their
//! first final outcome, and never consume the stream themselves — the
//! engine owns stream position, so a resolved combinator simply stops
//! being fed while siblings continue.

use crate::eval::{BoxedEvaluator, Cursor, Evaluator, Outcome};
use crate::problem::Problem;
use crate::schema::SchemaId;
use crate::stream::Event;

/// AND over child evaluators rooted at the same value.
///
/// The verdict is fixed `Violated` the moment any child violates, but the
/// combinator keeps feeding its remaining live children so every problem
/// in scope is discovered; it surfaces the verdict once all children have
/// resolved. Child problems flow straight through to the run's sink.
pub(crate) struct Conjunction<'s> {
    children: Vec<BoxedEvaluator<'s>>,
    violated: bool,
}

impl<'s> Conjunction<'s> {
    pub fn new(children: Vec<BoxedEvaluator<'s>>) -> Self {
        Conjunction {
            children,
            violated: false,
        }
    }
}

impl Evaluator for Conjunction<'_> {
    fn evaluate(
        &mut self,
        event: &Event,
        depth: usize,
        cursor: &Cursor,
        problems: &mut Vec<Problem>,
    ) -> Outcome {
        let mut i = 0;
        while i < self.children.len() {
            match self.children[i].evaluate(event, depth, cursor, problems) {
                Outcome::Pending => i += 1,
                Outcome::Satisfied => {
                    self.children.remove(i);
                }
                Outcome::Violated => {
                    self.violated = true;
                    self.children.remove(i);
                }
            }
        }
        if self.children.is_empty() {
            if self.violated {
                Outcome::Violated
            } else {
                Outcome::Satisfied
            }
        } else {
            Outcome::Pending
        }
    }
}

/// Wraps a child evaluator and buffers the problems it emits, so a
/// disjunctive parent can defer or discard them once the branch's fate is
/// known.
pub(crate) struct Retaining<'s> {
    inner: BoxedEvaluator<'s>,
    problems: Vec<Problem>,
}

impl<'s> Retaining<'s> {
    pub fn new(inner: BoxedEvaluator<'s>) -> Self {
        Retaining {
            inner,
            problems: Vec::new(),
        }
    }

    pub fn evaluate(&mut self, event: &Event, depth: usize, cursor: &Cursor) -> Outcome {
        self.inner.evaluate(event, depth, cursor, &mut self.problems)
    }

    pub fn into_problems(self) -> Vec<Problem> {
        self.problems
    }
}

/// OR: satisfied the instant any child satisfies.
///
/// Remaining children are abandoned on success; the engine still drains
/// the scope. If every child violates, the union of all buffered problems
/// is reported, since no single branch is "the" cause.
pub(crate) struct AnyOf<'s> {
    live: Vec<Retaining<'s>>,
    failed: Vec<Retaining<'s>>,
}

impl<'s> AnyOf<'s> {
    pub fn new(children: Vec<Retaining<'s>>) -> Self {
        AnyOf {
            live: children,
            failed: Vec::new(),
        }
    }
}

impl Evaluator for AnyOf<'_> {
    fn evaluate(
        &mut self,
        event: &Event,
        depth: usize,
        cursor: &Cursor,
        problems: &mut Vec<Problem>,
    ) -> Outcome {
        let mut i = 0;
        while i < self.live.len() {
            match self.live[i].evaluate(event, depth, cursor) {
                Outcome::Pending => i += 1,
                Outcome::Satisfied => return Outcome::Satisfied,
                Outcome::Violated => {
                    let child = self.live.remove(i);
                    self.failed.push(child);
                }
            }
        }
        if self.live.is_empty() {
            for child in self.failed.drain(..) {
                problems.extend(child.into_problems());
            }
            Outcome::Violated
        } else {
            Outcome::Pending
        }
    }
}

/// Exactly-one: counts successful branches.
///
/// Cannot resolve early on a single success, because a later success
/// changes the outcome; it resolves once every branch has. Zero matches
/// report the union of all buffered problems; two or more report an
/// ambiguous-match problem naming the successful branch indices.
pub(crate) struct OneOf<'s> {
    live: Vec<(usize, Retaining<'s>)>,
    failed: Vec<Retaining<'s>>,
    matched: Vec<usize>,
    schema: SchemaId,
}

impl<'s> OneOf<'s> {
    pub fn new(children: Vec<Retaining<'s>>, schema: SchemaId) -> Self {
        OneOf {
            live: children.into_iter().enumerate().collect(),
            failed: Vec::new(),
            matched: Vec::new(),
            schema,
        }
    }
}

impl Evaluator for OneOf<'_> {
    fn evaluate(
        &mut self,
        event: &Event,
        depth: usize,
        cursor: &Cursor,
        problems: &mut Vec<Problem>,
    ) -> Outcome {
        let mut i = 0;
        while i < self.live.len() {
            match self.live[i].1.evaluate(event, depth, cursor) {
                Outcome::Pending => i += 1,
                Outcome::Satisfied => {
                    let (branch, _) = self.live.remove(i);
                    self.matched.push(branch);
                }
                Outcome::Violated => {
                    let (_, child) = self.live.remove(i);
                    self.failed.push(child);
                }
            }
        }
        if !self.live.is_empty() {
            return Outcome::Pending;
        }
        match self.matched.len() {
            1 => Outcome::Satisfied,
            0 => {
                for child in self.failed.drain(..) {
                    problems.extend(child.into_problems());
                }
                Outcome::Violated
            }
            _ => {
                let matched: Vec<serde_json::Value> = self
                    .matched
                    .iter()
                    .map(|b| serde_json::Value::from(*b as u64))
                    .collect();
                problems.push(
                    Problem::new("oneOf", cursor.pointer(), self.schema)
                        .param("matched", matched),
                );
                Outcome::Violated
            }
        }
    }
}

/// NOT: inverts one child.
///
/// The generic evaluate-then-invert wrapper is the uniform negation
/// strategy: the child runs unchanged, its buffered problems are dropped
/// when it violates (which satisfies the negation), and a single generic
/// problem is reported when it satisfies, since no deeper detail is
/// meaningful under inversion.
pub(crate) struct Negation<'s> {
    inner: Retaining<'s>,
    schema: SchemaId,
}

impl<'s> Negation<'s> {
    pub fn new(inner: BoxedEvaluator<'s>, schema: SchemaId) -> Self {
        Negation {
            inner: Retaining::new(inner),
            schema,
        }
    }
}

impl Evaluator for Negation<'_> {
    fn evaluate(
        &mut self,
        event: &Event,
        depth: usize,
        cursor: &Cursor,
        problems: &mut Vec<Problem>,
    ) -> Outcome {
        match self.inner.evaluate(event, depth, cursor) {
            Outcome::Pending => Outcome::Pending,
            Outcome::Satisfied => {
                problems.push(Problem::new("not", cursor.pointer(), self.schema));
                Outcome::Violated
            }
            Outcome::Violated => Outcome::Satisfied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{AlwaysSatisfied, FalseSchema};

    fn satisfied<'s>() -> BoxedEvaluator<'s> {
        Box::new(AlwaysSatisfied)
    }

    fn violated<'s>() -> BoxedEvaluator<'s> {
        Box::new(FalseSchema {
            schema: SchemaId::ROOT,
        })
    }

    fn feed(evaluator: &mut dyn Evaluator) -> (Outcome, Vec<Problem>) {
        let cursor = Cursor::new();
        let mut problems = Vec::new();
        let outcome = evaluator.evaluate(&Event::Null, 0, &cursor, &mut problems);
        (outcome, problems)
    }

    #[test]
    fn conjunction_needs_all() {
        let mut all = Conjunction::new(vec![satisfied(), satisfied()]);
        let (outcome, problems) = feed(&mut all);
        assert_eq!(outcome, Outcome::Satisfied);
        assert!(problems.is_empty());
    }

    #[test]
    fn conjunction_collects_every_failure() {
        let mut all = Conjunction::new(vec![violated(), satisfied(), violated()]);
        let (outcome, problems) = feed(&mut all);
        assert_eq!(outcome, Outcome::Violated);
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn any_of_short_circuits_on_success() {
        let mut any = AnyOf::new(vec![
            Retaining::new(violated()),
            Retaining::new(satisfied()),
        ]);
        let (outcome, problems) = feed(&mut any);
        assert_eq!(outcome, Outcome::Satisfied);
        // the failed branch's problems are discarded, not reported
        assert!(problems.is_empty());
    }

    #[test]
    fn any_of_reports_union_when_all_fail() {
        let mut any = AnyOf::new(vec![
            Retaining::new(violated()),
            Retaining::new(violated()),
        ]);
        let (outcome, problems) = feed(&mut any);
        assert_eq!(outcome, Outcome::Violated);
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn one_of_single_match() {
        let mut one = OneOf::new(
            vec![Retaining::new(satisfied()), Retaining::new(violated())],
            SchemaId::ROOT,
        );
        let (outcome, problems) = feed(&mut one);
        assert_eq!(outcome, Outcome::Satisfied);
        assert!(problems.is_empty());
    }

    #[test]
    fn one_of_ambiguous_match_names_branches() {
        let mut one = OneOf::new(
            vec![Retaining::new(satisfied()), Retaining::new(satisfied())],
            SchemaId::ROOT,
        );
        let (outcome, problems) = feed(&mut one);
        assert_eq!(outcome, Outcome::Violated);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].keyword, "oneOf");
        assert_eq!(
            problems[0].params["matched"],
            serde_json::json!([0, 1])
        );
    }

    #[test]
    fn one_of_no_match_reports_all() {
        let mut one = OneOf::new(
            vec![Retaining::new(violated()), Retaining::new(violated())],
            SchemaId::ROOT,
        );
        let (outcome, problems) = feed(&mut one);
        assert_eq!(outcome, Outcome::Violated);
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn negation_inverts_and_swallows_child_problems() {
        let mut not = Negation::new(violated(), SchemaId::ROOT);
        let (outcome, problems) = feed(&mut not);
        assert_eq!(outcome, Outcome::Satisfied);
        assert!(problems.is_empty());

        let mut not = Negation::new(satisfied(), SchemaId::ROOT);
        let (outcome, problems) = feed(&mut not);
        assert_eq!(outcome, Outcome::Violated);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].keyword, "not");
    }
}
