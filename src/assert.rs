//! Leaf assertion evaluators.
//!
//! Shallow assertions (type, numeric and string bounds) resolve on the
//! first event of their value. Container assertions count events at
//! relative depth 1 and resolve at the close event at relative depth 0.
//! Whole-value assertions (enum, const, uniqueItems) go through the
//! capture buffer.

use std::collections::HashMap;

use serde_json::Value;

use crate::capture::{canonical_key, InstanceBuilder};
use crate::eval::{Cursor, Evaluator, Outcome};
use crate::keyword::PatternSpec;
use crate::problem::Problem;
use crate::schema::SchemaId;
use crate::stream::Event;
use crate::types::TypeSet;

/// The `type` assertion. Resolves on the first event of the value.
pub(crate) struct TypeCheck<'s> {
    pub expected: &'s TypeSet,
    pub schema: SchemaId,
}

impl Evaluator for TypeCheck<'_> {
    fn evaluate(
        &mut self,
        event: &Event,
        _depth: usize,
        cursor: &Cursor,
        problems: &mut Vec<Problem>,
    ) -> Outcome {
        let Some(actual) = event.instance_type() else {
            return Outcome::Satisfied;
        };
        if self.expected.admits(actual) {
            Outcome::Satisfied
        } else {
            let expected: Vec<Value> = self
                .expected
                .names()
                .into_iter()
                .map(Value::from)
                .collect();
            problems.push(
                Problem::new("type", cursor.pointer(), self.schema)
                    .param("actual", actual.name())
                    .param("expected", expected),
            );
            Outcome::Violated
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum NumberCheck {
    MultipleOf(f64),
    Maximum(f64),
    ExclusiveMaximum(f64),
    Minimum(f64),
    ExclusiveMinimum(f64),
}

/// Numeric assertions. Applicable to number and integer instances only,
/// so the first event is always a number.
pub(crate) struct NumericCheck {
    pub check: NumberCheck,
    pub schema: SchemaId,
}

impl Evaluator for NumericCheck {
    fn evaluate(
        &mut self,
        event: &Event,
        _depth: usize,
        cursor: &Cursor,
        problems: &mut Vec<Problem>,
    ) -> Outcome {
        let Event::Number(n) = event else {
            return Outcome::Satisfied;
        };
        let value = n.as_f64().unwrap_or(f64::NAN);
        let actual = Value::Number(n.clone());
        match self.check {
            NumberCheck::MultipleOf(divisor) => {
                // tolerate binary rounding in the quotient
                let quotient = value / divisor;
                if (quotient - quotient.round()).abs() < 1e-9 {
                    Outcome::Satisfied
                } else {
                    problems.push(
                        Problem::new("multipleOf", cursor.pointer(), self.schema)
                            .param("actual", actual)
                            .param("divisor", divisor),
                    );
                    Outcome::Violated
                }
            }
            NumberCheck::Maximum(bound) => {
                self.bound_result("maximum", value <= bound, actual, bound, cursor, problems)
            }
            NumberCheck::ExclusiveMaximum(bound) => self.bound_result(
                "exclusiveMaximum",
                value < bound,
                actual,
                bound,
                cursor,
                problems,
            ),
            NumberCheck::Minimum(bound) => {
                self.bound_result("minimum", value >= bound, actual, bound, cursor, problems)
            }
            NumberCheck::ExclusiveMinimum(bound) => self.bound_result(
                "exclusiveMinimum",
                value > bound,
                actual,
                bound,
                cursor,
                problems,
            ),
        }
    }
}

impl NumericCheck {
    fn bound_result(
        &self,
        keyword: &'static str,
        ok: bool,
        actual: Value,
        bound: f64,
        cursor: &Cursor,
        problems: &mut Vec<Problem>,
    ) -> Outcome {
        if ok {
            Outcome::Satisfied
        } else {
            problems.push(
                Problem::new(keyword, cursor.pointer(), self.schema)
                    .param("actual", actual)
                    .param("bound", bound),
            );
            Outcome::Violated
        }
    }
}

pub(crate) enum StringRule<'s> {
    MaxLength(u64),
    MinLength(u64),
    Pattern(&'s PatternSpec),
}

/// String assertions. Length is counted in Unicode code points.
pub(crate) struct StringCheck<'s> {
    pub rule: StringRule<'s>,
    pub schema: SchemaId,
}

impl Evaluator for StringCheck<'_> {
    fn evaluate(
        &mut self,
        event: &Event,
        _depth: usize,
        cursor: &Cursor,
        problems: &mut Vec<Problem>,
    ) -> Outcome {
        let Event::String(s) = event else {
            return Outcome::Satisfied;
        };
        match &self.rule {
            StringRule::MaxLength(bound) => {
                let actual = s.chars().count() as u64;
                if actual <= *bound {
                    Outcome::Satisfied
                } else {
                    problems.push(
                        Problem::new("maxLength", cursor.pointer(), self.schema)
                            .param("actual", actual)
                            .param("bound", *bound),
                    );
                    Outcome::Violated
                }
            }
            StringRule::MinLength(bound) => {
                let actual = s.chars().count() as u64;
                if actual >= *bound {
                    Outcome::Satisfied
                } else {
                    problems.push(
                        Problem::new("minLength", cursor.pointer(), self.schema)
                            .param("actual", actual)
                            .param("bound", *bound),
                    );
                    Outcome::Violated
                }
            }
            StringRule::Pattern(spec) => {
                if spec.regex.is_match(s) {
                    Outcome::Satisfied
                } else {
                    problems.push(
                        Problem::new("pattern", cursor.pointer(), self.schema)
                            .param("actual", s.clone())
                            .param("pattern", spec.source.clone()),
                    );
                    Outcome::Violated
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum CountBound {
    Max,
    Min,
}

/// `maxItems` / `minItems`: counts item starts at relative depth 1.
///
/// State is a single counter regardless of array length — this assertion
/// never buffers values.
pub(crate) struct ItemCount {
    pub bound: u64,
    pub kind: CountBound,
    pub count: u64,
    pub schema: SchemaId,
}

impl ItemCount {
    pub fn new(bound: u64, kind: CountBound, schema: SchemaId) -> Self {
        ItemCount {
            bound,
            kind,
            count: 0,
            schema,
        }
    }
}

impl Evaluator for ItemCount {
    fn evaluate(
        &mut self,
        event: &Event,
        depth: usize,
        cursor: &Cursor,
        problems: &mut Vec<Problem>,
    ) -> Outcome {
        if depth == 1 && event.begins_value() {
            self.count += 1;
            if self.kind == CountBound::Max && self.count > self.bound {
                problems.push(
                    Problem::new("maxItems", cursor.pointer(), self.schema)
                        .param("actual", self.count)
                        .param("bound", self.bound),
                );
                return Outcome::Violated;
            }
            Outcome::Pending
        } else if depth == 0 && *event == Event::EndArray {
            if self.kind == CountBound::Min && self.count < self.bound {
                problems.push(
                    Problem::new("minItems", cursor.pointer(), self.schema)
                        .param("actual", self.count)
                        .param("bound", self.bound),
                );
                Outcome::Violated
            } else {
                Outcome::Satisfied
            }
        } else {
            Outcome::Pending
        }
    }
}

/// `maxProperties` / `minProperties`: counts keys at relative depth 1.
pub(crate) struct PropertyCount {
    pub bound: u64,
    pub kind: CountBound,
    pub count: u64,
    pub schema: SchemaId,
}

impl PropertyCount {
    pub fn new(bound: u64, kind: CountBound, schema: SchemaId) -> Self {
        PropertyCount {
            bound,
            kind,
            count: 0,
            schema,
        }
    }
}

impl Evaluator for PropertyCount {
    fn evaluate(
        &mut self,
        event: &Event,
        depth: usize,
        cursor: &Cursor,
        problems: &mut Vec<Problem>,
    ) -> Outcome {
        if depth == 1 && matches!(event, Event::Key(_)) {
            self.count += 1;
            if self.kind == CountBound::Max && self.count > self.bound {
                problems.push(
                    Problem::new("maxProperties", cursor.pointer(), self.schema)
                        .param("actual", self.count)
                        .param("bound", self.bound),
                );
                return Outcome::Violated;
            }
            Outcome::Pending
        } else if depth == 0 && *event == Event::EndObject {
            if self.kind == CountBound::Min && self.count < self.bound {
                problems.push(
                    Problem::new("minProperties", cursor.pointer(), self.schema)
                        .param("actual", self.count)
                        .param("bound", self.bound),
                );
                Outcome::Violated
            } else {
                Outcome::Satisfied
            }
        } else {
            Outcome::Pending
        }
    }
}

/// `required`: tracks which declared names have been seen.
pub(crate) struct RequiredCheck<'s> {
    pub required: &'s [String],
    pub seen: Vec<bool>,
    pub schema: SchemaId,
}

impl<'s> RequiredCheck<'s> {
    pub fn new(required: &'s [String], schema: SchemaId) -> Self {
        RequiredCheck {
            required,
            seen: vec![false; required.len()],
            schema,
        }
    }
}

impl Evaluator for RequiredCheck<'_> {
    fn evaluate(
        &mut self,
        event: &Event,
        depth: usize,
        cursor: &Cursor,
        problems: &mut Vec<Problem>,
    ) -> Outcome {
        if depth == 1 {
            if let Event::Key(key) = event {
                if let Some(pos) = self.required.iter().position(|name| name == key) {
                    self.seen[pos] = true;
                }
            }
            Outcome::Pending
        } else if depth == 0 && *event == Event::EndObject {
            let missing: Vec<Value> = self
                .required
                .iter()
                .zip(&self.seen)
                .filter(|(_, seen)| !**seen)
                .map(|(name, _)| Value::from(name.as_str()))
                .collect();
            if missing.is_empty() {
                Outcome::Satisfied
            } else {
                problems.push(
                    Problem::new("required", cursor.pointer(), self.schema)
                        .param("missing", missing),
                );
                Outcome::Violated
            }
        } else {
            Outcome::Pending
        }
    }
}

/// `uniqueItems`: captures each item and maps canonical encodings to the
/// index where they first appeared. The map grows with the array — the
/// deliberate O(n) exception to the streaming principle.
pub(crate) struct UniqueItemsCheck {
    seen: HashMap<String, usize>,
    index: usize,
    builder: Option<InstanceBuilder>,
    schema: SchemaId,
}

impl UniqueItemsCheck {
    pub fn new(schema: SchemaId) -> Self {
        UniqueItemsCheck {
            seen: HashMap::new(),
            index: 0,
            builder: None,
            schema,
        }
    }

    #[cfg(test)]
    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }
}

impl Evaluator for UniqueItemsCheck {
    fn evaluate(
        &mut self,
        event: &Event,
        depth: usize,
        cursor: &Cursor,
        problems: &mut Vec<Problem>,
    ) -> Outcome {
        if depth == 0 {
            return if *event == Event::EndArray {
                Outcome::Satisfied
            } else {
                Outcome::Pending
            };
        }
        let builder = self.builder.get_or_insert_with(InstanceBuilder::new);
        if builder.append(event) {
            return Outcome::Pending;
        }
        let value = builder.take();
        self.builder = None;
        let index = self.index;
        self.index += 1;
        let key = canonical_key(&value);
        if let Some(&last_index) = self.seen.get(&key) {
            problems.push(
                Problem::new("uniqueItems", cursor.pointer(), self.schema)
                    .param("index", index as u64)
                    .param("lastIndex", last_index as u64),
            );
            Outcome::Violated
        } else {
            self.seen.insert(key, index);
            Outcome::Pending
        }
    }
}

pub(crate) enum Allowed<'s> {
    Enum(&'s [Value]),
    Const(&'s Value),
}

/// `enum` / `const`: captures the whole value, then compares.
pub(crate) struct ValueMatch<'s> {
    allowed: Allowed<'s>,
    builder: InstanceBuilder,
    schema: SchemaId,
}

impl<'s> ValueMatch<'s> {
    pub fn new(allowed: Allowed<'s>, schema: SchemaId) -> Self {
        ValueMatch {
            allowed,
            builder: InstanceBuilder::new(),
            schema,
        }
    }
}

impl Evaluator for ValueMatch<'_> {
    fn evaluate(
        &mut self,
        event: &Event,
        _depth: usize,
        cursor: &Cursor,
        problems: &mut Vec<Problem>,
    ) -> Outcome {
        if self.builder.append(event) {
            return Outcome::Pending;
        }
        let actual = self.builder.take();
        match &self.allowed {
            Allowed::Const(expected) => {
                if actual == **expected {
                    Outcome::Satisfied
                } else {
                    problems.push(
                        Problem::new("const", cursor.pointer(), self.schema)
                            .param("actual", actual)
                            .param("expected", (*expected).clone()),
                    );
                    Outcome::Violated
                }
            }
            Allowed::Enum(values) => {
                if values.iter().any(|candidate| *candidate == actual) {
                    Outcome::Satisfied
                } else {
                    problems.push(
                        Problem::new("enum", cursor.pointer(), self.schema)
                            .param("actual", actual)
                            .param("expected", Value::Array(values.to_vec())),
                    );
                    Outcome::Violated
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{TokenSource, ValueSource};
    use serde_json::json;

    fn feed_value(evaluator: &mut dyn Evaluator, value: &Value) -> (Outcome, Vec<Problem>) {
        let mut source = ValueSource::new(value);
        let cursor = Cursor::new();
        let mut problems = Vec::new();
        let mut depth: usize = 0;
        while let Some(event) = source.next_event().unwrap() {
            let dispatch = if event.is_close() { depth - 1 } else { depth };
            let outcome = evaluator.evaluate(&event, dispatch, &cursor, &mut problems);
            if outcome.is_final() {
                return (outcome, problems);
            }
            if event.is_open() {
                depth += 1;
            } else if event.is_close() {
                depth -= 1;
            }
        }
        (Outcome::Pending, problems)
    }

    #[test]
    fn type_check_integer_within_number() {
        let numbers = TypeSet::single(crate::types::InstanceType::Number);
        let mut check = TypeCheck {
            expected: &numbers,
            schema: SchemaId::ROOT,
        };
        let (outcome, _) = feed_value(&mut check, &json!(4));
        assert_eq!(outcome, Outcome::Satisfied);
    }

    #[test]
    fn type_check_rejects_fractional_integer() {
        let integers = TypeSet::single(crate::types::InstanceType::Integer);
        let mut check = TypeCheck {
            expected: &integers,
            schema: SchemaId::ROOT,
        };
        let (outcome, problems) = feed_value(&mut check, &json!(4.5));
        assert_eq!(outcome, Outcome::Violated);
        assert_eq!(problems[0].keyword, "type");
        assert_eq!(problems[0].params["actual"], "number");
    }

    #[test]
    fn multiple_of_params() {
        let mut check = NumericCheck {
            check: NumberCheck::MultipleOf(2.0),
            schema: SchemaId::ROOT,
        };
        let (outcome, _) = feed_value(&mut check, &json!(6));
        assert_eq!(outcome, Outcome::Satisfied);

        let mut check = NumericCheck {
            check: NumberCheck::MultipleOf(2.0),
            schema: SchemaId::ROOT,
        };
        let (outcome, problems) = feed_value(&mut check, &json!(5));
        assert_eq!(outcome, Outcome::Violated);
        assert_eq!(problems[0].params["actual"], json!(5));
        assert_eq!(problems[0].params["divisor"], json!(2.0));
    }

    #[test]
    fn multiple_of_tolerates_decimal_fractions() {
        let mut check = NumericCheck {
            check: NumberCheck::MultipleOf(0.1),
            schema: SchemaId::ROOT,
        };
        let (outcome, _) = feed_value(&mut check, &json!(0.3));
        assert_eq!(outcome, Outcome::Satisfied);
    }

    #[test]
    fn max_items_counts_and_reports_overflow() {
        let mut check = ItemCount::new(2, CountBound::Max, SchemaId::ROOT);
        let (outcome, problems) = feed_value(&mut check, &json!([1, 2, 3]));
        assert_eq!(outcome, Outcome::Violated);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].params["actual"], json!(3));
        assert_eq!(problems[0].params["bound"], json!(2));
    }

    #[test]
    fn max_items_counts_container_items_once() {
        let mut check = ItemCount::new(2, CountBound::Max, SchemaId::ROOT);
        let (outcome, _) = feed_value(&mut check, &json!([[1, 2], {"a": 1}]));
        assert_eq!(outcome, Outcome::Satisfied);
    }

    #[test]
    fn min_items_reports_at_close() {
        let mut check = ItemCount::new(3, CountBound::Min, SchemaId::ROOT);
        let (outcome, problems) = feed_value(&mut check, &json!([1]));
        assert_eq!(outcome, Outcome::Violated);
        assert_eq!(problems[0].keyword, "minItems");
        assert_eq!(problems[0].params["actual"], json!(1));
    }

    #[test]
    fn required_reports_missing_names() {
        let required = vec!["id".to_string(), "name".to_string()];
        let mut check = RequiredCheck::new(&required, SchemaId::ROOT);
        let (outcome, problems) = feed_value(&mut check, &json!({"name": "x"}));
        assert_eq!(outcome, Outcome::Violated);
        assert_eq!(problems[0].params["missing"], json!(["id"]));
    }

    #[test]
    fn unique_items_cites_both_indices() {
        let mut check = UniqueItemsCheck::new(SchemaId::ROOT);
        let (outcome, problems) = feed_value(&mut check, &json!([1, 2, 1]));
        assert_eq!(outcome, Outcome::Violated);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].params["index"], json!(2));
        assert_eq!(problems[0].params["lastIndex"], json!(0));
    }

    #[test]
    fn unique_items_clean_array() {
        let mut check = UniqueItemsCheck::new(SchemaId::ROOT);
        let (outcome, problems) = feed_value(&mut check, &json!([1, 2, 3]));
        assert_eq!(outcome, Outcome::Satisfied);
        assert!(problems.is_empty());
    }

    #[test]
    fn unique_items_compares_structures() {
        let mut check = UniqueItemsCheck::new(SchemaId::ROOT);
        let (outcome, problems) =
            feed_value(&mut check, &json!([{"a": 1, "b": 2}, {"b": 2, "a": 1}]));
        assert_eq!(outcome, Outcome::Violated);
        assert_eq!(problems[0].params["lastIndex"], json!(0));
    }

    // The streaming asymmetry: counting keeps a single counter, uniqueness
    // keeps one entry per item.
    #[test]
    fn memory_asymmetry_between_count_and_uniqueness() {
        let items: Vec<Value> = (0..64).map(Value::from).collect();
        let array = Value::Array(items);

        let mut unique = UniqueItemsCheck::new(SchemaId::ROOT);
        let (outcome, _) = feed_value(&mut unique, &array);
        assert_eq!(outcome, Outcome::Satisfied);
        assert_eq!(unique.seen_len(), 64);

        let mut count = ItemCount::new(1000, CountBound::Max, SchemaId::ROOT);
        let (outcome, _) = feed_value(&mut count, &array);
        assert_eq!(outcome, Outcome::Satisfied);
        assert_eq!(count.count, 64);
    }

    #[test]
    fn enum_matches_whole_values() {
        let allowed = vec![json!({"a": 1}), json!("x")];
        let mut check = ValueMatch::new(Allowed::Enum(&allowed), SchemaId::ROOT);
        let (outcome, _) = feed_value(&mut check, &json!({"a": 1}));
        assert_eq!(outcome, Outcome::Satisfied);

        let mut check = ValueMatch::new(Allowed::Enum(&allowed), SchemaId::ROOT);
        let (outcome, problems) = feed_value(&mut check, &json!({"a": 2}));
        assert_eq!(outcome, Outcome::Violated);
        assert_eq!(problems[0].keyword, "enum");
    }

    #[test]
    fn const_compares_exactly() {
        let expected = json!([1, 2]);
        let mut check = ValueMatch::new(Allowed::Const(&expected), SchemaId::ROOT);
        let (outcome, _) = feed_value(&mut check, &json!([1, 2]));
        assert_eq!(outcome, Outcome::Satisfied);

        let mut check = ValueMatch::new(Allowed::Const(&expected), SchemaId::ROOT);
        let (outcome, problems) = feed_value(&mut check, &json!([2, 1]));
        assert_eq!(outcome, Outcome::Violated);
        assert_eq!(problems[0].keyword, "const");
    }
}
