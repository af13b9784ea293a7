//! Keyword variants and their evaluator construction.
//!
//! Each keyword is one variant of a closed enum, paired with a small
//! [`Capabilities`] record the engine inspects instead of a class
//! hierarchy. A keyword inapplicable to the instance's runtime type
//! contributes no evaluator and is implicitly satisfied.

use regex::Regex;
use serde_json::Value;

use crate::assert::{
    Allowed, CountBound, ItemCount, NumberCheck, NumericCheck, PropertyCount, RequiredCheck,
    StringCheck, StringRule, TypeCheck, UniqueItemsCheck, ValueMatch,
};
use crate::combinator::{AnyOf, Conjunction, Negation, OneOf, Retaining};
use crate::eval::BoxedEvaluator;
use crate::schema::{SchemaId, SchemaStore};
use crate::structure::{ItemsEvaluator, PropertiesEvaluator};
use crate::types::{InstanceType, TypeSet};

/// A compiled regular expression keeping its source form for diagnostics.
#[derive(Debug, Clone)]
pub(crate) struct PatternSpec {
    pub source: String,
    pub regex: Regex,
}

/// One `patternProperties` entry.
#[derive(Debug, Clone)]
pub(crate) struct PatternProperty {
    pub pattern: PatternSpec,
    pub schema: SchemaId,
}

/// The two shapes of the `items` keyword.
#[derive(Debug, Clone)]
pub(crate) enum ItemsKind {
    /// One schema applied to every item.
    Uniform(SchemaId),
    /// Positional schemas, with `additionalItems` for the overflow.
    Tuple {
        prefix: Vec<SchemaId>,
        rest: Option<SchemaId>,
    },
}

/// What a keyword can do, inspected by the engine at construction time.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Capabilities {
    /// Contributes an evaluator (as opposed to pure structure).
    pub evaluates: bool,
    /// Applies to the same value as its owner rather than to children.
    pub in_place: bool,
    /// Owns subschemas.
    pub has_subschemas: bool,
    /// Has a defined behavior under the evaluate-then-invert wrapper.
    pub negatable: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum Keyword {
    Type(TypeSet),
    Enum(Vec<Value>),
    Const(Value),
    MultipleOf(f64),
    Maximum(f64),
    ExclusiveMaximum(f64),
    Minimum(f64),
    ExclusiveMinimum(f64),
    MaxLength(u64),
    MinLength(u64),
    Pattern(PatternSpec),
    MaxItems(u64),
    MinItems(u64),
    UniqueItems(bool),
    Items(ItemsKind),
    MaxProperties(u64),
    MinProperties(u64),
    Required(Vec<String>),
    Properties {
        named: Vec<(String, SchemaId)>,
        patterns: Vec<PatternProperty>,
        additional: Option<SchemaId>,
    },
    AllOf(Vec<SchemaId>),
    AnyOf(Vec<SchemaId>),
    OneOf(Vec<SchemaId>),
    Not(SchemaId),
    Ref {
        uri: String,
        target: SchemaId,
    },
}

impl Keyword {
    /// The keyword's name as it appears in schema documents.
    pub fn name(&self) -> &'static str {
        match self {
            Keyword::Type(_) => "type",
            Keyword::Enum(_) => "enum",
            Keyword::Const(_) => "const",
            Keyword::MultipleOf(_) => "multipleOf",
            Keyword::Maximum(_) => "maximum",
            Keyword::ExclusiveMaximum(_) => "exclusiveMaximum",
            Keyword::Minimum(_) => "minimum",
            Keyword::ExclusiveMinimum(_) => "exclusiveMinimum",
            Keyword::MaxLength(_) => "maxLength",
            Keyword::MinLength(_) => "minLength",
            Keyword::Pattern(_) => "pattern",
            Keyword::MaxItems(_) => "maxItems",
            Keyword::MinItems(_) => "minItems",
            Keyword::UniqueItems(_) => "uniqueItems",
            Keyword::Items(_) => "items",
            Keyword::MaxProperties(_) => "maxProperties",
            Keyword::MinProperties(_) => "minProperties",
            Keyword::Required(_) => "required",
            Keyword::Properties { .. } => "properties",
            Keyword::AllOf(_) => "allOf",
            Keyword::AnyOf(_) => "anyOf",
            Keyword::OneOf(_) => "oneOf",
            Keyword::Not(_) => "not",
            Keyword::Ref { .. } => "$ref",
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        let has_subschemas = !self.subschemas().is_empty();
        let in_place = matches!(
            self,
            Keyword::AllOf(_)
                | Keyword::AnyOf(_)
                | Keyword::OneOf(_)
                | Keyword::Not(_)
                | Keyword::Ref { .. }
        );
        Capabilities {
            evaluates: true,
            in_place,
            has_subschemas,
            // every keyword inverts cleanly under the generic wrapper
            negatable: true,
        }
    }

    /// All subschemas this keyword owns, for graph passes.
    pub fn subschemas(&self) -> Vec<SchemaId> {
        match self {
            Keyword::Items(ItemsKind::Uniform(id)) => vec![*id],
            Keyword::Items(ItemsKind::Tuple { prefix, rest }) => {
                let mut ids = prefix.clone();
                ids.extend(*rest);
                ids
            }
            Keyword::Properties {
                named,
                patterns,
                additional,
            } => {
                let mut ids: Vec<SchemaId> = named.iter().map(|(_, id)| *id).collect();
                ids.extend(patterns.iter().map(|p| p.schema));
                ids.extend(*additional);
                ids
            }
            Keyword::AllOf(ids) | Keyword::AnyOf(ids) | Keyword::OneOf(ids) => ids.clone(),
            Keyword::Not(id) => vec![*id],
            Keyword::Ref { target, .. } => vec![*target],
            _ => Vec::new(),
        }
    }

    /// Subschema edges that stay on the same instance value. Used for the
    /// compile-time cycle check: a cycle along these edges would recurse
    /// forever at evaluator construction.
    pub fn in_place_edges(&self) -> Vec<SchemaId> {
        let caps = self.capabilities();
        if caps.in_place && caps.has_subschemas {
            self.subschemas()
        } else {
            Vec::new()
        }
    }

    /// Whether this keyword constrains instances of the given type.
    pub fn applies_to(&self, ty: InstanceType) -> bool {
        match self {
            Keyword::Type(_) | Keyword::Enum(_) | Keyword::Const(_) => true,
            Keyword::MultipleOf(_)
            | Keyword::Maximum(_)
            | Keyword::ExclusiveMaximum(_)
            | Keyword::Minimum(_)
            | Keyword::ExclusiveMinimum(_) => {
                matches!(ty, InstanceType::Number | InstanceType::Integer)
            }
            Keyword::MaxLength(_) | Keyword::MinLength(_) | Keyword::Pattern(_) => {
                ty == InstanceType::String
            }
            Keyword::MaxItems(_)
            | Keyword::MinItems(_)
            | Keyword::UniqueItems(_)
            | Keyword::Items(_) => ty == InstanceType::Array,
            Keyword::MaxProperties(_)
            | Keyword::MinProperties(_)
            | Keyword::Required(_)
            | Keyword::Properties { .. } => ty == InstanceType::Object,
            Keyword::AllOf(_)
            | Keyword::AnyOf(_)
            | Keyword::OneOf(_)
            | Keyword::Not(_)
            | Keyword::Ref { .. } => true,
        }
    }

    /// Build the evaluator for one validation run, or `None` when the
    /// keyword does not apply to the instance type (implicitly satisfied).
    pub fn create_evaluator<'s>(
        &'s self,
        ty: InstanceType,
        store: &'s SchemaStore,
        owner: SchemaId,
    ) -> Option<BoxedEvaluator<'s>> {
        if !self.applies_to(ty) {
            return None;
        }
        Some(match self {
            Keyword::Type(expected) => Box::new(TypeCheck {
                expected,
                schema: owner,
            }),
            Keyword::Enum(values) => {
                Box::new(ValueMatch::new(Allowed::Enum(values), owner))
            }
            Keyword::Const(value) => Box::new(ValueMatch::new(Allowed::Const(value), owner)),
            Keyword::MultipleOf(divisor) => Box::new(NumericCheck {
                check: NumberCheck::MultipleOf(*divisor),
                schema: owner,
            }),
            Keyword::Maximum(bound) => Box::new(NumericCheck {
                check: NumberCheck::Maximum(*bound),
                schema: owner,
            }),
            Keyword::ExclusiveMaximum(bound) => Box::new(NumericCheck {
                check: NumberCheck::ExclusiveMaximum(*bound),
                schema: owner,
            }),
            Keyword::Minimum(bound) => Box::new(NumericCheck {
                check: NumberCheck::Minimum(*bound),
                schema: owner,
            }),
            Keyword::ExclusiveMinimum(bound) => Box::new(NumericCheck {
                check: NumberCheck::ExclusiveMinimum(*bound),
                schema: owner,
            }),
            Keyword::MaxLength(bound) => Box::new(StringCheck {
                rule: StringRule::MaxLength(*bound),
                schema: owner,
            }),
            Keyword::MinLength(bound) => Box::new(StringCheck {
                rule: StringRule::MinLength(*bound),
                schema: owner,
            }),
            Keyword::Pattern(spec) => Box::new(StringCheck {
                rule: StringRule::Pattern(spec),
                schema: owner,
            }),
            Keyword::MaxItems(bound) => {
                Box::new(ItemCount::new(*bound, CountBound::Max, owner))
            }
            Keyword::MinItems(bound) => {
                Box::new(ItemCount::new(*bound, CountBound::Min, owner))
            }
            Keyword::UniqueItems(unique) => {
                if !*unique {
                    return None;
                }
                Box::new(UniqueItemsCheck::new(owner))
            }
            Keyword::Items(kind) => Box::new(ItemsEvaluator::new(store, kind)),
            Keyword::MaxProperties(bound) => {
                Box::new(PropertyCount::new(*bound, CountBound::Max, owner))
            }
            Keyword::MinProperties(bound) => {
                Box::new(PropertyCount::new(*bound, CountBound::Min, owner))
            }
            Keyword::Required(names) => Box::new(RequiredCheck::new(names, owner)),
            Keyword::Properties {
                named,
                patterns,
                additional,
            } => Box::new(PropertiesEvaluator::new(
                store, named, patterns, *additional, owner,
            )),
            Keyword::AllOf(ids) => Box::new(Conjunction::new(
                ids.iter().map(|id| store.evaluator_for(*id, ty)).collect(),
            )),
            Keyword::AnyOf(ids) => Box::new(AnyOf::new(
                ids.iter()
                    .map(|id| Retaining::new(store.evaluator_for(*id, ty)))
                    .collect(),
            )),
            Keyword::OneOf(ids) => Box::new(OneOf::new(
                ids.iter()
                    .map(|id| Retaining::new(store.evaluator_for(*id, ty)))
                    .collect(),
                owner,
            )),
            Keyword::Not(id) => Box::new(Negation::new(store.evaluator_for(*id, ty), owner)),
            Keyword::Ref { target, .. } => store.evaluator_for(*target, ty),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_keywords_apply_to_integers() {
        let kw = Keyword::MultipleOf(2.0);
        assert!(kw.applies_to(InstanceType::Integer));
        assert!(kw.applies_to(InstanceType::Number));
        assert!(!kw.applies_to(InstanceType::String));
    }

    #[test]
    fn array_keywords_do_not_apply_to_objects() {
        let kw = Keyword::MaxItems(3);
        assert!(kw.applies_to(InstanceType::Array));
        assert!(!kw.applies_to(InstanceType::Object));
    }

    #[test]
    fn in_place_capability() {
        assert!(Keyword::AllOf(vec![SchemaId::ROOT]).capabilities().in_place);
        assert!(Keyword::Not(SchemaId::ROOT).capabilities().in_place);
        assert!(!Keyword::MaxItems(1).capabilities().in_place);
        assert!(!Keyword::Items(ItemsKind::Uniform(SchemaId::ROOT))
            .capabilities()
            .in_place);
    }

    #[test]
    fn subschema_listing() {
        let kw = Keyword::Items(ItemsKind::Tuple {
            prefix: vec![SchemaId::ROOT],
            rest: Some(SchemaId::ROOT),
        });
        assert_eq!(kw.subschemas().len(), 2);
        assert!(kw.in_place_edges().is_empty());

        let kw = Keyword::OneOf(vec![SchemaId::ROOT, SchemaId::ROOT]);
        assert_eq!(kw.in_place_edges().len(), 2);
    }
}
