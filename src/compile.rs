//! Schema compilation: documents become node arenas.
//!
//! Parsing walks the document once, registering every node under its JSON
//! Pointer. A single link pass then resolves `$ref` targets against the
//! pointer index, rejects cycles that run purely through in-place
//! keywords, and runs the negation capability check. Everything raised
//! here is a [`SchemaError`] — validation runs never see a half-built
//! schema.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::keyword::{ItemsKind, Keyword, PatternProperty, PatternSpec};
use crate::schema::{Schema, SchemaId, SchemaNode, SchemaStore};
use crate::types::{json_type_name, InstanceType, TypeSet};

const UNRESOLVED: SchemaId = SchemaId(u32::MAX);

/// Compile a schema document into a validation-ready [`Schema`].
///
/// # Errors
///
/// Returns [`SchemaError`] for malformed keyword values, unresolved or
/// in-place-cyclic references, and unsupported negations.
pub fn compile(document: &Value) -> Result<Schema, SchemaError> {
    let mut compiler = Compiler {
        nodes: Vec::new(),
        pointers: HashMap::new(),
        locations: Vec::new(),
    };
    let root = compiler.parse(document, "#")?;
    compiler.link()?;
    Ok(Schema {
        store: SchemaStore {
            nodes: compiler.nodes,
            pointers: compiler.pointers,
        },
        root,
    })
}

struct Compiler {
    nodes: Vec<SchemaNode>,
    pointers: HashMap<String, SchemaId>,
    // node pointer strings, parallel to `nodes`, for link-time errors
    locations: Vec<String>,
}

fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

impl Compiler {
    fn reserve(&mut self, pointer: &str) -> SchemaId {
        let id = SchemaId(self.nodes.len() as u32);
        self.nodes.push(SchemaNode::Boolean(true));
        self.locations.push(pointer.to_string());
        self.pointers.insert(pointer.to_string(), id);
        id
    }

    fn parse(&mut self, value: &Value, pointer: &str) -> Result<SchemaId, SchemaError> {
        match value {
            Value::Bool(b) => {
                let id = self.reserve(pointer);
                self.nodes[id.0 as usize] = SchemaNode::Boolean(*b);
                Ok(id)
            }
            Value::Object(map) => {
                let id = self.reserve(pointer);
                let keywords = self.parse_keywords(map, pointer)?;
                self.nodes[id.0 as usize] = SchemaNode::Keywords(keywords);
                Ok(id)
            }
            other => Err(SchemaError::NotASchema {
                pointer: pointer.to_string(),
                actual: json_type_name(other),
            }),
        }
    }

    fn parse_keywords(
        &mut self,
        map: &Map<String, Value>,
        pointer: &str,
    ) -> Result<Vec<Keyword>, SchemaError> {
        let mut keywords = Vec::new();
        let mut properties_done = false;

        for (key, value) in map {
            let at = format!("{}/{}", pointer, escape(key));
            match key.as_str() {
                "type" => keywords.push(Keyword::Type(parse_type(value, &at)?)),
                "enum" => {
                    let Some(values) = value.as_array() else {
                        return Err(invalid("enum", &at, "expected an array"));
                    };
                    keywords.push(Keyword::Enum(values.clone()));
                }
                "const" => keywords.push(Keyword::Const(value.clone())),
                "multipleOf" => {
                    let divisor = number_value("multipleOf", value, &at)?;
                    if divisor <= 0.0 {
                        return Err(invalid("multipleOf", &at, "expected a number greater than 0"));
                    }
                    keywords.push(Keyword::MultipleOf(divisor));
                }
                "maximum" => {
                    keywords.push(Keyword::Maximum(number_value("maximum", value, &at)?))
                }
                "exclusiveMaximum" => keywords.push(Keyword::ExclusiveMaximum(number_value(
                    "exclusiveMaximum",
                    value,
                    &at,
                )?)),
                "minimum" => {
                    keywords.push(Keyword::Minimum(number_value("minimum", value, &at)?))
                }
                "exclusiveMinimum" => keywords.push(Keyword::ExclusiveMinimum(number_value(
                    "exclusiveMinimum",
                    value,
                    &at,
                )?)),
                "maxLength" => {
                    keywords.push(Keyword::MaxLength(count_value("maxLength", value, &at)?))
                }
                "minLength" => {
                    keywords.push(Keyword::MinLength(count_value("minLength", value, &at)?))
                }
                "pattern" => keywords.push(Keyword::Pattern(parse_pattern(value, &at)?)),
                "maxItems" => {
                    keywords.push(Keyword::MaxItems(count_value("maxItems", value, &at)?))
                }
                "minItems" => {
                    keywords.push(Keyword::MinItems(count_value("minItems", value, &at)?))
                }
                "uniqueItems" => {
                    let Some(unique) = value.as_bool() else {
                        return Err(invalid("uniqueItems", &at, "expected a boolean"));
                    };
                    keywords.push(Keyword::UniqueItems(unique));
                }
                "items" => keywords.push(self.parse_items(value, map, pointer, &at)?),
                // only meaningful next to an array-form `items`, where
                // parse_items consumes it
                "additionalItems" => {}
                "maxProperties" => keywords.push(Keyword::MaxProperties(count_value(
                    "maxProperties",
                    value,
                    &at,
                )?)),
                "minProperties" => keywords.push(Keyword::MinProperties(count_value(
                    "minProperties",
                    value,
                    &at,
                )?)),
                "required" => {
                    let Some(values) = value.as_array() else {
                        return Err(invalid("required", &at, "expected an array of strings"));
                    };
                    let mut names = Vec::with_capacity(values.len());
                    for v in values {
                        let Some(name) = v.as_str() else {
                            return Err(invalid("required", &at, "expected an array of strings"));
                        };
                        names.push(name.to_string());
                    }
                    keywords.push(Keyword::Required(names));
                }
                "properties" | "patternProperties" | "additionalProperties" => {
                    if !properties_done {
                        keywords.push(self.parse_properties(map, pointer)?);
                        properties_done = true;
                    }
                }
                "allOf" | "anyOf" | "oneOf" => {
                    let ids = self.parse_branches(key, value, &at)?;
                    keywords.push(match key.as_str() {
                        "allOf" => Keyword::AllOf(ids),
                        "anyOf" => Keyword::AnyOf(ids),
                        _ => Keyword::OneOf(ids),
                    });
                }
                "not" => {
                    let id = self.parse(value, &at)?;
                    keywords.push(Keyword::Not(id));
                }
                "$ref" => {
                    let Some(uri) = value.as_str() else {
                        return Err(invalid("$ref", &at, "expected a string"));
                    };
                    keywords.push(Keyword::Ref {
                        uri: uri.to_string(),
                        target: UNRESOLVED,
                    });
                }
                "$defs" | "definitions" => {
                    let Some(defs) = value.as_object() else {
                        return Err(invalid(
                            if key == "$defs" { "$defs" } else { "definitions" },
                            &at,
                            "expected an object",
                        ));
                    };
                    for (name, def) in defs {
                        let def_at = format!("{}/{}", at, escape(name));
                        self.parse(def, &def_at)?;
                    }
                }
                // anything else is an annotation
                _ => {}
            }
        }

        Ok(keywords)
    }

    fn parse_items(
        &mut self,
        value: &Value,
        map: &Map<String, Value>,
        pointer: &str,
        at: &str,
    ) -> Result<Keyword, SchemaError> {
        match value {
            Value::Array(schemas) => {
                let mut prefix = Vec::with_capacity(schemas.len());
                for (i, schema) in schemas.iter().enumerate() {
                    prefix.push(self.parse(schema, &format!("{}/{}", at, i))?);
                }
                let rest = match map.get("additionalItems") {
                    Some(extra) => {
                        Some(self.parse(extra, &format!("{}/additionalItems", pointer))?)
                    }
                    None => None,
                };
                Ok(Keyword::Items(ItemsKind::Tuple { prefix, rest }))
            }
            Value::Object(_) | Value::Bool(_) => {
                Ok(Keyword::Items(ItemsKind::Uniform(self.parse(value, at)?)))
            }
            other => Err(invalid(
                "items",
                at,
                &format!("expected a schema or array of schemas, got {}", json_type_name(other)),
            )),
        }
    }

    fn parse_properties(
        &mut self,
        map: &Map<String, Value>,
        pointer: &str,
    ) -> Result<Keyword, SchemaError> {
        let mut named = Vec::new();
        if let Some(value) = map.get("properties") {
            let at = format!("{}/properties", pointer);
            let Some(props) = value.as_object() else {
                return Err(invalid("properties", &at, "expected an object"));
            };
            for (name, schema) in props {
                let id = self.parse(schema, &format!("{}/{}", at, escape(name)))?;
                named.push((name.clone(), id));
            }
        }

        let mut patterns = Vec::new();
        if let Some(value) = map.get("patternProperties") {
            let at = format!("{}/patternProperties", pointer);
            let Some(props) = value.as_object() else {
                return Err(invalid("patternProperties", &at, "expected an object"));
            };
            for (source, schema) in props {
                let entry_at = format!("{}/{}", at, escape(source));
                let pattern = compile_pattern(source, &entry_at)?;
                let id = self.parse(schema, &entry_at)?;
                patterns.push(PatternProperty {
                    pattern,
                    schema: id,
                });
            }
        }

        let additional = match map.get("additionalProperties") {
            Some(value) => {
                let at = format!("{}/additionalProperties", pointer);
                Some(self.parse(value, &at)?)
            }
            None => None,
        };

        Ok(Keyword::Properties {
            named,
            patterns,
            additional,
        })
    }

    fn parse_branches(
        &mut self,
        keyword: &str,
        value: &Value,
        at: &str,
    ) -> Result<Vec<SchemaId>, SchemaError> {
        let name = match keyword {
            "allOf" => "allOf",
            "anyOf" => "anyOf",
            _ => "oneOf",
        };
        let Some(branches) = value.as_array() else {
            return Err(invalid(name, at, "expected a non-empty array of schemas"));
        };
        if branches.is_empty() {
            return Err(invalid(name, at, "expected a non-empty array of schemas"));
        }
        let mut ids = Vec::with_capacity(branches.len());
        for (i, branch) in branches.iter().enumerate() {
            ids.push(self.parse(branch, &format!("{}/{}", at, i))?);
        }
        Ok(ids)
    }

    fn link(&mut self) -> Result<(), SchemaError> {
        let Compiler {
            nodes,
            pointers,
            locations,
        } = self;
        for (i, node) in nodes.iter_mut().enumerate() {
            if let SchemaNode::Keywords(keywords) = node {
                for keyword in keywords.iter_mut() {
                    if let Keyword::Ref { uri, target } = keyword {
                        let key = if uri.is_empty() { "#" } else { uri.as_str() };
                        let resolved = pointers.get(key).copied().ok_or_else(|| {
                            SchemaError::UnresolvedRef {
                                uri: uri.clone(),
                                pointer: locations[i].clone(),
                            }
                        })?;
                        *target = resolved;
                    }
                }
            }
        }
        self.check_cycles()?;
        self.check_negations()
    }

    /// Reject nodes that reach themselves purely through in-place edges
    /// (`allOf`/`anyOf`/`oneOf`/`not`/`$ref`): evaluator construction for
    /// such a node would recurse without consuming any input. Cycles that
    /// pass through `properties` or `items` descend the instance and are
    /// fine.
    fn check_cycles(&self) -> Result<(), SchemaError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            White,
            Gray,
            Black,
        }

        fn visit(
            compiler: &Compiler,
            id: usize,
            marks: &mut [Mark],
        ) -> Result<(), SchemaError> {
            match marks[id] {
                Mark::Gray => {
                    return Err(SchemaError::CircularReference {
                        pointer: compiler.locations[id].clone(),
                    })
                }
                Mark::Black => return Ok(()),
                Mark::White => {}
            }
            marks[id] = Mark::Gray;
            if let SchemaNode::Keywords(keywords) = &compiler.nodes[id] {
                for keyword in keywords {
                    for edge in keyword.in_place_edges() {
                        visit(compiler, edge.0 as usize, marks)?;
                    }
                }
            }
            marks[id] = Mark::Black;
            Ok(())
        }

        let mut marks = vec![Mark::White; self.nodes.len()];
        for id in 0..self.nodes.len() {
            visit(self, id, &mut marks)?;
        }
        Ok(())
    }

    /// The negatable capability check for every `not` target. Under the
    /// uniform invert-wrapper every compiled keyword is negatable, so this
    /// is the seam where a future exception would surface at compile time
    /// instead of during a run.
    fn check_negations(&self) -> Result<(), SchemaError> {
        for node in &self.nodes {
            let SchemaNode::Keywords(keywords) = node else {
                continue;
            };
            for keyword in keywords {
                let Keyword::Not(target) = keyword else {
                    continue;
                };
                if let SchemaNode::Keywords(inner) = self.node_at(*target) {
                    for kw in inner {
                        if !kw.capabilities().negatable {
                            return Err(SchemaError::UnsupportedNegation {
                                keyword: kw.name(),
                                pointer: self.locations[target.0 as usize].clone(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn node_at(&self, id: SchemaId) -> &SchemaNode {
        &self.nodes[id.0 as usize]
    }
}

fn invalid(keyword: &'static str, at: &str, message: &str) -> SchemaError {
    SchemaError::InvalidKeyword {
        keyword,
        pointer: at.to_string(),
        message: message.to_string(),
    }
}

fn number_value(keyword: &'static str, value: &Value, at: &str) -> Result<f64, SchemaError> {
    value
        .as_f64()
        .ok_or_else(|| invalid(keyword, at, "expected a number"))
}

fn count_value(keyword: &'static str, value: &Value, at: &str) -> Result<u64, SchemaError> {
    value
        .as_u64()
        .ok_or_else(|| invalid(keyword, at, "expected a non-negative integer"))
}

fn parse_pattern(value: &Value, at: &str) -> Result<PatternSpec, SchemaError> {
    let Some(source) = value.as_str() else {
        return Err(invalid("pattern", at, "expected a string"));
    };
    compile_pattern(source, at)
}

fn compile_pattern(source: &str, at: &str) -> Result<PatternSpec, SchemaError> {
    let regex = regex::Regex::new(source).map_err(|source| SchemaError::InvalidPattern {
        pointer: at.to_string(),
        source: Box::new(source),
    })?;
    Ok(PatternSpec {
        source: source.to_string(),
        regex,
    })
}

fn parse_type(value: &Value, at: &str) -> Result<TypeSet, SchemaError> {
    match value {
        Value::String(name) => Ok(TypeSet::single(type_name(name, at)?)),
        Value::Array(names) => {
            let mut types = Vec::with_capacity(names.len());
            for name in names {
                let Some(name) = name.as_str() else {
                    return Err(invalid("type", at, "expected a string or array of strings"));
                };
                types.push(type_name(name, at)?);
            }
            Ok(TypeSet::of(types))
        }
        _ => Err(invalid("type", at, "expected a string or array of strings")),
    }
}

fn type_name(name: &str, at: &str) -> Result<InstanceType, SchemaError> {
    InstanceType::parse(name).ok_or_else(|| SchemaError::UnknownType {
        name: name.to_string(),
        pointer: at.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn root_gets_id_zero() {
        let schema = compile(&json!({"type": "string"})).unwrap();
        assert_eq!(schema.root, SchemaId::ROOT);
    }

    #[test]
    fn boolean_schemas_compile() {
        assert!(compile(&json!(true)).is_ok());
        assert!(compile(&json!(false)).is_ok());
    }

    #[test]
    fn non_schema_document_rejected() {
        let err = compile(&json!(["not", "a", "schema"])).unwrap_err();
        assert!(matches!(err, SchemaError::NotASchema { .. }));
    }

    #[test]
    fn unknown_type_name_rejected() {
        let err = compile(&json!({"type": "int"})).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType { name, .. } if name == "int"));
    }

    #[test]
    fn multiple_of_must_be_positive() {
        let err = compile(&json!({"multipleOf": 0})).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::InvalidKeyword { keyword: "multipleOf", .. }
        ));
    }

    #[test]
    fn max_items_must_be_integer() {
        let err = compile(&json!({"maxItems": 2.5})).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::InvalidKeyword { keyword: "maxItems", .. }
        ));
    }

    #[test]
    fn invalid_pattern_rejected() {
        let err = compile(&json!({"pattern": "("})).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPattern { .. }));
    }

    #[test]
    fn empty_one_of_rejected() {
        let err = compile(&json!({"oneOf": []})).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::InvalidKeyword { keyword: "oneOf", .. }
        ));
    }

    #[test]
    fn refs_resolve_against_defs() {
        let schema = compile(&json!({
            "$defs": {
                "positive": { "type": "number", "exclusiveMinimum": 0 }
            },
            "$ref": "#/$defs/positive"
        }))
        .unwrap();
        assert!(schema.store.pointers.contains_key("#/$defs/positive"));
    }

    #[test]
    fn unresolved_ref_rejected() {
        let err = compile(&json!({"$ref": "#/$defs/missing"})).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnresolvedRef { uri, .. } if uri == "#/$defs/missing"
        ));
    }

    #[test]
    fn external_ref_rejected() {
        let err = compile(&json!({"$ref": "https://example.com/schema.json"})).unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedRef { .. }));
    }

    #[test]
    fn structural_self_reference_is_fine() {
        // a classic recursive schema: nodes with child nodes
        let schema = compile(&json!({
            "type": "object",
            "properties": {
                "children": {
                    "type": "array",
                    "items": { "$ref": "#" }
                }
            }
        }));
        assert!(schema.is_ok());
    }

    #[test]
    fn in_place_cycle_rejected() {
        let err = compile(&json!({
            "allOf": [ { "$ref": "#" } ]
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::CircularReference { .. }));
    }

    #[test]
    fn mutual_in_place_cycle_rejected() {
        let err = compile(&json!({
            "$defs": {
                "a": { "not": { "$ref": "#/$defs/b" } },
                "b": { "anyOf": [ { "$ref": "#/$defs/a" } ] }
            },
            "$ref": "#/$defs/a"
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::CircularReference { .. }));
    }

    #[test]
    fn escaped_pointer_tokens_resolve() {
        let schema = compile(&json!({
            "properties": {
                "a/b": { "type": "string" }
            },
            "$ref": "#/properties/a~1b"
        }));
        assert!(schema.is_ok());
    }

    #[test]
    fn negation_capability_check_passes_for_all_keywords() {
        let schema = compile(&json!({
            "not": { "multipleOf": 3, "maxItems": 2, "pattern": "^a" }
        }));
        assert!(schema.is_ok());
    }
}
