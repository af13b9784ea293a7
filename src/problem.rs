//! Validation problems: one record per detected violation.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::schema::SchemaId;

/// A single validation violation.
///
/// The `keyword` field is the stable message key (the schema keyword that
/// failed); `params` is an ordered name → value map with the concrete data
/// needed to render a message; `pointer` is the RFC 6901 location of the
/// offending value within the instance. Rendering prose from these fields
/// is presentation-layer work — the [`std::fmt::Display`] impl here is the
/// built-in renderer the CLI uses.
#[derive(Debug, Clone, Serialize)]
pub struct Problem {
    /// Stable message key: the keyword that was violated.
    pub keyword: &'static str,
    /// JSON Pointer (RFC 6901) to the offending value.
    pub pointer: String,
    /// Ordered parameters for message rendering.
    pub params: Map<String, Value>,
    /// The schema node whose keyword produced this problem.
    pub schema: SchemaId,
}

impl Problem {
    /// Start a problem for `keyword`, located at `pointer`, contributed by
    /// schema node `schema`.
    pub fn new(keyword: &'static str, pointer: String, schema: SchemaId) -> Self {
        Problem {
            keyword,
            pointer,
            params: Map::new(),
            schema,
        }
    }

    /// Attach a named parameter. Insertion order is preserved.
    pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    fn p(&self, name: &str) -> String {
        match self.params.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let location = if self.pointer.is_empty() {
            "/"
        } else {
            &self.pointer
        };
        let message = match self.keyword {
            "type" => format!(
                "expected {}, got {}",
                self.p("expected"),
                self.p("actual")
            ),
            "enum" => format!("value {} is not one of {}", self.p("actual"), self.p("expected")),
            "const" => format!("value {} is not the constant {}", self.p("actual"), self.p("expected")),
            "multipleOf" => format!(
                "{} is not a multiple of {}",
                self.p("actual"),
                self.p("divisor")
            ),
            "maximum" => format!("{} exceeds the maximum {}", self.p("actual"), self.p("bound")),
            "exclusiveMaximum" => format!(
                "{} is not below the exclusive maximum {}",
                self.p("actual"),
                self.p("bound")
            ),
            "minimum" => format!("{} is below the minimum {}", self.p("actual"), self.p("bound")),
            "exclusiveMinimum" => format!(
                "{} is not above the exclusive minimum {}",
                self.p("actual"),
                self.p("bound")
            ),
            "maxLength" => format!(
                "string has {} characters, more than {}",
                self.p("actual"),
                self.p("bound")
            ),
            "minLength" => format!(
                "string has {} characters, fewer than {}",
                self.p("actual"),
                self.p("bound")
            ),
            "pattern" => format!(
                "string does not match pattern {}",
                self.p("pattern")
            ),
            "maxItems" => format!(
                "array has {} items, more than {}",
                self.p("actual"),
                self.p("bound")
            ),
            "minItems" => format!(
                "array has {} items, fewer than {}",
                self.p("actual"),
                self.p("bound")
            ),
            "uniqueItems" => format!(
                "item {} duplicates item {}",
                self.p("index"),
                self.p("lastIndex")
            ),
            "additionalItems" => format!("unexpected item at index {}", self.p("index")),
            "maxProperties" => format!(
                "object has {} properties, more than {}",
                self.p("actual"),
                self.p("bound")
            ),
            "minProperties" => format!(
                "object has {} properties, fewer than {}",
                self.p("actual"),
                self.p("bound")
            ),
            "required" => format!("missing required properties: {}", self.p("missing")),
            "additionalProperties" => {
                format!("unexpected property \"{}\"", self.p("name"))
            }
            "anyOf" => "value matches none of the alternatives".to_string(),
            "oneOf" => {
                if self.params.contains_key("matched") {
                    format!(
                        "value matches more than one alternative: branches {}",
                        self.p("matched")
                    )
                } else {
                    "value matches none of the alternatives".to_string()
                }
            }
            "not" => "value matches the negated schema".to_string(),
            "schema" => "value is disallowed by a false schema".to_string(),
            other => other.to_string(),
        };
        write!(f, "{}: {}", location, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_preserve_insertion_order() {
        let problem = Problem::new("maxItems", "/tags".into(), SchemaId::ROOT)
            .param("actual", 4)
            .param("bound", 3);
        let names: Vec<&String> = problem.params.keys().collect();
        assert_eq!(names, vec!["actual", "bound"]);
    }

    #[test]
    fn display_renders_location_and_message() {
        let problem = Problem::new("maxItems", "/tags".into(), SchemaId::ROOT)
            .param("actual", 4)
            .param("bound", 3);
        assert_eq!(problem.to_string(), "/tags: array has 4 items, more than 3");
    }

    #[test]
    fn display_root_pointer() {
        let problem = Problem::new("type", String::new(), SchemaId::ROOT)
            .param("actual", "string")
            .param("expected", json!(["number"]));
        assert_eq!(problem.to_string(), "/: expected [\"number\"], got string");
    }

    #[test]
    fn serializes_with_ordered_params() {
        let problem = Problem::new("multipleOf", "/n".into(), SchemaId::ROOT)
            .param("actual", 5)
            .param("divisor", 2);
        let out = serde_json::to_value(&problem).unwrap();
        assert_eq!(out["keyword"], "multipleOf");
        assert_eq!(out["pointer"], "/n");
        assert_eq!(out["params"]["actual"], 5);
        assert_eq!(out["params"]["divisor"], 2);
    }
}
