//! The schema graph: an arena of nodes addressed by stable ids.
//!
//! Schemas may be cyclic through `$ref`, so nodes are never owned by one
//! another; subschemas hold a [`SchemaId`] into the arena and evaluator
//! construction looks nodes up as the instance descends. The compiled
//! store is immutable, so one [`Schema`] can validate many instances
//! concurrently — each run builds its own private evaluator tree.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::combinator::Conjunction;
use crate::error::StreamError;
use crate::eval::{run, AlwaysSatisfied, BoxedEvaluator, FalseSchema};
use crate::keyword::Keyword;
use crate::stream::{TokenSource, ValueSource};
use crate::types::InstanceType;
use crate::validator::ValidationReport;

/// Stable identity of one schema node within its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SchemaId(pub(crate) u32);

impl SchemaId {
    /// The root node of a compiled schema.
    pub const ROOT: SchemaId = SchemaId(0);
}

/// One node: a boolean literal or an ordered keyword collection.
#[derive(Debug, Clone)]
pub(crate) enum SchemaNode {
    Boolean(bool),
    Keywords(Vec<Keyword>),
}

/// The arena owning every node of a compiled schema, plus the JSON-Pointer
/// index used to resolve `$ref` targets.
#[derive(Debug)]
pub(crate) struct SchemaStore {
    pub(crate) nodes: Vec<SchemaNode>,
    pub(crate) pointers: HashMap<String, SchemaId>,
}

impl SchemaStore {
    pub(crate) fn node(&self, id: SchemaId) -> &SchemaNode {
        &self.nodes[id.0 as usize]
    }

    /// Whether the node is the `false` schema.
    pub(crate) fn is_false(&self, id: SchemaId) -> bool {
        matches!(self.node(id), SchemaNode::Boolean(false))
    }

    /// Assemble the evaluator for one node and one instance type: the
    /// conjunction of the evaluators of every applicable keyword.
    pub(crate) fn evaluator_for<'s>(
        &'s self,
        id: SchemaId,
        ty: InstanceType,
    ) -> BoxedEvaluator<'s> {
        match self.node(id) {
            SchemaNode::Boolean(true) => Box::new(AlwaysSatisfied),
            SchemaNode::Boolean(false) => Box::new(FalseSchema { schema: id }),
            SchemaNode::Keywords(keywords) => {
                let mut children: Vec<BoxedEvaluator<'s>> = keywords
                    .iter()
                    .filter(|kw| kw.capabilities().evaluates)
                    .filter_map(|kw| kw.create_evaluator(ty, self, id))
                    .collect();
                match children.len() {
                    0 => Box::new(AlwaysSatisfied),
                    1 => children.remove(0),
                    _ => Box::new(Conjunction::new(children)),
                }
            }
        }
    }
}

/// A compiled, immutable schema ready to validate instances.
///
/// Built by [`compile`](crate::compile); cheap to share across threads.
#[derive(Debug)]
pub struct Schema {
    pub(crate) store: SchemaStore,
    pub(crate) root: SchemaId,
}

impl Schema {
    /// Validate a parsed value by streaming its events through the engine.
    pub fn validate(&self, instance: &Value) -> Result<ValidationReport, StreamError> {
        let mut source = ValueSource::new(instance);
        self.validate_stream(&mut source)
    }

    /// Look up a schema node by the JSON Pointer it was compiled from
    /// (`"#"`, `"#/$defs/name"`, `"#/properties/id"`, ...). This is the
    /// same index `$ref` resolution uses.
    pub fn node_id(&self, pointer: &str) -> Option<SchemaId> {
        self.store.pointers.get(pointer).copied()
    }

    /// Validate events pulled from an arbitrary token source.
    ///
    /// The source is drained even after the verdict is known, so nesting is
    /// verified across the whole document.
    pub fn validate_stream(
        &self,
        source: &mut dyn TokenSource,
    ) -> Result<ValidationReport, StreamError> {
        run(&self.store, self.root, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Schema>();
    }

    #[test]
    fn node_id_resolves_compiled_pointers() {
        let schema = crate::compile::compile(&json!({
            "$defs": { "name": { "type": "string" } }
        }))
        .unwrap();
        assert_eq!(schema.node_id("#"), Some(SchemaId::ROOT));
        assert!(schema.node_id("#/$defs/name").is_some());
        assert_eq!(schema.node_id("#/$defs/missing"), None);
    }
}
