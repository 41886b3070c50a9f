//! Interchange serialization helpers.
//!
//! Serde provides the encoding; these helpers centralize error mapping and
//! keep output formatting stable.

use serde::Serialize;

use crate::error::{MarkupError, MarkupResult};
use crate::graph::Graph;
use crate::ir::records::GraphRecord;

/// Serialize any interchange value to pretty JSON.
pub fn to_json_pretty<T: Serialize>(value: &T) -> MarkupResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| MarkupError::serialization(format!("serialize: {e}")))
}

/// Deserialize a graph record from JSON.
///
/// Callers should then invoke `record.validate()` before building.
pub fn record_from_json(s: &str) -> MarkupResult<GraphRecord> {
    serde_json::from_str::<GraphRecord>(s)
        .map_err(|e| MarkupError::serialization(format!("deserialize graph record: {e}")))
}

/// Deserialize, validate and assemble a graph in one step.
///
/// # Examples
///
/// ```
/// let graph = clipmark::ir::graph_from_json(r#"{
///     "containers": [
///         {"name": "doc", "content": [{"kind": "range", "origin": "t", "start": 0, "length": 4}]}
///     ]
/// }"#).unwrap();
/// assert_eq!(graph.container_count(), 1);
/// ```
pub fn graph_from_json(s: &str) -> MarkupResult<Graph> {
    record_from_json(s)?.into_graph()
}
