//! Interchange records for whole graphs.

use serde::{Deserialize, Serialize};

use crate::container::Container;
use crate::error::MarkupResult;
use crate::graph::Graph;

/// A serializable graph: containers plus the optional defaults container.
///
/// Every record carries a format version so that readers can reject
/// documents written by an incompatible producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    /// Interchange format version.
    #[serde(default = "GraphRecord::current_version")]
    pub version: u32,

    /// Synthetic root whose relations are in scope everywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<Container>,

    /// Every container, in declaration order.
    #[serde(default)]
    pub containers: Vec<Container>,
}

impl GraphRecord {
    /// Current interchange format version.
    pub const CURRENT_VERSION: u32 = 1;

    const fn current_version() -> u32 {
        Self::CURRENT_VERSION
    }

    #[must_use]
    pub fn new(containers: Vec<Container>) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            defaults: None,
            containers,
        }
    }

    #[must_use]
    pub fn with_defaults(mut self, defaults: Container) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Validates the record and assembles it into a graph.
    pub fn into_graph(self) -> MarkupResult<Graph> {
        self.validate()?;
        let mut builder = Graph::builder().containers(self.containers);
        if let Some(defaults) = self.defaults {
            builder = builder.defaults(defaults);
        }
        builder.build()
    }
}
