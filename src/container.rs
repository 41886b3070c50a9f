//! Containers: ordered content plus the relations annotating it.

use serde::{Deserialize, Serialize};

use crate::pointer::Pointer;
use crate::relation::Relation;

/// A named, nestable unit of content.
///
/// A nested container appears in its parent's content list as a
/// [`Pointer::Container`] clip.
///
/// # Examples
///
/// ```
/// use clipmark::{Container, Pointer, Relation};
///
/// let doc = Container::new("doc")
///     .with_type(Pointer::literal("article"))
///     .with_clip(Pointer::range("text", 0, 10))
///     .with_relation(
///         Relation::new("r", Pointer::literal("markup"))
///             .with_end("target", vec![Pointer::range("text", 0, 10)])
///             .endow_content("lang", "en"),
///     );
/// assert_eq!(doc.content.len(), 1);
/// assert_eq!(doc.annotations.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    #[serde(default)]
    pub content: Vec<Pointer>,
    #[serde(default)]
    pub annotations: Vec<Relation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub container_type: Option<Pointer>,
}

impl Container {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: Vec::new(),
            annotations: Vec::new(),
            parent: None,
            container_type: None,
        }
    }

    #[must_use]
    pub fn with_clip(mut self, clip: Pointer) -> Self {
        self.content.push(clip);
        self
    }

    #[must_use]
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.annotations.push(relation);
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    #[must_use]
    pub fn with_type(mut self, container_type: Pointer) -> Self {
        self.container_type = Some(container_type);
        self
    }
}
