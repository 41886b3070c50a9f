//! Relations: named, typed n-ary associations among ends.

use serde::{Deserialize, Serialize};

use crate::graph::RelationId;
use crate::pointer::Pointer;
use crate::value::Value;

/// A named slot of a relation holding an ordered list of targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct End {
    pub name: String,
    #[serde(default)]
    pub pointers: Vec<Pointer>,
}

impl End {
    #[must_use]
    pub fn new(name: impl Into<String>, pointers: Vec<Pointer>) -> Self {
        Self {
            name: name.into(),
            pointers,
        }
    }
}

/// How an endowed attribute behaves with respect to inheritance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndowmentKind {
    /// Applies to the matched object only; never inherited.
    Direct,
    /// Applies to the matched object and flows to the content it holds.
    Content,
}

/// One attribute a markup relation assigns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endowment {
    pub name: String,
    pub value: Value,
    pub kind: EndowmentKind,
}

/// A named, typed association.
///
/// The relation's type is itself a pointer: a literal name, or a pointer to
/// another relation, which lets types chain.
///
/// # Examples
///
/// ```
/// use clipmark::{Pointer, Relation};
///
/// let bold = Relation::new("bold-title", Pointer::literal("markup"))
///     .with_end("target", vec![Pointer::range("doc", 0, 5)])
///     .endow_direct("weight", "bold");
/// assert!(bold.is_markup());
/// assert_eq!(bold.end("target").map(|e| e.pointers.len()), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    #[serde(rename = "type")]
    pub relation_type: Pointer,
    #[serde(default)]
    pub ends: Vec<End>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endowments: Vec<Endowment>,
}

impl Relation {
    #[must_use]
    pub fn new(name: impl Into<String>, relation_type: Pointer) -> Self {
        Self {
            name: name.into(),
            relation_type,
            ends: Vec::new(),
            endowments: Vec::new(),
        }
    }

    /// Appends an end.
    #[must_use]
    pub fn with_end(mut self, name: impl Into<String>, pointers: Vec<Pointer>) -> Self {
        self.ends.push(End::new(name, pointers));
        self
    }

    /// Endows a direct attribute.
    #[must_use]
    pub fn endow_direct(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.endowments.push(Endowment {
            name: name.into(),
            value: value.into(),
            kind: EndowmentKind::Direct,
        });
        self
    }

    /// Endows a content (heritable) attribute.
    #[must_use]
    pub fn endow_content(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.endowments.push(Endowment {
            name: name.into(),
            value: value.into(),
            kind: EndowmentKind::Content,
        });
        self
    }

    /// Returns the first end with the given name.
    #[must_use]
    pub fn end(&self, name: &str) -> Option<&End> {
        self.ends.iter().find(|e| e.name == name)
    }

    pub fn is_markup(&self) -> bool {
        !self.endowments.is_empty()
    }
}

/// A reference from an object back to the relation end that targets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndRef {
    pub relation: RelationId,
    pub end: u32,
}

impl EndRef {
    #[must_use]
    pub const fn new(relation: RelationId, end: u32) -> Self {
        Self { relation, end }
    }
}
