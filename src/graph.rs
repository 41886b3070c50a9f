//! The assembled container graph.
//!
//! Containers and relations live in flat arenas addressed by dense ids.
//! Relations keep a back-reference to the container that owns them, and
//! containers keep their resolved parent. Cyclic parent chains are legal;
//! every walk over them is bounded and visited-set guarded.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::container::Container;
use crate::error::{MarkupError, MarkupResult, ValidationError};
use crate::pointer::Pointer;
use crate::relation::Relation;

/// Dense identifier of a container within one [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(u32);

impl ContainerId {
    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Dense identifier of a relation within one [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationId(u32);

impl RelationId {
    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// A container as stored in the graph.
#[derive(Debug, Clone)]
pub struct ContainerNode {
    pub name: String,
    pub content: Vec<Pointer>,
    pub relations: Vec<RelationId>,
    pub parent: Option<ContainerId>,
    pub container_type: Option<Pointer>,
}

/// A relation as stored in the graph.
#[derive(Debug, Clone)]
pub struct RelationNode {
    pub relation: Relation,
    pub owner: ContainerId,
}

/// Stable blake3 digest of a graph's canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphFingerprint([u8; 32]);

impl GraphFingerprint {
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl fmt::Display for GraphFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

const FINGERPRINT_DOMAIN: &[u8] = b"clipmark.graph.v1";

/// A fully assembled, immutable graph of containers and relations.
#[derive(Debug, Clone)]
pub struct Graph {
    containers: Vec<ContainerNode>,
    relations: Vec<RelationNode>,
    containers_by_name: HashMap<String, ContainerId>,
    relations_by_name: HashMap<String, RelationId>,
    defaults: Option<ContainerId>,
    fingerprint: GraphFingerprint,
}

impl Graph {
    /// Starts assembling a graph.
    #[must_use]
    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }

    /// Returns the container for an id issued by this graph.
    #[must_use]
    pub fn container(&self, id: ContainerId) -> &ContainerNode {
        &self.containers[id.index()]
    }

    /// Returns the relation for an id issued by this graph.
    #[must_use]
    pub fn relation(&self, id: RelationId) -> &RelationNode {
        &self.relations[id.index()]
    }

    pub fn get_container(&self, id: ContainerId) -> Option<&ContainerNode> {
        self.containers.get(id.index())
    }

    pub fn get_relation(&self, id: RelationId) -> Option<&RelationNode> {
        self.relations.get(id.index())
    }

    #[must_use]
    pub fn container_id(&self, name: &str) -> Option<ContainerId> {
        self.containers_by_name.get(name).copied()
    }

    #[must_use]
    pub fn relation_id(&self, name: &str) -> Option<RelationId> {
        self.relations_by_name.get(name).copied()
    }

    pub fn container_ids(&self) -> impl Iterator<Item = ContainerId> + '_ {
        (0..self.containers.len()).map(|i| ContainerId(i as u32))
    }

    pub fn relation_ids(&self) -> impl Iterator<Item = RelationId> + '_ {
        (0..self.relations.len()).map(|i| RelationId(i as u32))
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    /// The synthetic defaults container, if one was supplied.
    #[must_use]
    pub const fn defaults(&self) -> Option<ContainerId> {
        self.defaults
    }

    /// True when the relation lives in the defaults container.
    #[must_use]
    pub fn is_default_relation(&self, id: RelationId) -> bool {
        self.defaults == Some(self.relation(id).owner)
    }

    #[must_use]
    pub const fn fingerprint(&self) -> GraphFingerprint {
        self.fingerprint
    }

    /// Returns `id` followed by its ancestors, nearest first.
    ///
    /// Stops at the first repeated container or after `max_depth` hops.
    #[must_use]
    pub fn lineage(&self, id: ContainerId, max_depth: usize) -> Vec<ContainerId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            if out.len() > max_depth || !seen.insert(c) {
                break;
            }
            out.push(c);
            current = self.container(c).parent;
        }
        out
    }

    /// Resolves a pointer to the concrete targets it denotes.
    ///
    /// A relation pointer naming an end yields that end's targets (or the one
    /// at `index`), dereferenced recursively up to `max_depth` levels. Every
    /// other pointer denotes itself. Absent relations or ends yield nothing.
    #[must_use]
    pub fn dereference(&self, pointer: &Pointer, max_depth: usize) -> Vec<Pointer> {
        let mut out = Vec::new();
        self.dereference_into(pointer, max_depth, &mut out);
        out
    }

    fn dereference_into(&self, pointer: &Pointer, depth: usize, out: &mut Vec<Pointer>) {
        let Pointer::Relation(rp) = pointer else {
            out.push(pointer.clone());
            return;
        };
        let Some(end_name) = &rp.end else {
            out.push(pointer.clone());
            return;
        };
        if depth == 0 {
            debug!(pointer = %pointer, "pointer dereference depth exhausted");
            return;
        }
        let Some(end) = self
            .relation_id(&rp.name)
            .and_then(|id| self.relation(id).relation.end(end_name))
        else {
            return;
        };
        match rp.index {
            Some(i) => {
                if let Some(target) = end.pointers.get(i) {
                    self.dereference_into(target, depth - 1, out);
                }
            }
            None => {
                for target in &end.pointers {
                    self.dereference_into(target, depth - 1, out);
                }
            }
        }
    }

    /// True when the pointer's target exists in this graph.
    ///
    /// Content pointers (ranges, regions) and literals always resolve.
    #[must_use]
    pub fn resolves(&self, pointer: &Pointer) -> bool {
        match pointer {
            Pointer::Container(c) => self.container_id(&c.name).is_some(),
            Pointer::Relation(rp) => {
                let Some(id) = self.relation_id(&rp.name) else {
                    return false;
                };
                match &rp.end {
                    None => true,
                    Some(end) => match self.relation(id).relation.end(end) {
                        None => false,
                        Some(e) => rp.index.map_or(true, |i| i < e.pointers.len()),
                    },
                }
            }
            Pointer::Range(_) | Pointer::Region(_) | Pointer::Literal(_) => true,
        }
    }
}

/// Assembles a [`Graph`] from container records.
///
/// # Examples
///
/// ```
/// use clipmark::{Container, Graph, Pointer};
///
/// let graph = Graph::builder()
///     .container(Container::new("doc").with_clip(Pointer::container("note")))
///     .container(Container::new("note").with_clip(Pointer::range("text", 0, 4)))
///     .build()
///     .unwrap();
///
/// let doc = graph.container_id("doc").unwrap();
/// let note = graph.container_id("note").unwrap();
/// assert_eq!(graph.container(note).parent, Some(doc));
/// ```
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    containers: Vec<Container>,
    defaults: Option<Container>,
}

impl GraphBuilder {
    #[must_use]
    pub fn container(mut self, container: Container) -> Self {
        self.containers.push(container);
        self
    }

    #[must_use]
    pub fn containers(mut self, containers: impl IntoIterator<Item = Container>) -> Self {
        self.containers.extend(containers);
        self
    }

    /// Sets the defaults container: its relations are in scope everywhere,
    /// and it becomes the parent of every otherwise parentless container.
    #[must_use]
    pub fn defaults(mut self, defaults: Container) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Builds the graph.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::DuplicateContainer` or
    /// `ValidationError::DuplicateRelation` when names collide.
    pub fn build(self) -> MarkupResult<Graph> {
        let fingerprint = fingerprint(self.defaults.as_ref(), &self.containers)?;

        let mut graph = Graph {
            containers: Vec::with_capacity(self.containers.len() + 1),
            relations: Vec::new(),
            containers_by_name: HashMap::new(),
            relations_by_name: HashMap::new(),
            defaults: None,
            fingerprint,
        };

        let mut declared_parents: Vec<Option<String>> = Vec::new();
        if let Some(defaults) = self.defaults {
            let id = graph.ingest(defaults, &mut declared_parents)?;
            graph.defaults = Some(id);
        }
        for container in self.containers {
            graph.ingest(container, &mut declared_parents)?;
        }

        graph.link_parents(&declared_parents);
        Ok(graph)
    }
}

impl Graph {
    fn ingest(
        &mut self,
        container: Container,
        declared_parents: &mut Vec<Option<String>>,
    ) -> Result<ContainerId, ValidationError> {
        if self.containers_by_name.contains_key(&container.name) {
            return Err(ValidationError::DuplicateContainer {
                name: container.name,
            });
        }
        let id = ContainerId(self.containers.len() as u32);

        let mut relations = Vec::with_capacity(container.annotations.len());
        for relation in container.annotations {
            if self.relations_by_name.contains_key(&relation.name) {
                return Err(ValidationError::DuplicateRelation {
                    name: relation.name,
                });
            }
            let rid = RelationId(self.relations.len() as u32);
            self.relations_by_name.insert(relation.name.clone(), rid);
            self.relations.push(RelationNode { relation, owner: id });
            relations.push(rid);
        }

        self.containers_by_name.insert(container.name.clone(), id);
        self.containers.push(ContainerNode {
            name: container.name,
            content: container.content,
            relations,
            parent: None,
            container_type: container.container_type,
        });
        declared_parents.push(container.parent);
        Ok(id)
    }

    fn link_parents(&mut self, declared_parents: &[Option<String>]) {
        for (idx, declared) in declared_parents.iter().enumerate() {
            let Some(name) = declared else { continue };
            match self.container_id(name) {
                Some(parent) => self.containers[idx].parent = Some(parent),
                None => debug!(
                    container = %self.containers[idx].name,
                    parent = %name,
                    "declared parent is absent from the graph"
                ),
            }
        }

        // Containers listed as clips of another adopt that container as parent.
        for idx in 0..self.containers.len() {
            let holder = ContainerId(idx as u32);
            let children: Vec<ContainerId> = self.containers[idx]
                .content
                .iter()
                .filter_map(Pointer::as_container_name)
                .filter_map(|name| self.container_id(name))
                .collect();
            for child in children {
                if child != holder
                    && Some(child) != self.defaults
                    && self.containers[child.index()].parent.is_none()
                {
                    self.containers[child.index()].parent = Some(holder);
                }
            }
        }

        let Some(defaults) = self.defaults else { return };
        for idx in 0..self.containers.len() {
            let id = ContainerId(idx as u32);
            if id == defaults || self.containers[idx].parent.is_some() {
                continue;
            }
            self.containers[idx].parent = Some(defaults);
            let clip = Pointer::container(self.containers[idx].name.clone());
            self.containers[defaults.index()].content.push(clip);
        }
    }
}

fn fingerprint(defaults: Option<&Container>, containers: &[Container]) -> MarkupResult<GraphFingerprint> {
    let canonical = serde_json::to_vec(&(defaults, containers))
        .map_err(|e| MarkupError::serialization(format!("canonicalize graph: {e}")))?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(FINGERPRINT_DOMAIN);
    hasher.update(&canonical);
    Ok(GraphFingerprint(*hasher.finalize().as_bytes()))
}
