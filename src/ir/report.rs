//! Resolution reports: the resolved attributes of a graph's objects in a
//! serializable form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cascade::{AttributeMap, CascadeResolver, ObjectKey};
use crate::graph::ContainerId;
use crate::pointer::Pointer;

/// One resolved object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub key: ObjectKey,
    /// Name of the container the object is, or belongs to.
    pub container: String,
    /// The unit's clip, or a pointer to the container or relation.
    pub pointer: Pointer,
    pub definitive: AttributeMap,
    #[serde(default, skip_serializing_if = "AttributeMap::is_empty")]
    pub heritable: AttributeMap,
}

/// Resolved attributes for a set of containers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionReport {
    /// Report format version.
    pub version: u32,

    /// Unique identifier for this report.
    pub report_id: Uuid,

    /// When the report was produced.
    pub generated_at: DateTime<Utc>,

    /// Hex fingerprint of the graph the report was computed from.
    pub graph_fingerprint: String,

    /// Objects in resolution order: each container's units, the container,
    /// then its relations.
    pub objects: Vec<ObjectRecord>,
}

impl ResolutionReport {
    /// Current report format version.
    pub const CURRENT_VERSION: u32 = 1;

    /// Resolves and records the given containers.
    #[must_use]
    pub fn collect(resolver: &mut CascadeResolver<'_>, containers: &[ContainerId]) -> Self {
        let mut objects = Vec::new();
        for &container in containers {
            let mut keys = resolver.resolve_container(container);
            keys.extend(resolver.resolve_relations(container));
            objects.extend(keys.into_iter().filter_map(|key| describe(resolver, key)));
        }
        Self {
            version: Self::CURRENT_VERSION,
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            graph_fingerprint: resolver.graph().fingerprint().to_hex(),
            objects,
        }
    }

    /// Resolves and records every container of the resolver's graph.
    #[must_use]
    pub fn for_graph(resolver: &mut CascadeResolver<'_>) -> Self {
        let containers: Vec<ContainerId> = resolver.graph().container_ids().collect();
        Self::collect(resolver, &containers)
    }

    /// Finds the first object whose pointer equals `pointer`.
    #[must_use]
    pub fn object(&self, pointer: &Pointer) -> Option<&ObjectRecord> {
        self.objects.iter().find(|o| &o.pointer == pointer)
    }

    /// Records of one container, in resolution order.
    pub fn objects_in<'a>(&'a self, container: &'a str) -> impl Iterator<Item = &'a ObjectRecord> + 'a {
        self.objects.iter().filter(move |o| o.container == container)
    }
}

/// Builds the record for one object; `None` when the key names nothing in
/// the resolver's graph.
pub fn describe(resolver: &mut CascadeResolver<'_>, key: ObjectKey) -> Option<ObjectRecord> {
    let graph = resolver.graph();
    let (container, pointer) = match key {
        ObjectKey::Unit { container, index } => {
            let name = graph.get_container(container)?.name.clone();
            let clip = resolver.units(container).get(index as usize)?.clip.clone();
            (name, clip)
        }
        ObjectKey::Container(container) => {
            let name = graph.get_container(container)?.name.clone();
            let pointer = Pointer::container(name.clone());
            (name, pointer)
        }
        ObjectKey::Relation(relation) => {
            let node = graph.get_relation(relation)?;
            (graph.container(node.owner).name.clone(), Pointer::relation(node.relation.name.clone()))
        }
    };
    let details = resolver.resolve(key);
    Some(ObjectRecord {
        key,
        container,
        pointer,
        definitive: details.definitive().clone(),
        heritable: details.heritable().clone(),
    })
}
