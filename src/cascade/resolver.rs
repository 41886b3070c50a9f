//! The cascade resolver.
//!
//! Resolving an object gathers one candidate per endowed attribute of every
//! in-scope markup rule that matches it, plus the heritable attributes of its
//! inheritance sources, then ranks them. Objects are resolved on demand and
//! memoized; each object is registered before its sources are visited, so
//! cyclic inheritance terminates with the pending (empty) contribution.

use std::sync::Arc;

use tracing::{debug, instrument, trace};

use crate::cascade::cache::{ObjectKey, ResolutionCache};
use crate::cascade::details::{AttributeCandidate, AttributeMap, CandidateSource, MarkupDetails};
use crate::config::ResolverConfig;
use crate::graph::{ContainerId, Graph, RelationId};
use crate::partition::{collect_targets, partition_against, Unit};
use crate::pointer::Pointer;
use crate::relation::{EndRef, Endowment, EndowmentKind};
use crate::rules::{MatchTarget, MatchTier, RuleClassifier, SequenceIndex};
use crate::value::Value;

/// Resolves markup attributes over one graph.
///
/// A resolver owns its cache and is single-threaded; run independent
/// resolvers (see [`crate::runtime::ResolutionPool`]) for parallelism.
///
/// # Examples
///
/// ```
/// use clipmark::{CascadeResolver, Container, Graph, ObjectKey, Pointer, Relation, ResolverConfig, Value};
///
/// let graph = Graph::builder()
///     .container(
///         Container::new("doc")
///             .with_clip(Pointer::range("text", 0, 10))
///             .with_relation(
///                 Relation::new("bold", Pointer::literal("markup"))
///                     .with_end("target", vec![Pointer::range("text", 2, 3)])
///                     .endow_direct("weight", "bold"),
///             ),
///     )
///     .build()
///     .unwrap();
/// let config = ResolverConfig::default();
/// let mut resolver = CascadeResolver::new(&graph, &config);
///
/// let doc = graph.container_id("doc").unwrap();
/// let keys = resolver.resolve_container(doc);
/// assert_eq!(keys.len(), 4); // three units, then the container
/// assert_eq!(resolver.definitive(keys[1]).get("weight"), Some(&Value::from("bold")));
/// assert!(resolver.definitive(keys[0]).is_empty());
/// ```
#[derive(Debug)]
pub struct CascadeResolver<'g> {
    graph: &'g Graph,
    config: &'g ResolverConfig,
    classifier: RuleClassifier<'g>,
    sequences: SequenceIndex,
    cache: ResolutionCache,
    discovery: u64,
}

impl<'g> CascadeResolver<'g> {
    /// Classifies the graph's relations and discovers its sequences.
    #[must_use]
    pub fn new(graph: &'g Graph, config: &'g ResolverConfig) -> Self {
        let classifier = RuleClassifier::new(graph, config);
        let sequences = SequenceIndex::build(&classifier);
        debug!(
            containers = graph.container_count(),
            relations = graph.relation_count(),
            sequences = sequences.len(),
            "cascade resolver ready"
        );
        Self {
            graph,
            config,
            classifier,
            sequences,
            cache: ResolutionCache::new(),
            discovery: 0,
        }
    }

    #[must_use]
    pub const fn graph(&self) -> &'g Graph {
        self.graph
    }

    #[must_use]
    pub const fn classifier(&self) -> &RuleClassifier<'g> {
        &self.classifier
    }

    #[must_use]
    pub const fn sequences(&self) -> &SequenceIndex {
        &self.sequences
    }

    #[must_use]
    pub const fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// The container's partitioned content, computed once.
    ///
    /// Boundaries come from the ends of the container's own relations and
    /// the defaults' relations. The member ends of in-scope sequences are
    /// among them; sequences anchored elsewhere never cut this content.
    pub fn units(&mut self, container: ContainerId) -> Arc<[Unit]> {
        if let Some(units) = self.cache.units(container) {
            return units;
        }
        if self.graph.get_container(container).is_none() {
            return Arc::from(Vec::new());
        }

        let targets = self.scope_targets(container);
        let units = partition_against(self.graph, container, &targets);
        self.cache.store_units(container, units)
    }

    /// Every `(reference, target)` pair of the relations in scope for the
    /// container's units, collected once.
    fn scope_targets(&mut self, container: ContainerId) -> Arc<[(EndRef, Pointer)]> {
        if let Some(targets) = self.cache.targets(container) {
            return targets;
        }
        let relations = self.scope_relations(container);
        let targets = collect_targets(self.graph, &relations, self.config.max_pointer_depth);
        self.cache.store_targets(container, targets)
    }

    /// Resolves every unit of a container, then the container itself.
    ///
    /// Returns the keys in that order.
    #[instrument(skip(self), level = "debug")]
    pub fn resolve_container(&mut self, container: ContainerId) -> Vec<ObjectKey> {
        let units = self.units(container);
        let mut keys = Vec::with_capacity(units.len() + 1);
        for index in 0..units.len() {
            let key = ObjectKey::unit(container, index);
            self.ensure(key);
            keys.push(key);
        }
        let key = ObjectKey::Container(container);
        self.ensure(key);
        keys.push(key);
        trace!(objects = keys.len(), cached = self.cache.len(), "container resolved");
        keys
    }

    /// Resolves every relation annotating a container.
    pub fn resolve_relations(&mut self, container: ContainerId) -> Vec<ObjectKey> {
        let graph = self.graph;
        let Some(node) = graph.get_container(container) else {
            return Vec::new();
        };
        node.relations
            .iter()
            .map(|&relation| {
                let key = ObjectKey::Relation(relation);
                self.ensure(key);
                key
            })
            .collect()
    }

    /// Resolves one object (memoized) and returns its details.
    pub fn resolve(&mut self, key: ObjectKey) -> &MarkupDetails {
        self.ensure(key);
        self.cache.get_or_pending(key)
    }

    /// The object's winning value per attribute.
    pub fn definitive(&mut self, key: ObjectKey) -> AttributeMap {
        self.resolve(key).definitive().clone()
    }

    /// The object's content-kind values, as inherited by what it holds.
    pub fn heritable(&mut self, key: ObjectKey) -> AttributeMap {
        self.resolve(key).heritable().clone()
    }

    /// Relations in scope for a container's units and relations: its own,
    /// then the defaults'.
    fn scope_relations(&self, container: ContainerId) -> Vec<RelationId> {
        let mut relations = self
            .graph
            .get_container(container)
            .map(|node| node.relations.clone())
            .unwrap_or_default();
        if let Some(defaults) = self.graph.defaults().filter(|&d| d != container) {
            relations.extend(&self.graph.container(defaults).relations);
        }
        relations
    }

    fn rules_for(&self, key: ObjectKey) -> Vec<RelationId> {
        match key {
            ObjectKey::Unit { container, .. } => self.scope_relations(container),
            ObjectKey::Relation(relation) => self
                .graph
                .get_relation(relation)
                .map(|node| self.scope_relations(node.owner))
                .unwrap_or_default(),
            ObjectKey::Container(container) => self
                .graph
                .get_container(container)
                .map(|node| node.relations.clone())
                .unwrap_or_default(),
        }
    }

    /// Ends of the container's scope that target `pointer`, optionally
    /// limited to the container's own relations.
    fn references_to(&mut self, pointer: &Pointer, container: ContainerId, own_only: bool) -> Vec<EndRef> {
        let graph = self.graph;
        let targets = self.scope_targets(container);
        let mut references = Vec::new();
        for (reference, target) in targets.iter() {
            if target != pointer || references.contains(reference) {
                continue;
            }
            if own_only && !graph.container(container).relations.contains(&reference.relation) {
                continue;
            }
            references.push(*reference);
        }
        references
    }

    fn match_target(&mut self, key: ObjectKey) -> Option<MatchTarget> {
        match key {
            ObjectKey::Unit { container, index } => {
                self.graph.get_container(container)?;
                let units = self.units(container);
                let unit = units.get(index as usize)?;
                let in_scope = self.scope_relations(container);
                Some(MatchTarget {
                    pointer: unit.clip.clone(),
                    container: unit.clip.as_container_name().and_then(|n| self.graph.container_id(n)),
                    relation: None,
                    references: unit
                        .references
                        .iter()
                        .copied()
                        .filter(|r| in_scope.contains(&r.relation))
                        .collect(),
                    scope: Some(container),
                })
            }
            ObjectKey::Container(container) => {
                let node = self.graph.get_container(container)?;
                let pointer = Pointer::container(node.name.clone());
                let references = self.references_to(&pointer, container, true);
                Some(MatchTarget {
                    pointer,
                    container: Some(container),
                    relation: None,
                    references,
                    scope: Some(container),
                })
            }
            ObjectKey::Relation(relation) => {
                let node = self.graph.get_relation(relation)?;
                let pointer = Pointer::relation(node.relation.name.clone());
                let owner = node.owner;
                let references = self.references_to(&pointer, owner, false);
                Some(MatchTarget {
                    pointer,
                    container: None,
                    relation: Some(relation),
                    references,
                    scope: Some(node.owner),
                })
            }
        }
    }

    /// Where an object inherits from.
    ///
    /// A container inherits from its placement unit in its parent (or the
    /// parent itself when no unit holds it); a root inherits nothing. Units
    /// and relations inherit from the relations of the valid sequences
    /// holding them whose defining relation is in their scope, else from
    /// their container.
    fn inheritance_sources(&mut self, key: ObjectKey, target: &MatchTarget) -> Vec<ObjectKey> {
        let owner = match key {
            ObjectKey::Container(container) => {
                let Some(parent) = self.graph.container(container).parent else {
                    return Vec::new();
                };
                let placement = self.units(parent).iter().position(|u| u.clip == target.pointer);
                return vec![placement.map_or(ObjectKey::Container(parent), |i| ObjectKey::unit(parent, i))];
            }
            ObjectKey::Unit { container, .. } => container,
            ObjectKey::Relation(relation) => self.graph.relation(relation).owner,
        };

        let in_scope = self.scope_relations(owner);
        let mut sources: Vec<ObjectKey> = Vec::new();
        for sequence in self.sequences.containing(&target.pointer) {
            if !in_scope.contains(&sequence.relation) {
                continue;
            }
            let source = ObjectKey::Relation(sequence.relation);
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
        if sources.is_empty() {
            sources.push(ObjectKey::Container(owner));
        }
        sources
    }

    fn ensure(&mut self, key: ObjectKey) {
        if !self.cache.register(key) {
            return;
        }
        let candidates = match self.match_target(key) {
            Some(target) => self.gather(key, &target),
            None => {
                debug!(object = %key, "object is absent from the graph");
                Vec::new()
            }
        };
        trace!(object = %key, candidates = candidates.len(), "object resolved");
        self.cache.complete(key, MarkupDetails::from_candidates(candidates));
    }

    fn gather(&mut self, key: ObjectKey, target: &MatchTarget) -> Vec<AttributeCandidate> {
        let mut candidates = Vec::new();

        for rule in self.rules_for(key) {
            let Some(tier) = self.classifier.classify(rule, target) else {
                continue;
            };
            let endowments: &'g [Endowment] = self.classifier.markup_rule(rule).map_or(&[][..], |m| m.endowments);
            let is_default = self.graph.is_default_relation(rule);
            trace!(object = %key, rule = %self.graph.relation(rule).relation.name, ?tier, "rule matched");
            for endowment in endowments {
                candidates.push(AttributeCandidate {
                    name: endowment.name.clone(),
                    value: endowment.value.clone(),
                    kind: endowment.kind,
                    tier,
                    is_default,
                    discovery: self.next_discovery(),
                    source: CandidateSource::Rule { relation: rule },
                });
            }
        }

        for source in self.inheritance_sources(key, target) {
            self.ensure(source);
            let inherited: Vec<(String, Value)> = self
                .cache
                .get(source)
                .map(|details| {
                    details
                        .heritable()
                        .iter()
                        .map(|(name, value)| (name.clone(), value.clone()))
                        .collect()
                })
                .unwrap_or_default();
            for (name, value) in inherited {
                candidates.push(AttributeCandidate {
                    name,
                    value,
                    kind: EndowmentKind::Content,
                    tier: MatchTier::Inherited,
                    is_default: false,
                    discovery: self.next_discovery(),
                    source: CandidateSource::Inherited { object: source },
                });
            }
        }

        candidates
    }

    fn next_discovery(&mut self) -> u64 {
        self.discovery += 1;
        self.discovery
    }
}
