//! Rule roles and match classification.
//!
//! Every relation is read once for the roles it plays. A markup rule meets a
//! target through the first strategy of [`STRATEGY_TABLE`] that matches, and
//! that strategy fixes the candidate's [`MatchTier`].

use std::collections::{HashMap, HashSet};
use std::slice;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ResolverConfig;
use crate::graph::{ContainerId, Graph, RelationId};
use crate::pointer::{Pointer, PointerKind};
use crate::relation::{EndRef, Endowment};

/// How far up the container chain a scoped class match was anchored.
///
/// Nearer ancestors rank first; unscoped matches rank after every scoped one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeRank {
    Ancestor(usize),
    Unscoped,
}

/// Priority rank of a candidate value. Lower ranks win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Targeted,
    Class(ScopeRank),
    ClipType,
    ContainerType,
    RelationType,
    /// Copied from an inheritance source's heritable map.
    Inherited,
}

/// The five ways a markup rule can match a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStrategy {
    Targeted,
    Class,
    ClipType,
    ContainerType,
    RelationType,
}

/// Strategies in strict descending priority. Only the first that matches
/// contributes.
pub const STRATEGY_TABLE: [MatchStrategy; 5] = [
    MatchStrategy::Targeted,
    MatchStrategy::Class,
    MatchStrategy::ClipType,
    MatchStrategy::ContainerType,
    MatchStrategy::RelationType,
];

/// A relation endowing attributes, with its match filters.
#[derive(Debug, Clone)]
pub struct MarkupRule<'g> {
    pub relation: RelationId,
    pub endowments: &'g [Endowment],
    pub types: &'g [Pointer],
    pub levels: &'g [Pointer],
    pub clip_types: Vec<PointerKind>,
    pub container_types: &'g [Pointer],
    pub relation_types: &'g [Pointer],
}

/// A relation conferring class membership (its type) on the targets of its
/// designated end.
#[derive(Debug, Clone, Copy)]
pub struct ClassRule {
    pub relation: RelationId,
    pub end: u32,
}

/// A relation aggregating class types into the Type it names.
#[derive(Debug, Clone, Copy)]
pub struct TypeRule<'g> {
    pub relation: RelationId,
    pub classes: &'g [Pointer],
}

/// A meta-rule declaring which relations anchor sequences, and what their
/// member chain must look like.
#[derive(Debug, Clone, Copy)]
pub struct SequenceRule<'g> {
    pub relation: RelationId,
    pub applies_to: &'g [Pointer],
    pub member_end: &'g str,
    pub template: Option<&'g [Pointer]>,
}

/// One role a relation plays. A relation may play several at once.
#[derive(Debug, Clone)]
pub enum Role<'g> {
    Markup(MarkupRule<'g>),
    Class(ClassRule),
    Type(TypeRule<'g>),
    Sequence(SequenceRule<'g>),
}

impl Role<'_> {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Markup(_) => "markup",
            Self::Class(_) => "class",
            Self::Type(_) => "type",
            Self::Sequence(_) => "sequence",
        }
    }
}

/// The object a markup rule is tested against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchTarget {
    /// The pointer denoting the object: its clip, or a container/relation pointer.
    pub pointer: Pointer,
    /// The container the object is, when it is one.
    pub container: Option<ContainerId>,
    /// The relation the object is, when it is one.
    pub relation: Option<RelationId>,
    /// In-scope relation ends that target the object.
    pub references: Vec<EndRef>,
    /// Container from which level scopes are searched (distance 0).
    pub scope: Option<ContainerId>,
}

/// Determines the roles of every relation, and which match strategy (if any)
/// applies when a markup rule meets a target.
#[derive(Debug)]
pub struct RuleClassifier<'g> {
    graph: &'g Graph,
    config: &'g ResolverConfig,
    roles: Vec<Vec<Role<'g>>>,
    type_rules_by_class: HashMap<Pointer, Vec<RelationId>>,
    container_classes: HashMap<ContainerId, Vec<RelationId>>,
    closures: RwLock<HashMap<Pointer, Arc<[Pointer]>>>,
}

impl<'g> RuleClassifier<'g> {
    /// Classifies every relation of the graph.
    #[must_use]
    pub fn new(graph: &'g Graph, config: &'g ResolverConfig) -> Self {
        let roles: Vec<Vec<Role<'g>>> = graph
            .relation_ids()
            .map(|rid| classify_relation(graph, config, rid))
            .collect();

        let mut type_rules_by_class: HashMap<Pointer, Vec<RelationId>> = HashMap::new();
        let mut container_classes: HashMap<ContainerId, Vec<RelationId>> = HashMap::new();
        for (rid, relation_roles) in graph.relation_ids().zip(&roles) {
            for role in relation_roles {
                match role {
                    Role::Type(rule) => {
                        for class in rule.classes {
                            type_rules_by_class.entry(class.clone()).or_default().push(rid);
                        }
                    }
                    Role::Class(rule) => {
                        let end = &graph.relation(rid).relation.ends[rule.end as usize];
                        for pointer in &end.pointers {
                            let Some(id) = pointer.as_container_name().and_then(|n| graph.container_id(n)) else {
                                continue;
                            };
                            container_classes.entry(id).or_default().push(rid);
                        }
                    }
                    Role::Markup(_) | Role::Sequence(_) => {}
                }
            }
        }

        Self {
            graph,
            config,
            roles,
            type_rules_by_class,
            container_classes,
            closures: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn graph(&self) -> &'g Graph {
        self.graph
    }

    #[must_use]
    pub const fn config(&self) -> &'g ResolverConfig {
        self.config
    }

    /// Roles played by a relation; empty for relations playing none.
    #[must_use]
    pub fn roles(&self, relation: RelationId) -> &[Role<'g>] {
        self.roles
            .get(relation.as_u32() as usize)
            .map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn markup_rule(&self, relation: RelationId) -> Option<&MarkupRule<'g>> {
        self.roles(relation).iter().find_map(|role| match role {
            Role::Markup(rule) => Some(rule),
            _ => None,
        })
    }

    pub fn is_type_rule(&self, relation: RelationId) -> bool {
        self.roles(relation).iter().any(|role| matches!(role, Role::Type(_)))
    }

    /// Every sequence rule in the graph, in relation order.
    pub fn sequence_rules(&self) -> impl Iterator<Item = &SequenceRule<'g>> + '_ {
        self.roles.iter().flatten().filter_map(|role| match role {
            Role::Sequence(rule) => Some(rule),
            _ => None,
        })
    }

    /// All types reachable from `ty` through typed chains and TypeRule
    /// aggregation, breadth first, starting with `ty` itself.
    #[must_use]
    pub fn type_closure(&self, ty: &Pointer) -> Vec<Pointer> {
        let mut seen: HashSet<Pointer> = HashSet::new();
        let mut closure = Vec::new();
        let mut frontier = vec![ty.clone()];

        for _ in 0..self.config.max_type_depth {
            if frontier.is_empty() {
                break;
            }
            let mut next = Vec::new();
            for pointer in frontier {
                if !seen.insert(pointer.clone()) {
                    continue;
                }
                if let Pointer::Relation(rp) = &pointer {
                    if let Some(id) = self.graph.relation_id(&rp.name).filter(|_| rp.end.is_none()) {
                        if !self.is_type_rule(id) {
                            next.push(self.graph.relation(id).relation.relation_type.clone());
                        }
                    }
                }
                if let Some(rules) = self.type_rules_by_class.get(&pointer) {
                    for &rule in rules {
                        next.push(Pointer::relation(self.graph.relation(rule).relation.name.clone()));
                    }
                }
                closure.push(pointer);
            }
            frontier = next;
        }
        closure
    }

    /// The type closure of `ty`, computed once per pointer.
    ///
    /// A poisoned cache lock only costs the memo; the closure is recomputed.
    pub fn cached_closure(&self, ty: &Pointer) -> Arc<[Pointer]> {
        if let Ok(guard) = self.closures.read() {
            if let Some(closure) = guard.get(ty) {
                return Arc::clone(closure);
            }
        }
        let closure: Arc<[Pointer]> = self.type_closure(ty).into();
        if let Ok(mut guard) = self.closures.write() {
            guard.entry(ty.clone()).or_insert_with(|| Arc::clone(&closure));
        }
        closure
    }

    /// True when the closure of `ty` meets any of `wanted`.
    #[must_use]
    pub fn type_matches(&self, ty: &Pointer, wanted: &[Pointer]) -> bool {
        !wanted.is_empty() && self.cached_closure(ty).iter().any(|t| wanted.contains(t))
    }

    /// True when the container is labelled by any of `types`, either through
    /// its declared type or through a class relation listing it.
    #[must_use]
    pub fn labels(&self, container: ContainerId, types: &[Pointer]) -> bool {
        let Some(node) = self.graph.get_container(container) else {
            return false;
        };
        if node
            .container_type
            .as_ref()
            .is_some_and(|t| self.type_matches(t, types))
        {
            return true;
        }
        self.container_classes.get(&container).is_some_and(|rels| {
            rels.iter()
                .any(|&r| self.type_matches(&self.graph.relation(r).relation.relation_type, types))
        })
    }

    /// Distance from `scope` to the nearest ancestor labelled by one of
    /// `levels`. An empty `levels` list is unscoped.
    #[must_use]
    pub fn scope_rank(&self, scope: Option<ContainerId>, levels: &[Pointer]) -> Option<ScopeRank> {
        if levels.is_empty() {
            return Some(ScopeRank::Unscoped);
        }
        self.graph
            .lineage(scope?, self.config.max_scope_depth)
            .into_iter()
            .position(|ancestor| self.labels(ancestor, levels))
            .map(ScopeRank::Ancestor)
    }

    fn end_name(&self, reference: EndRef) -> Option<&'g str> {
        self.graph
            .get_relation(reference.relation)?
            .relation
            .ends
            .get(reference.end as usize)
            .map(|end| end.name.as_str())
    }

    /// Determines which strategy, if any, lets `rule` match `target`.
    ///
    /// Returns `None` when the relation is not a markup rule or no strategy
    /// applies.
    #[must_use]
    pub fn classify(&self, rule: RelationId, target: &MatchTarget) -> Option<MatchTier> {
        let markup = self.markup_rule(rule)?;
        STRATEGY_TABLE
            .iter()
            .find_map(|&strategy| self.try_strategy(strategy, markup, target))
    }

    fn try_strategy(&self, strategy: MatchStrategy, markup: &MarkupRule<'g>, target: &MatchTarget) -> Option<MatchTier> {
        let vocab = &self.config.vocabulary;
        match strategy {
            MatchStrategy::Targeted => target
                .references
                .iter()
                .any(|&r| {
                    r.relation == markup.relation
                        && self.end_name(r).is_some_and(|name| !vocab.is_reserved_end(name))
                })
                .then_some(MatchTier::Targeted),
            MatchStrategy::Class => {
                if markup.types.is_empty() {
                    return None;
                }
                let member = target.references.iter().any(|&r| {
                    self.end_name(r) == Some(vocab.class_end.as_str())
                        && self.type_matches(&self.graph.relation(r.relation).relation.relation_type, markup.types)
                });
                if !member {
                    return None;
                }
                self.scope_rank(target.scope, markup.levels).map(MatchTier::Class)
            }
            MatchStrategy::ClipType => {
                let kind = target.pointer.kind();
                (matches!(kind, PointerKind::Range | PointerKind::Region) && markup.clip_types.contains(&kind))
                    .then_some(MatchTier::ClipType)
            }
            MatchStrategy::ContainerType => target
                .container
                .and_then(|c| self.graph.get_container(c))
                .and_then(|node| node.container_type.as_ref())
                .filter(|t| self.type_matches(t, markup.container_types))
                .map(|_| MatchTier::ContainerType),
            MatchStrategy::RelationType => target
                .relation
                .and_then(|r| self.graph.get_relation(r))
                .filter(|node| self.type_matches(&node.relation.relation_type, markup.relation_types))
                .map(|_| MatchTier::RelationType),
        }
    }
}

fn end_pointers<'g>(graph: &'g Graph, relation: RelationId, end: &str) -> &'g [Pointer] {
    graph
        .relation(relation)
        .relation
        .end(end)
        .map_or(&[], |e| e.pointers.as_slice())
}

fn classify_relation<'g>(graph: &'g Graph, config: &ResolverConfig, rid: RelationId) -> Vec<Role<'g>> {
    let vocab = &config.vocabulary;
    let relation = &graph.relation(rid).relation;
    let mut roles = Vec::new();

    if relation.is_markup() {
        let clip_types = end_pointers(graph, rid, &vocab.clip_types_end)
            .iter()
            .filter_map(|p| {
                let kind = p.as_literal().and_then(PointerKind::from_name);
                if kind.is_none() {
                    debug!(relation = %relation.name, filter = %p, "unrecognized clip-type filter ignored");
                }
                kind
            })
            .collect();
        roles.push(Role::Markup(MarkupRule {
            relation: rid,
            endowments: &relation.endowments,
            types: end_pointers(graph, rid, &vocab.types_end),
            levels: end_pointers(graph, rid, &vocab.levels_end),
            clip_types,
            container_types: end_pointers(graph, rid, &vocab.container_types_end),
            relation_types: end_pointers(graph, rid, &vocab.relation_types_end),
        }));
    }

    if let Some(end) = relation.ends.iter().position(|e| e.name == vocab.class_end) {
        roles.push(Role::Class(ClassRule {
            relation: rid,
            end: end as u32,
        }));
    }

    let type_literal = relation.relation_type.as_literal();
    if type_literal == Some(vocab.type_rule.as_str()) {
        roles.push(Role::Type(TypeRule {
            relation: rid,
            classes: end_pointers(graph, rid, &vocab.classes_end),
        }));
    }

    if type_literal == Some(vocab.sequence_rule.as_str()) {
        let member_end = end_pointers(graph, rid, &vocab.member_end)
            .first()
            .and_then(Pointer::as_literal);
        match member_end {
            Some(member_end) => roles.push(Role::Sequence(SequenceRule {
                relation: rid,
                applies_to: end_pointers(graph, rid, &vocab.applies_to_end),
                member_end,
                template: relation.end(&vocab.template_end).map(|e| e.pointers.as_slice()),
            })),
            None => debug!(
                relation = %relation.name,
                "sequence rule without a member end name is ignored"
            ),
        }
    }

    roles
}

/// Convenience for single-type queries.
pub(crate) fn one(pointer: &Pointer) -> &[Pointer] {
    slice::from_ref(pointer)
}
