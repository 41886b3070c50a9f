//! Sequences: ordered member chains anchored on relations that a
//! SequenceRule applies to.

use thiserror::Error;
use tracing::{debug, trace};

use crate::graph::{Graph, RelationId};
use crate::pointer::{Pointer, PointerKind};
use crate::rules::classifier::{one, RuleClassifier, SequenceRule};

/// Template entry that matches any member.
pub const WILDCARD: &str = "*";

/// A validated member chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    /// The relation whose member end forms the chain.
    pub relation: RelationId,
    /// Index of the member end within the relation.
    pub end: u32,
    /// The SequenceRule that validated it.
    pub rule: RelationId,
    /// Members in order, with relation-end pointers dereferenced.
    pub members: Vec<Pointer>,
}

impl Sequence {
    /// True when `target` belongs to the chain: it overlaps a range or region
    /// member, or equals a container or relation member.
    ///
    /// Touching members of one end merge during partitioning, so a unit may
    /// span several consecutive members; overlap keeps it inside the chain.
    #[must_use]
    pub fn contains(&self, target: &Pointer) -> bool {
        self.members.iter().any(|m| m.overlaps(target))
    }
}

/// Why a candidate relation failed to form a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceMismatch {
    #[error("relation has no end named '{end}'")]
    MissingMemberEnd { end: String },

    #[error("member end '{end}' is empty")]
    EmptyMemberEnd { end: String },

    #[error("member {position} ({member}) does not resolve")]
    Unresolved { position: usize, member: String },

    #[error("member {position} ({member}) is a literal, not content")]
    LiteralMember { position: usize, member: String },

    #[error("template expects {expected} members, found {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("member {position} ({member}) does not match template entry '{expected}'")]
    TemplateMismatch {
        position: usize,
        member: String,
        expected: String,
    },
}

/// True when `rule` applies to `relation`, either by naming it or through its
/// type closure.
#[must_use]
pub fn applies_to(classifier: &RuleClassifier<'_>, rule: &SequenceRule<'_>, relation: RelationId) -> bool {
    let node = &classifier.graph().relation(relation).relation;
    rule.applies_to.contains(&Pointer::relation(node.name.clone()))
        || classifier.type_matches(&node.relation_type, rule.applies_to)
}

/// Validates the member end of `relation` against `rule`.
///
/// # Errors
///
/// Returns the first [`SequenceMismatch`] found, in member order.
pub fn validate_sequence(
    classifier: &RuleClassifier<'_>,
    relation: RelationId,
    rule: &SequenceRule<'_>,
) -> Result<Sequence, SequenceMismatch> {
    let graph = classifier.graph();
    let max_depth = classifier.config().max_pointer_depth;
    let ends = &graph.relation(relation).relation.ends;
    let end_index = ends
        .iter()
        .position(|e| e.name == rule.member_end)
        .ok_or_else(|| SequenceMismatch::MissingMemberEnd {
            end: rule.member_end.to_string(),
        })?;
    let end = &ends[end_index];
    if end.pointers.is_empty() {
        return Err(SequenceMismatch::EmptyMemberEnd {
            end: rule.member_end.to_string(),
        });
    }

    let mut members = Vec::with_capacity(end.pointers.len());
    for (position, pointer) in end.pointers.iter().enumerate() {
        let resolved = graph.dereference(pointer, max_depth);
        if resolved.is_empty() {
            return Err(SequenceMismatch::Unresolved {
                position,
                member: pointer.to_string(),
            });
        }
        members.extend(resolved);
    }

    for (position, member) in members.iter().enumerate() {
        if !graph.resolves(member) {
            return Err(SequenceMismatch::Unresolved {
                position,
                member: member.to_string(),
            });
        }
        if member.kind() == PointerKind::Literal {
            return Err(SequenceMismatch::LiteralMember {
                position,
                member: member.to_string(),
            });
        }
    }

    if let Some(template) = rule.template {
        if template.len() != members.len() {
            return Err(SequenceMismatch::LengthMismatch {
                expected: template.len(),
                actual: members.len(),
            });
        }
        for (position, (pattern, member)) in template.iter().zip(&members).enumerate() {
            if !template_matches(classifier, pattern, member) {
                return Err(SequenceMismatch::TemplateMismatch {
                    position,
                    member: member.to_string(),
                    expected: pattern.to_string(),
                });
            }
        }
    }

    Ok(Sequence {
        relation,
        end: end_index as u32,
        rule: rule.relation,
        members,
    })
}

fn template_matches(classifier: &RuleClassifier<'_>, pattern: &Pointer, member: &Pointer) -> bool {
    if let Some(literal) = pattern.as_literal() {
        if literal == WILDCARD {
            return true;
        }
        if let Some(kind) = PointerKind::from_name(literal) {
            return member.kind() == kind;
        }
    }
    let graph = classifier.graph();
    match member {
        Pointer::Container(c) => graph
            .container_id(&c.name)
            .is_some_and(|id| classifier.labels(id, one(pattern))),
        Pointer::Relation(rp) if rp.end.is_none() => graph
            .relation_id(&rp.name)
            .is_some_and(|id| classifier.type_matches(&graph.relation(id).relation.relation_type, one(pattern))),
        _ => false,
    }
}

/// Every valid sequence of a graph, discovered once up front.
#[derive(Debug, Clone, Default)]
pub struct SequenceIndex {
    sequences: Vec<Sequence>,
}

impl SequenceIndex {
    /// Tests every relation against every SequenceRule. Each pair yields at
    /// most one sequence; failed validations are logged and skipped.
    #[must_use]
    pub fn build(classifier: &RuleClassifier<'_>) -> Self {
        let graph: &Graph = classifier.graph();
        let mut sequences = Vec::new();
        for relation in graph.relation_ids() {
            for rule in classifier.sequence_rules() {
                if !applies_to(classifier, rule, relation) {
                    continue;
                }
                match validate_sequence(classifier, relation, rule) {
                    Ok(sequence) => {
                        trace!(
                            relation = %graph.relation(relation).relation.name,
                            members = sequence.members.len(),
                            "sequence validated"
                        );
                        sequences.push(sequence);
                    }
                    Err(mismatch) => debug!(
                        relation = %graph.relation(relation).relation.name,
                        rule = %graph.relation(rule.relation).relation.name,
                        %mismatch,
                        "sequence rejected"
                    ),
                }
            }
        }
        Self { sequences }
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Sequences with a member containing `target`, in discovery order.
    pub fn containing<'a>(&'a self, target: &'a Pointer) -> impl Iterator<Item = &'a Sequence> + 'a {
        self.sequences.iter().filter(move |s| s.contains(target))
    }

    /// Relations anchoring at least one sequence, deduplicated, in discovery
    /// order.
    #[must_use]
    pub fn anchors(&self) -> Vec<RelationId> {
        let mut anchors: Vec<RelationId> = Vec::new();
        for sequence in &self.sequences {
            if !anchors.contains(&sequence.relation) {
                anchors.push(sequence.relation);
            }
        }
        anchors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::container::Container;
    use crate::relation::Relation;

    fn seq_rule(template: Option<Vec<Pointer>>) -> Relation {
        let rule = Relation::new("list-rule", Pointer::literal("sequence"))
            .with_end("applies-to", vec![Pointer::literal("list")])
            .with_end("member-end", vec![Pointer::literal("items")]);
        match template {
            Some(t) => rule.with_end("template", t),
            None => rule,
        }
    }

    fn graph_with(rule: Relation, items: Vec<Pointer>) -> Graph {
        Graph::builder()
            .container(
                Container::new("doc")
                    .with_clip(Pointer::range("t", 0, 20))
                    .with_relation(rule)
                    .with_relation(Relation::new("l", Pointer::literal("list")).with_end("items", items)),
            )
            .build()
            .unwrap()
    }

    fn index(graph: &Graph) -> SequenceIndex {
        let config = ResolverConfig::default();
        let classifier = RuleClassifier::new(graph, &config);
        SequenceIndex::build(&classifier)
    }

    #[test]
    fn untemplated_sequence_is_valid() {
        let graph = graph_with(seq_rule(None), vec![Pointer::range("t", 0, 5), Pointer::range("t", 5, 5)]);
        let index = index(&graph);
        assert_eq!(index.len(), 1);
        let seq = &index.sequences()[0];
        assert_eq!(seq.relation, graph.relation_id("l").unwrap());
        assert_eq!(seq.rule, graph.relation_id("list-rule").unwrap());
        assert!(seq.contains(&Pointer::range("t", 1, 2)));
        assert!(!seq.contains(&Pointer::range("t", 12, 4)));
    }

    #[test]
    fn template_checks_length_and_kinds() {
        let template = vec![Pointer::literal("range"), Pointer::literal("*")];
        let ok = graph_with(
            seq_rule(Some(template.clone())),
            vec![Pointer::range("t", 0, 5), Pointer::container("doc")],
        );
        assert_eq!(index(&ok).len(), 1);

        let short = graph_with(seq_rule(Some(template.clone())), vec![Pointer::range("t", 0, 5)]);
        assert!(index(&short).is_empty());

        let wrong_kind = graph_with(
            seq_rule(Some(template)),
            vec![Pointer::container("doc"), Pointer::range("t", 0, 5)],
        );
        assert!(index(&wrong_kind).is_empty());
    }

    #[test]
    fn mismatches_are_reported() {
        let graph = graph_with(
            seq_rule(Some(vec![Pointer::literal("region")])),
            vec![Pointer::range("t", 0, 5)],
        );
        let config = ResolverConfig::default();
        let classifier = RuleClassifier::new(&graph, &config);
        let rule = *classifier.sequence_rules().next().unwrap();
        let err = validate_sequence(&classifier, graph.relation_id("l").unwrap(), &rule).unwrap_err();
        assert!(matches!(err, SequenceMismatch::TemplateMismatch { position: 0, .. }));
    }

    #[test]
    fn unresolved_and_empty_members_invalidate() {
        let missing = graph_with(seq_rule(None), vec![Pointer::container("nowhere")]);
        assert!(index(&missing).is_empty());

        let empty = graph_with(seq_rule(None), Vec::new());
        assert!(index(&empty).is_empty());
    }

    #[test]
    fn typed_template_entries_use_type_closure() {
        let graph = Graph::builder()
            .container(Container::new("para").with_type(Pointer::literal("paragraph")))
            .container(
                Container::new("doc")
                    .with_clip(Pointer::container("para"))
                    .with_relation(seq_rule(Some(vec![Pointer::literal("paragraph")])))
                    .with_relation(
                        Relation::new("l", Pointer::literal("list")).with_end("items", vec![Pointer::container("para")]),
                    ),
            )
            .build()
            .unwrap();
        assert_eq!(index(&graph).len(), 1);
    }

    #[test]
    fn rule_can_name_relation_directly() {
        let graph = Graph::builder()
            .container(
                Container::new("doc")
                    .with_relation(
                        Relation::new("rule", Pointer::literal("sequence"))
                            .with_end("applies-to", vec![Pointer::relation("chain")])
                            .with_end("member-end", vec![Pointer::literal("links")]),
                    )
                    .with_relation(
                        Relation::new("chain", Pointer::literal("other"))
                            .with_end("links", vec![Pointer::range("t", 0, 3)]),
                    ),
            )
            .build()
            .unwrap();
        let index = index(&graph);
        assert_eq!(index.anchors(), vec![graph.relation_id("chain").unwrap()]);
    }
}
