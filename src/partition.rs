//! Clip partitioning.
//!
//! A range clip is cut into the minimal ordered sequence of atomic units
//! forced by the boundaries of the relation ends overlapping it. Each unit
//! carries every end reference whose target covers it. Region and container
//! clips are never split.
//!
//! Partitioning is a pure function of its inputs: the same clip and the same
//! ordered overlaps always produce the same units.

use std::collections::HashMap;

use tracing::trace;

use crate::graph::{ContainerId, Graph, RelationId};
use crate::pointer::{Pointer, RangePointer};
use crate::relation::EndRef;

/// An indivisible unit of content after partitioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub clip: Pointer,
    /// Relation ends whose targets cover this unit, in discovery order.
    pub references: Vec<EndRef>,
}

impl Unit {
    #[must_use]
    pub const fn new(clip: Pointer, references: Vec<EndRef>) -> Self {
        Self { clip, references }
    }

    pub fn is_referenced_by(&self, reference: EndRef) -> bool {
        self.references.contains(&reference)
    }
}

/// A relation end whose target range overlaps a clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlap {
    pub target: RangePointer,
    pub reference: EndRef,
}

impl Overlap {
    #[must_use]
    pub const fn new(target: RangePointer, reference: EndRef) -> Self {
        Self { target, reference }
    }
}

/// Coalesces touching or overlapping targets of the same end reference.
///
/// References keep the order of their first appearance; each reference's
/// merged ranges come out in ascending order. Empty targets are dropped.
#[must_use]
pub fn merge_adjacent(overlaps: Vec<Overlap>) -> Vec<Overlap> {
    let mut order: Vec<EndRef> = Vec::new();
    let mut groups: HashMap<EndRef, Vec<RangePointer>> = HashMap::new();
    for overlap in overlaps {
        if overlap.target.is_empty() {
            continue;
        }
        groups
            .entry(overlap.reference)
            .or_insert_with(|| {
                order.push(overlap.reference);
                Vec::new()
            })
            .push(overlap.target);
    }

    let mut out = Vec::new();
    for reference in order {
        let Some(mut ranges) = groups.remove(&reference) else {
            continue;
        };
        ranges.sort();
        let mut current: Option<RangePointer> = None;
        for range in ranges {
            current = match current {
                None => Some(range),
                Some(open) => match open.merge(&range) {
                    Some(merged) => Some(merged),
                    None => {
                        out.push(Overlap::new(open, reference));
                        Some(range)
                    }
                },
            };
        }
        if let Some(open) = current {
            out.push(Overlap::new(open, reference));
        }
    }
    out
}

/// Splits a range clip into units exactly tiling it.
///
/// Input order of `overlaps` decides which boundary is cut first. Callers
/// that want zero-gap boundaries coalesced should pass the overlaps through
/// [`merge_adjacent`] first; [`partition_clip`] does so.
///
/// # Examples
///
/// ```
/// use clipmark::partition::{partition_range, Overlap};
/// use clipmark::RangePointer;
/// # use clipmark::{Container, Graph, Pointer, Relation};
/// # let graph = Graph::builder()
/// #     .container(Container::new("doc").with_relation(Relation::new("r", Pointer::literal("t"))))
/// #     .build()
/// #     .unwrap();
/// # let reference = clipmark::EndRef::new(graph.relation_id("r").unwrap(), 0);
///
/// let clip = RangePointer::new("text", 0, 10);
/// let units = partition_range(&clip, &[Overlap::new(RangePointer::new("text", 3, 4), reference)]);
///
/// let spans: Vec<String> = units.iter().map(|u| u.clip.to_string()).collect();
/// assert_eq!(spans, ["text[0..3)", "text[3..7)", "text[7..10)"]);
/// assert!(units[1].is_referenced_by(reference));
/// ```
#[must_use]
pub fn partition_range(clip: &RangePointer, overlaps: &[Overlap]) -> Vec<Unit> {
    let pairs: Vec<&Overlap> = overlaps.iter().collect();
    let mut out = Vec::new();
    split(clip, &pairs, &[], &mut out);
    out
}

fn split(range: &RangePointer, pairs: &[&Overlap], accumulated: &[EndRef], out: &mut Vec<Unit>) {
    let live: Vec<&Overlap> = pairs
        .iter()
        .copied()
        .filter(|o| o.target.overlaps(range))
        .collect();
    let Some((first, rest)) = live.split_first() else {
        out.push(Unit::new(Pointer::Range(range.clone()), accumulated.to_vec()));
        return;
    };
    let Some(common) = range.intersection(&first.target) else {
        split(range, rest, accumulated, out);
        return;
    };

    if common.start > range.start {
        split(&range.span(range.start, common.start), rest, accumulated, out);
    }

    let mut covered = accumulated.to_vec();
    if !covered.contains(&first.reference) {
        covered.push(first.reference);
    }
    split(&common, rest, &covered, out);

    if common.end() < range.end() {
        split(&range.span(common.end(), range.end()), rest, accumulated, out);
    }
}

/// Partitions one clip against `(reference, target)` pairs.
///
/// Range clips are split by overlapping range targets; region and container
/// clips yield one unit holding the references that equal them. Pointers
/// that are not clips yield no units.
#[must_use]
pub fn partition_clip(clip: &Pointer, targets: &[(EndRef, Pointer)]) -> Vec<Unit> {
    match clip {
        Pointer::Range(range) => {
            let overlaps = targets
                .iter()
                .filter_map(|(reference, target)| match target {
                    Pointer::Range(t) if t.touches(range) => Some(Overlap::new(t.clone(), *reference)),
                    _ => None,
                })
                .collect();
            partition_range(range, &merge_adjacent(overlaps))
        }
        Pointer::Region(_) | Pointer::Container(_) => {
            let mut references = Vec::new();
            for (reference, target) in targets {
                if target == clip && !references.contains(reference) {
                    references.push(*reference);
                }
            }
            vec![Unit::new(clip.clone(), references)]
        }
        Pointer::Relation(_) | Pointer::Literal(_) => {
            trace!(pointer = %clip, "content entry is not a clip");
            Vec::new()
        }
    }
}

/// Collects the `(reference, target)` pairs of every end of `relations`,
/// dereferencing relation-end pointers, in relation, end and pointer order.
#[must_use]
pub fn collect_targets(graph: &Graph, relations: &[RelationId], max_pointer_depth: usize) -> Vec<(EndRef, Pointer)> {
    let mut targets = Vec::new();
    for &rid in relations {
        for (ei, end) in graph.relation(rid).relation.ends.iter().enumerate() {
            let reference = EndRef::new(rid, ei as u32);
            for pointer in &end.pointers {
                for target in graph.dereference(pointer, max_pointer_depth) {
                    targets.push((reference, target));
                }
            }
        }
    }
    targets
}

/// Partitions a container's whole content list against the ends of the
/// given relations. Units come out in content order.
#[must_use]
pub fn partition_content(
    graph: &Graph,
    container: ContainerId,
    relations: &[RelationId],
    max_pointer_depth: usize,
) -> Vec<Unit> {
    let targets = collect_targets(graph, relations, max_pointer_depth);
    partition_against(graph, container, &targets)
}

/// Partitions a container's content against precollected targets.
#[must_use]
pub fn partition_against(graph: &Graph, container: ContainerId, targets: &[(EndRef, Pointer)]) -> Vec<Unit> {
    let node = graph.container(container);
    let units: Vec<Unit> = node
        .content
        .iter()
        .flat_map(|clip| partition_clip(clip, targets))
        .collect();
    trace!(
        container = %node.name,
        clips = node.content.len(),
        units = units.len(),
        "partitioned container content"
    );
    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;
    use crate::relation::Relation;

    fn refs(n: usize) -> (Graph, Vec<EndRef>) {
        let mut doc = Container::new("doc");
        for i in 0..n {
            doc = doc.with_relation(Relation::new(format!("r{i}"), Pointer::literal("t")));
        }
        let graph = Graph::builder().container(doc).build().unwrap();
        let ids = (0..n)
            .map(|i| EndRef::new(graph.relation_id(&format!("r{i}")).unwrap(), 0))
            .collect();
        (graph, ids)
    }

    fn spans(units: &[Unit]) -> Vec<(u64, u64)> {
        units
            .iter()
            .map(|u| {
                let r = u.clip.as_range().unwrap();
                (r.start, r.end())
            })
            .collect()
    }

    #[test]
    fn no_overlaps_yields_single_unit() {
        let clip = RangePointer::new("t", 0, 10);
        let units = partition_range(&clip, &[]);
        assert_eq!(units, vec![Unit::new(Pointer::Range(clip), Vec::new())]);
    }

    #[test]
    fn nested_overlaps_cut_minimal_units() {
        let (_g, r) = refs(2);
        let clip = RangePointer::new("t", 0, 10);
        let overlaps = [
            Overlap::new(RangePointer::new("t", 2, 6), r[0]),
            Overlap::new(RangePointer::new("t", 4, 2), r[1]),
        ];
        let units = partition_range(&clip, &overlaps);
        assert_eq!(spans(&units), vec![(0, 2), (2, 4), (4, 6), (6, 8), (8, 10)]);
        assert!(units[0].references.is_empty());
        assert_eq!(units[1].references, vec![r[0]]);
        assert_eq!(units[2].references, vec![r[0], r[1]]);
        assert_eq!(units[3].references, vec![r[0]]);
    }

    #[test]
    fn crossing_overlaps_accumulate_in_input_order() {
        let (_g, r) = refs(2);
        let clip = RangePointer::new("t", 0, 10);
        let overlaps = [
            Overlap::new(RangePointer::new("t", 5, 5), r[1]),
            Overlap::new(RangePointer::new("t", 0, 7), r[0]),
        ];
        let units = partition_range(&clip, &overlaps);
        assert_eq!(spans(&units), vec![(0, 5), (5, 7), (7, 10)]);
        assert_eq!(units[1].references, vec![r[1], r[0]]);
        assert_eq!(units[2].references, vec![r[1]]);
    }

    #[test]
    fn overlap_extending_past_clip_is_clamped() {
        let (_g, r) = refs(1);
        let clip = RangePointer::new("t", 10, 10);
        let units = partition_range(&clip, &[Overlap::new(RangePointer::new("t", 0, 15), r[0])]);
        assert_eq!(spans(&units), vec![(10, 15), (15, 20)]);
    }

    #[test]
    fn adjacent_targets_of_one_end_do_not_cut() {
        let (_g, r) = refs(1);
        let merged = merge_adjacent(vec![
            Overlap::new(RangePointer::new("t", 5, 5), r[0]),
            Overlap::new(RangePointer::new("t", 0, 5), r[0]),
            Overlap::new(RangePointer::new("t", 12, 0), r[0]),
        ]);
        assert_eq!(merged, vec![Overlap::new(RangePointer::new("t", 0, 10), r[0])]);
    }

    #[test]
    fn region_and_container_clips_are_never_split() {
        let (_g, r) = refs(2);
        let region = Pointer::region("img", 0, 0, 4, 4);
        let targets = vec![
            (r[0], region.clone()),
            (r[1], Pointer::region("img", 0, 0, 2, 2)),
        ];
        let units = partition_clip(&region, &targets);
        assert_eq!(units, vec![Unit::new(region, vec![r[0]])]);

        let child = Pointer::container("child");
        let units = partition_clip(&child, &[(r[1], child.clone()), (r[1], child.clone())]);
        assert_eq!(units, vec![Unit::new(child, vec![r[1]])]);
    }

    #[test]
    fn literal_content_is_skipped() {
        assert!(partition_clip(&Pointer::literal("x"), &[]).is_empty());
    }

    #[test]
    fn partition_content_dereferences_relation_ends() {
        let graph = Graph::builder()
            .container(
                Container::new("doc")
                    .with_clip(Pointer::range("t", 0, 10))
                    .with_relation(
                        Relation::new("list", Pointer::literal("list"))
                            .with_end("items", vec![Pointer::range("t", 0, 4)]),
                    )
                    .with_relation(
                        Relation::new("first", Pointer::literal("markup"))
                            .with_end("target", vec![Pointer::relation_end("list", "items", Some(0))]),
                    ),
            )
            .build()
            .unwrap();
        let doc = graph.container_id("doc").unwrap();
        let relations = graph.container(doc).relations.clone();
        let units = partition_content(&graph, doc, &relations, 8);

        assert_eq!(spans(&units), vec![(0, 4), (4, 10)]);
        let first = EndRef::new(graph.relation_id("first").unwrap(), 0);
        assert!(units[0].is_referenced_by(first));
        assert!(!units[1].is_referenced_by(first));
    }
}
