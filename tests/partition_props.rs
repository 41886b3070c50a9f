use clipmark::partition::{merge_adjacent, partition_range, Overlap};
use clipmark::{Container, EndRef, Graph, Pointer, RangePointer, Relation};

/// Small deterministic generator so the sweep is reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 33) % bound
    }
}

fn refs(count: u32) -> Vec<EndRef> {
    let graph = Graph::builder()
        .container((0..count).fold(Container::new("doc"), |c, i| {
            c.with_relation(Relation::new(format!("r{i}"), Pointer::literal("markup")))
        }))
        .build()
        .unwrap();
    (0..count)
        .map(|i| EndRef::new(graph.relation_id(&format!("r{i}")).unwrap(), 0))
        .collect()
}

fn assert_tiles(clip: &RangePointer, overlaps: &[Overlap]) {
    let units = partition_range(clip, overlaps);
    assert!(!units.is_empty());

    let mut cursor = clip.start;
    for unit in &units {
        let range = unit.clip.as_range().unwrap();
        assert_eq!(range.origin, clip.origin);
        assert_eq!(range.start, cursor, "gap or overlap at {cursor}");
        assert!(range.length > 0, "zero-width unit {range}");
        cursor = range.end();

        for overlap in overlaps {
            let expected = overlaps
                .iter()
                .any(|o| o.reference == overlap.reference && o.target.contains(range));
            assert_eq!(unit.is_referenced_by(overlap.reference), expected, "unit {range}");
        }
    }
    assert_eq!(cursor, clip.end());
}

#[test]
fn units_tile_the_clip() {
    let references = refs(5);
    let mut rng = Lcg(7);
    for _ in 0..500 {
        let clip = RangePointer::new("t", rng.next(20), 1 + rng.next(40));
        let count = rng.next(6) as usize;
        let overlaps: Vec<Overlap> = (0..count)
            .map(|_| {
                let start = rng.next(70);
                let target = RangePointer::new("t", start, rng.next(30));
                Overlap::new(target, references[rng.next(5) as usize])
            })
            .filter(|o| o.target.overlaps(&clip))
            .collect();
        assert_tiles(&clip, &merge_adjacent(overlaps));
    }
}

#[test]
fn partitioning_is_deterministic() {
    let references = refs(3);
    let clip = RangePointer::new("t", 0, 50);
    let overlaps = vec![
        Overlap::new(RangePointer::new("t", 10, 20), references[0]),
        Overlap::new(RangePointer::new("t", 5, 10), references[1]),
        Overlap::new(RangePointer::new("t", 25, 25), references[2]),
    ];
    let first = partition_range(&clip, &overlaps);
    for _ in 0..10 {
        assert_eq!(partition_range(&clip, &overlaps), first);
    }
}

#[test]
fn touching_targets_of_one_reference_merge() {
    let references = refs(1);
    let clip = RangePointer::new("t", 0, 10);
    let overlaps = merge_adjacent(vec![
        Overlap::new(RangePointer::new("t", 0, 5), references[0]),
        Overlap::new(RangePointer::new("t", 5, 5), references[0]),
    ]);
    let units = partition_range(&clip, &overlaps);
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].references, vec![references[0]]);
}
