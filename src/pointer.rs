//! Pointers and clip algebra.
//!
//! A [`Pointer`] is an immutable reference to content, to a container, to a
//! relation (or one of its ends), or to a literal. Range and region pointers
//! additionally support interval operations: overlap, intersection and
//! containment. All intervals are half-open: `[start, start + length)`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A contiguous span of an origin's content.
///
/// # Examples
///
/// ```
/// use clipmark::RangePointer;
///
/// let a = RangePointer::new("doc", 0, 10);
/// let b = RangePointer::new("doc", 5, 10);
/// assert!(a.overlaps(&b));
/// assert_eq!(a.intersection(&b), Some(RangePointer::new("doc", 5, 5)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RangePointer {
    pub origin: String,
    pub start: u64,
    pub length: u64,
}

impl RangePointer {
    #[must_use]
    pub fn new(origin: impl Into<String>, start: u64, length: u64) -> Self {
        Self {
            origin: origin.into(),
            start,
            length,
        }
    }

    /// Exclusive end offset.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.start.saturating_add(self.length)
    }

    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns a range over `[start, end)` of the same origin.
    #[must_use]
    pub fn span(&self, start: u64, end: u64) -> Self {
        Self {
            origin: self.origin.clone(),
            start,
            length: end.saturating_sub(start),
        }
    }

    /// True when both ranges share an origin and a non-empty intersection.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.origin == other.origin && self.start < other.end() && other.start < self.end()
    }

    /// True when the ranges overlap or meet with no gap between them.
    #[must_use]
    pub fn touches(&self, other: &Self) -> bool {
        self.origin == other.origin && self.start <= other.end() && other.start <= self.end()
    }

    /// True when `other` lies entirely within this range.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.origin == other.origin && self.start <= other.start && other.end() <= self.end()
    }

    /// Returns the intersection of two ranges, if any.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        Some(self.span(self.start.max(other.start), self.end().min(other.end())))
    }

    /// Returns the smallest range covering both, if they touch.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Option<Self> {
        if !self.touches(other) {
            return None;
        }
        Some(self.span(self.start.min(other.start), self.end().max(other.end())))
    }
}

impl fmt::Display for RangePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}..{})", self.origin, self.start, self.end())
    }
}

/// A rectangular area of an origin's (two-dimensional) content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionPointer {
    pub origin: String,
    pub x: u64,
    pub y: u64,
    pub width: u64,
    pub height: u64,
}

impl RegionPointer {
    #[must_use]
    pub fn new(origin: impl Into<String>, x: u64, y: u64, width: u64, height: u64) -> Self {
        Self {
            origin: origin.into(),
            x,
            y,
            width,
            height,
        }
    }

    const fn right(&self) -> u64 {
        self.x.saturating_add(self.width)
    }

    const fn bottom(&self) -> u64 {
        self.y.saturating_add(self.height)
    }

    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.origin == other.origin
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.origin == other.origin
            && self.x <= other.x
            && self.y <= other.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        Some(Self {
            origin: self.origin.clone(),
            x,
            y,
            width: self.right().min(other.right()) - x,
            height: self.bottom().min(other.bottom()) - y,
        })
    }
}

/// A reference to a container by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerPointer {
    pub name: String,
}

/// A reference to a relation, or to one of its ends, or to one target of an end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationPointer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl RelationPointer {
    /// True when this pointer denotes the relation `name` itself rather than
    /// one of its ends.
    #[must_use]
    pub fn denotes_relation(&self, name: &str) -> bool {
        self.end.is_none() && self.name == name
    }
}

/// A literal name or value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LiteralPointer {
    pub value: String,
}

/// The discriminant of a [`Pointer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerKind {
    Range,
    Region,
    Container,
    Relation,
    Literal,
}

impl PointerKind {
    /// Stable lowercase name, as used in clip-type filters and templates.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Range => "range",
            Self::Region => "region",
            Self::Container => "container",
            Self::Relation => "relation",
            Self::Literal => "literal",
        }
    }

    /// Parses a kind name; unknown names yield `None`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "range" => Some(Self::Range),
            "region" => Some(Self::Region),
            "container" => Some(Self::Container),
            "relation" => Some(Self::Relation),
            "literal" => Some(Self::Literal),
            _ => None,
        }
    }
}

impl fmt::Display for PointerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable reference to a target.
///
/// Equality is structural: two pointers are equal exactly when they denote
/// the same target.
///
/// # Examples
///
/// ```
/// use clipmark::{Pointer, PointerKind};
///
/// let clip = Pointer::range("doc", 0, 10);
/// assert_eq!(clip.kind(), PointerKind::Range);
/// assert!(clip.is_clip());
/// assert!(!Pointer::literal("heading").is_clip());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pointer {
    Range(RangePointer),
    Region(RegionPointer),
    Container(ContainerPointer),
    Relation(RelationPointer),
    Literal(LiteralPointer),
}

impl Pointer {
    #[must_use]
    pub fn range(origin: impl Into<String>, start: u64, length: u64) -> Self {
        Self::Range(RangePointer::new(origin, start, length))
    }

    #[must_use]
    pub fn region(origin: impl Into<String>, x: u64, y: u64, width: u64, height: u64) -> Self {
        Self::Region(RegionPointer::new(origin, x, y, width, height))
    }

    #[must_use]
    pub fn container(name: impl Into<String>) -> Self {
        Self::Container(ContainerPointer { name: name.into() })
    }

    #[must_use]
    pub fn relation(name: impl Into<String>) -> Self {
        Self::Relation(RelationPointer {
            name: name.into(),
            end: None,
            index: None,
        })
    }

    /// A pointer to the targets of `end` in relation `name`, optionally
    /// narrowed to the target at `index`.
    #[must_use]
    pub fn relation_end(name: impl Into<String>, end: impl Into<String>, index: Option<usize>) -> Self {
        Self::Relation(RelationPointer {
            name: name.into(),
            end: Some(end.into()),
            index,
        })
    }

    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(LiteralPointer {
            value: value.into(),
        })
    }

    #[must_use]
    pub const fn kind(&self) -> PointerKind {
        match self {
            Self::Range(_) => PointerKind::Range,
            Self::Region(_) => PointerKind::Region,
            Self::Container(_) => PointerKind::Container,
            Self::Relation(_) => PointerKind::Relation,
            Self::Literal(_) => PointerKind::Literal,
        }
    }

    /// True for pointers that denote content: ranges, regions and containers.
    pub const fn is_clip(&self) -> bool {
        matches!(self, Self::Range(_) | Self::Region(_) | Self::Container(_))
    }

    pub const fn as_range(&self) -> Option<&RangePointer> {
        match self {
            Self::Range(r) => Some(r),
            _ => None,
        }
    }

    pub const fn as_region(&self) -> Option<&RegionPointer> {
        match self {
            Self::Region(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_container_name(&self) -> Option<&str> {
        match self {
            Self::Container(c) => Some(&c.name),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(l) => Some(&l.value),
            _ => None,
        }
    }

    /// Overlap for ranges and regions; identity for every other kind.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Range(a), Self::Range(b)) => a.overlaps(b),
            (Self::Region(a), Self::Region(b)) => a.overlaps(b),
            _ => self == other,
        }
    }

    /// Containment for ranges and regions; identity for every other kind.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Range(a), Self::Range(b)) => a.contains(b),
            (Self::Region(a), Self::Region(b)) => a.contains(b),
            _ => self == other,
        }
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range(r) => write!(f, "{r}"),
            Self::Region(r) => write!(
                f,
                "{}@({},{} {}x{})",
                r.origin, r.x, r.y, r.width, r.height
            ),
            Self::Container(c) => write!(f, "container:{}", c.name),
            Self::Relation(r) => match (&r.end, r.index) {
                (Some(end), Some(index)) => write!(f, "relation:{}.{end}[{index}]", r.name),
                (Some(end), None) => write!(f, "relation:{}.{end}", r.name),
                _ => write!(f, "relation:{}", r.name),
            },
            Self::Literal(l) => write!(f, "{:?}", l.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_overlap_requires_shared_origin() {
        let a = RangePointer::new("a", 0, 10);
        let b = RangePointer::new("b", 0, 10);
        assert!(!a.overlaps(&b));
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn adjacent_ranges_touch_but_do_not_overlap() {
        let a = RangePointer::new("doc", 0, 5);
        let b = RangePointer::new("doc", 5, 5);
        assert!(!a.overlaps(&b));
        assert!(a.touches(&b));
        assert_eq!(a.merge(&b), Some(RangePointer::new("doc", 0, 10)));
    }

    #[test]
    fn disjoint_ranges_do_not_merge() {
        let a = RangePointer::new("doc", 0, 4);
        let b = RangePointer::new("doc", 5, 5);
        assert!(a.merge(&b).is_none());
    }

    #[test]
    fn range_containment() {
        let outer = RangePointer::new("doc", 0, 10);
        assert!(outer.contains(&RangePointer::new("doc", 2, 3)));
        assert!(outer.contains(&outer));
        assert!(!outer.contains(&RangePointer::new("doc", 8, 5)));
    }

    #[test]
    fn empty_range_overlaps_nothing() {
        let empty = RangePointer::new("doc", 3, 0);
        assert!(!empty.overlaps(&RangePointer::new("doc", 0, 10)));
    }

    #[test]
    fn region_intersection() {
        let a = RegionPointer::new("img", 0, 0, 10, 10);
        let b = RegionPointer::new("img", 5, 5, 10, 10);
        assert_eq!(a.intersection(&b), Some(RegionPointer::new("img", 5, 5, 5, 5)));
        assert!(!a.overlaps(&RegionPointer::new("img", 10, 0, 5, 5)));
        assert!(a.contains(&RegionPointer::new("img", 1, 1, 2, 2)));
    }

    #[test]
    fn non_interval_pointers_compare_by_identity() {
        assert!(Pointer::container("c").overlaps(&Pointer::container("c")));
        assert!(!Pointer::container("c").overlaps(&Pointer::container("d")));
        assert!(!Pointer::range("c", 0, 1).overlaps(&Pointer::container("c")));
    }

    #[test]
    fn relation_pointer_denotes_relation_only_without_end() {
        let Pointer::Relation(whole) = Pointer::relation("r") else {
            unreachable!()
        };
        let Pointer::Relation(part) = Pointer::relation_end("r", "items", Some(0)) else {
            unreachable!()
        };
        assert!(whole.denotes_relation("r"));
        assert!(!part.denotes_relation("r"));
    }

    #[test]
    fn pointer_wire_encoding() {
        let json = serde_json::to_value(Pointer::range("doc", 2, 8)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "range", "origin": "doc", "start": 2, "length": 8})
        );

        let parsed: Pointer =
            serde_json::from_str(r#"{"kind": "relation", "name": "list", "end": "items"}"#).unwrap();
        assert_eq!(parsed, Pointer::relation_end("list", "items", None));
    }

    #[test]
    fn pointer_kind_names() {
        assert_eq!(PointerKind::from_name("region"), Some(PointerKind::Region));
        assert_eq!(PointerKind::from_name("paragraph"), None);
        assert_eq!(Pointer::literal("x").kind().as_str(), "literal");
    }
}
