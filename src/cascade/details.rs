//! Per-object candidate lists and the attribute maps derived from them.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::cascade::cache::ObjectKey;
use crate::graph::RelationId;
use crate::relation::EndowmentKind;
use crate::rules::MatchTier;
use crate::value::Value;

/// Attribute name to winning value, sorted by name.
pub type AttributeMap = BTreeMap<String, Value>;

static EMPTY: AttributeMap = BTreeMap::new();

/// Where a candidate value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum CandidateSource {
    /// A markup rule matched the object.
    Rule { relation: RelationId },
    /// Inherited from another object's heritable map.
    Inherited { object: ObjectKey },
}

/// One possible value for one attribute of one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeCandidate {
    pub name: String,
    pub value: Value,
    pub kind: EndowmentKind,
    pub tier: MatchTier,
    pub is_default: bool,
    /// Monotonic counter; later discoveries break ties.
    pub discovery: u64,
    pub source: CandidateSource,
}

impl AttributeCandidate {
    /// Total order used to rank candidates for one attribute. The winner
    /// sorts first.
    ///
    /// Lower tier wins; within a tier non-default rules beat defaults; the
    /// remaining ties go to the later discovery.
    #[must_use]
    pub fn precedence(&self, other: &Self) -> Ordering {
        self.tier
            .cmp(&other.tier)
            .then(self.is_default.cmp(&other.is_default))
            .then(other.discovery.cmp(&self.discovery))
    }

    pub fn is_heritable(&self) -> bool {
        self.kind == EndowmentKind::Content
    }
}

/// The resolution state of one object.
///
/// A freshly registered object is pending: its maps read as empty until
/// its candidates are filled in. Complete details derive the definitive and
/// heritable maps lazily and memoize them.
#[derive(Debug, Default)]
pub struct MarkupDetails {
    candidates: BTreeMap<String, Vec<AttributeCandidate>>,
    complete: bool,
    definitive: OnceLock<AttributeMap>,
    heritable: OnceLock<AttributeMap>,
}

impl MarkupDetails {
    pub(crate) fn pending() -> Self {
        Self::default()
    }

    pub(crate) fn from_candidates(candidates: Vec<AttributeCandidate>) -> Self {
        let mut grouped: BTreeMap<String, Vec<AttributeCandidate>> = BTreeMap::new();
        for candidate in candidates {
            grouped.entry(candidate.name.clone()).or_default().push(candidate);
        }
        for list in grouped.values_mut() {
            list.sort_by(AttributeCandidate::precedence);
        }
        Self {
            candidates: grouped,
            complete: true,
            definitive: OnceLock::new(),
            heritable: OnceLock::new(),
        }
    }

    /// False while the object is still being resolved.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// Ranked candidates for one attribute, winner first.
    #[must_use]
    pub fn candidates(&self, name: &str) -> &[AttributeCandidate] {
        self.candidates.get(name).map_or(&[], Vec::as_slice)
    }

    /// Names of every attribute with at least one candidate.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.candidates.keys().map(String::as_str)
    }

    /// Winning value of each attribute.
    #[must_use]
    pub fn definitive(&self) -> &AttributeMap {
        if !self.complete {
            return &EMPTY;
        }
        self.definitive.get_or_init(|| {
            self.candidates
                .iter()
                .filter_map(|(name, list)| list.first().map(|c| (name.clone(), c.value.clone())))
                .collect()
        })
    }

    /// Best content-kind value of each attribute: what held content inherits.
    #[must_use]
    pub fn heritable(&self) -> &AttributeMap {
        if !self.complete {
            return &EMPTY;
        }
        self.heritable.get_or_init(|| {
            self.candidates
                .iter()
                .filter_map(|(name, list)| {
                    list.iter()
                        .find(|c| c.is_heritable())
                        .map(|c| (name.clone(), c.value.clone()))
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ScopeRank;

    fn candidate(name: &str, value: &str, kind: EndowmentKind, tier: MatchTier, is_default: bool, discovery: u64) -> AttributeCandidate {
        AttributeCandidate {
            name: name.to_string(),
            value: Value::from(value),
            kind,
            tier,
            is_default,
            discovery,
            source: CandidateSource::Inherited {
                object: ObjectKey::Relation(crate::graph::RelationId::from_raw(0)),
            },
        }
    }

    #[test]
    fn pending_details_read_as_empty() {
        let details = MarkupDetails::pending();
        assert!(!details.is_complete());
        assert!(details.definitive().is_empty());
        assert!(details.heritable().is_empty());
    }

    #[test]
    fn lower_tier_wins() {
        let details = MarkupDetails::from_candidates(vec![
            candidate("color", "red", EndowmentKind::Direct, MatchTier::ClipType, false, 1),
            candidate("color", "blue", EndowmentKind::Direct, MatchTier::Targeted, false, 2),
        ]);
        assert_eq!(details.definitive()["color"], Value::from("blue"));
    }

    #[test]
    fn non_default_beats_default_within_tier() {
        let details = MarkupDetails::from_candidates(vec![
            candidate("font", "mono", EndowmentKind::Content, MatchTier::ContainerType, false, 1),
            candidate("font", "serif", EndowmentKind::Content, MatchTier::ContainerType, true, 2),
        ]);
        assert_eq!(details.definitive()["font"], Value::from("mono"));
    }

    #[test]
    fn later_discovery_breaks_ties() {
        let details = MarkupDetails::from_candidates(vec![
            candidate("a", "first", EndowmentKind::Direct, MatchTier::Targeted, false, 1),
            candidate("a", "second", EndowmentKind::Direct, MatchTier::Targeted, false, 2),
        ]);
        assert_eq!(details.definitive()["a"], Value::from("second"));
        assert_eq!(details.candidates("a").len(), 2);
    }

    #[test]
    fn heritable_skips_direct_winners() {
        let details = MarkupDetails::from_candidates(vec![
            candidate("lang", "fr", EndowmentKind::Direct, MatchTier::Targeted, false, 1),
            candidate("lang", "en", EndowmentKind::Content, MatchTier::Class(ScopeRank::Unscoped), false, 2),
            candidate("border", "1", EndowmentKind::Direct, MatchTier::Targeted, false, 3),
        ]);
        assert_eq!(details.definitive()["lang"], Value::from("fr"));
        assert_eq!(details.heritable()["lang"], Value::from("en"));
        assert!(!details.heritable().contains_key("border"));
        assert_eq!(details.attribute_names().collect::<Vec<_>>(), vec!["border", "lang"]);
    }
}
