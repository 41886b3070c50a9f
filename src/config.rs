//! Resolver configuration.
//!
//! The rule vocabulary (which end names and type literals mark the various
//! rule roles) is explicit configuration handed to the resolver, never a
//! process-wide registry.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{MarkupError, MarkupResult, ValidationError};

/// End names and type literals that give relations their rule roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// End through which a relation confers class membership on its targets.
    pub class_end: String,
    /// Markup filter: Types the rule applies to via class membership.
    pub types_end: String,
    /// Markup filter: Types that must label some ancestor container.
    pub levels_end: String,
    /// Markup filter: literal clip kinds (`range`, `region`).
    pub clip_types_end: String,
    /// Markup filter: container types.
    pub container_types_end: String,
    /// Markup filter: relation types.
    pub relation_types_end: String,
    /// Relation type literal marking a TypeRule.
    pub type_rule: String,
    /// TypeRule end listing the aggregated class types.
    pub classes_end: String,
    /// Relation type literal marking a SequenceRule.
    pub sequence_rule: String,
    /// SequenceRule end listing the relation types it applies to.
    pub applies_to_end: String,
    /// SequenceRule end holding one literal: the member end's name.
    pub member_end: String,
    /// SequenceRule end holding the expected member chain.
    pub template_end: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            class_end: "class".to_string(),
            types_end: "types".to_string(),
            levels_end: "levels".to_string(),
            clip_types_end: "clip-types".to_string(),
            container_types_end: "container-types".to_string(),
            relation_types_end: "relation-types".to_string(),
            type_rule: "type".to_string(),
            classes_end: "classes".to_string(),
            sequence_rule: "sequence".to_string(),
            applies_to_end: "applies-to".to_string(),
            member_end: "member-end".to_string(),
            template_end: "template".to_string(),
        }
    }
}

impl Vocabulary {
    fn reserved_ends(&self) -> [&str; 10] {
        [
            self.class_end.as_str(),
            self.types_end.as_str(),
            self.levels_end.as_str(),
            self.clip_types_end.as_str(),
            self.container_types_end.as_str(),
            self.relation_types_end.as_str(),
            self.classes_end.as_str(),
            self.applies_to_end.as_str(),
            self.member_end.as_str(),
            self.template_end.as_str(),
        ]
    }

    /// True for ends that carry rule metadata rather than targets.
    #[must_use]
    pub fn is_reserved_end(&self, name: &str) -> bool {
        self.reserved_ends().contains(&name)
    }
}

/// Resolver configuration.
///
/// # Examples
///
/// ```
/// use clipmark::ResolverConfig;
///
/// let config = ResolverConfig::from_json(r#"{"max_scope_depth": 8}"#).unwrap();
/// assert_eq!(config.max_scope_depth, 8);
/// assert_eq!(config.vocabulary.class_end, "class");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub vocabulary: Vocabulary,
    /// Maximum breadth-first levels explored when computing a type closure.
    pub max_type_depth: usize,
    /// Maximum ancestor hops when testing level scopes.
    pub max_scope_depth: usize,
    /// Maximum nesting when dereferencing relation-end pointers.
    pub max_pointer_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            vocabulary: Vocabulary::default(),
            max_type_depth: 64,
            max_scope_depth: 256,
            max_pointer_depth: 16,
        }
    }
}

impl ResolverConfig {
    /// Parses and validates a JSON configuration. Missing fields take their
    /// defaults.
    pub fn from_json(s: &str) -> MarkupResult<Self> {
        let config: Self = serde_json::from_str(s)
            .map_err(|e| MarkupError::serialization(format!("deserialize config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that vocabulary names are non-empty and pairwise distinct, and
    /// that every limit is positive.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let vocab = &self.vocabulary;
        let mut seen = HashSet::new();
        for name in vocab.reserved_ends() {
            if name.trim().is_empty() {
                return Err(ValidationError::InvalidConfig {
                    reason: "vocabulary end names cannot be empty".to_string(),
                });
            }
            if !seen.insert(name) {
                return Err(ValidationError::InvalidConfig {
                    reason: format!("vocabulary end name '{name}' is used twice"),
                });
            }
        }
        if vocab.type_rule.trim().is_empty() || vocab.sequence_rule.trim().is_empty() {
            return Err(ValidationError::InvalidConfig {
                reason: "rule type literals cannot be empty".to_string(),
            });
        }
        if vocab.type_rule == vocab.sequence_rule {
            return Err(ValidationError::InvalidConfig {
                reason: "type and sequence rules need distinct literals".to_string(),
            });
        }
        for (field, value) in [
            ("max_type_depth", self.max_type_depth),
            ("max_scope_depth", self.max_scope_depth),
            ("max_pointer_depth", self.max_pointer_depth),
        ] {
            if value == 0 {
                return Err(ValidationError::InvalidConfig {
                    reason: format!("{field} must be positive"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ResolverConfig::default().validate().is_ok());
    }

    #[test]
    fn reserved_ends_cover_filters_and_meta() {
        let vocab = Vocabulary::default();
        assert!(vocab.is_reserved_end("types"));
        assert!(vocab.is_reserved_end("class"));
        assert!(vocab.is_reserved_end("template"));
        assert!(!vocab.is_reserved_end("target"));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ResolverConfig::from_json(r#"{"vocabulary": {"class_end": "kind"}}"#).unwrap();
        assert_eq!(config.vocabulary.class_end, "kind");
        assert_eq!(config.vocabulary.types_end, "types");
        assert_eq!(config.max_type_depth, 64);
    }

    #[test]
    fn colliding_end_names_are_rejected() {
        let err = ResolverConfig::from_json(r#"{"vocabulary": {"levels_end": "types"}}"#).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn zero_limits_are_rejected() {
        let config = ResolverConfig {
            max_scope_depth: 0,
            ..ResolverConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let err = ResolverConfig::from_json("{").unwrap_err();
        assert!(err.is_serialization());
    }
}
