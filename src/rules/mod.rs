//! Rule roles: which relations act as markup, class, type or sequence rules,
//! and how markup rules match their targets.

pub mod classifier;
pub mod sequence;

pub use classifier::{
    ClassRule, MarkupRule, MatchStrategy, MatchTarget, MatchTier, Role, RuleClassifier, ScopeRank, SequenceRule,
    TypeRule, STRATEGY_TABLE,
};
pub use sequence::{validate_sequence, Sequence, SequenceIndex, SequenceMismatch};
