//! Attribute resolution over a graph.

pub mod cache;
pub mod details;
pub mod resolver;

pub use cache::{ObjectKey, ResolutionCache};
pub use details::{AttributeCandidate, AttributeMap, CandidateSource, MarkupDetails};
pub use resolver::CascadeResolver;
