//! # clipmark - Cascading markup over clips
//!
//! clipmark resolves markup attributes over a graph of containers and
//! relations. Content is a list of clips (ranges of a text origin, regions
//! of an image, nested containers); relations annotate that content, and a
//! relation that endows attributes is a markup rule. Resolution decides,
//! for every atomic unit of content and every container and relation, which
//! value each attribute takes.
//!
//! ## Core Concepts
//!
//! - **Pointer**: An immutable reference to a clip, container, relation end or literal
//! - **Relation**: A named, typed association; with endowments it is a markup rule
//! - **Container**: Ordered content plus the relations annotating it
//! - **Unit**: An indivisible piece of content after partitioning
//! - **Cascade**: Ranking of candidate values by match tier, default-ness and discovery order
//!
//! ## Usage
//!
//! ```rust
//! use clipmark::{CascadeResolver, Container, Graph, ObjectKey, Pointer, Relation, ResolverConfig, Value};
//!
//! let graph = Graph::builder()
//!     .defaults(Container::new("defaults").with_relation(
//!         Relation::new("body-font", Pointer::literal("markup"))
//!             .with_end("container-types", vec![Pointer::literal("article")])
//!             .endow_content("font", "serif"),
//!     ))
//!     .container(
//!         Container::new("doc")
//!             .with_type(Pointer::literal("article"))
//!             .with_clip(Pointer::range("text", 0, 12)),
//!     )
//!     .build()?;
//!
//! let config = ResolverConfig::default();
//! let mut resolver = CascadeResolver::new(&graph, &config);
//! let doc = graph.container_id("doc").unwrap();
//! let keys = resolver.resolve_container(doc);
//! assert_eq!(resolver.definitive(keys[0]).get("font"), Some(&Value::from("serif")));
//! # Ok::<(), clipmark::MarkupError>(())
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]

// Data model
pub mod container;
pub mod error;
pub mod graph;
pub mod pointer;
pub mod relation;
pub mod value;

// Resolution
pub mod cascade;
pub mod config;
pub mod partition;
pub mod rules;

// Interchange and execution
pub mod ir;
pub mod runtime;

// Re-export primary types at crate root for convenience
pub use cascade::{
    AttributeCandidate, AttributeMap, CandidateSource, CascadeResolver, MarkupDetails, ObjectKey, ResolutionCache,
};
pub use config::{ResolverConfig, Vocabulary};
pub use container::Container;
pub use error::{MarkupError, MarkupResult, RuntimeError, ValidationError};
pub use graph::{ContainerId, ContainerNode, Graph, GraphBuilder, GraphFingerprint, RelationId, RelationNode};
pub use partition::Unit;
pub use pointer::{ContainerPointer, LiteralPointer, Pointer, PointerKind, RangePointer, RegionPointer, RelationPointer};
pub use relation::{End, EndRef, Endowment, EndowmentKind, Relation};
pub use rules::{MatchTier, RuleClassifier, ScopeRank, Sequence, SequenceIndex};
pub use value::Value;

// Interchange re-exports
pub use ir::{GraphRecord, ObjectRecord, ResolutionReport};
pub use runtime::{ContainerResolution, PoolConfig, ResolutionPool};
