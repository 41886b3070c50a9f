//! Interchange formats.
//!
//! Graphs arrive as JSON [`GraphRecord`]s and resolution results leave as
//! [`ResolutionReport`]s. Records are validated before a graph is built
//! from them.

mod records;
mod report;
mod serialization;
mod validation;

pub use records::GraphRecord;
pub use report::{describe, ObjectRecord, ResolutionReport};
pub use serialization::{graph_from_json, record_from_json, to_json_pretty};
pub use validation::{MAX_CONTAINERS, MAX_NAME_LEN, MAX_TEXT_LEN};
