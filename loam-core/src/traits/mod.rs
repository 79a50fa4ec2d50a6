//! Seams to the outside world: physical knowledge backends and the two
//! external oracles. Everything behind these traits is replaceable; the rest
//! of the workspace only ever sees the trait objects.

mod oracle;
mod store;

pub use oracle::{ClassificationOracle, SimilarityOracle};
pub use store::KnowledgeStore;
