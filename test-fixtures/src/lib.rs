//! Deterministic doubles and builders shared by integration tests across the
//! workspace: an in-memory knowledge store, scripted oracles, and item
//! builders.

pub mod builders;
pub mod oracles;
pub mod store;

pub use builders::{preference_item, procedure_item, rule_item};
pub use oracles::{PairSimilarity, ScriptedClassifier};
pub use store::InMemoryStore;

/// Initialize tracing for a test binary. Safe to call from every test; only
/// the first call wins.
pub fn init_test_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
