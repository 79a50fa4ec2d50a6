/// Errors from the external reasoning / similarity oracles.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle {name} unavailable: {reason}")]
    Unavailable { name: String, reason: String },

    #[error("invalid response from oracle {name}: {reason}")]
    InvalidResponse { name: String, reason: String },
}
