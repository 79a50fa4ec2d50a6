use crate::knowledge::KnowledgeType;

/// Errors raised by the merge executors and the committer.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("update requires an existing target id for {knowledge_type}")]
    MissingTargetId { knowledge_type: KnowledgeType },

    #[error("update target not found: {knowledge_type} id {id}")]
    TargetNotFound { knowledge_type: KnowledgeType, id: String },

    #[error("refinement fragment not located: {locate}")]
    FragmentNotFound { locate: String },

    #[error("content shape {got} does not match {expected} store")]
    ContentMismatch {
        expected: KnowledgeType,
        got: &'static str,
    },

    #[error("refinement shape incompatible with {knowledge_type} store")]
    RefinementMismatch { knowledge_type: KnowledgeType },

    #[error("commit requires content for {operation} operation")]
    MissingContent { operation: String },

    #[error("store write failed after merge was determined: {reason}")]
    ApplyFailed { reason: String },
}
