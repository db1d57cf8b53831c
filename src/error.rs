//! Domain error taxonomy for the recommendation pipeline.
//!
//! Per-record failures ([`RecommendError::EmbeddingUnavailable`]) are absorbed by
//! the caller and degrade gracefully; job-level failures abort a single job.

use thiserror::Error;

/// Result alias for recommendation pipeline operations.
pub type Result<T> = std::result::Result<T, RecommendError>;

/// The kind of entity a job references by ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Idp,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Idp => f.write_str("idp"),
        }
    }
}

/// Errors raised by the similarity, ranking, and orchestration layers.
#[derive(Error, Debug)]
pub enum RecommendError {
    /// The embedding provider could not vectorize a skill name.
    #[error("embedding unavailable for skill {skill:?}: {reason}")]
    EmbeddingUnavailable { skill: String, reason: String },

    /// No skills in the catalog; ranking falls back to secondary signals.
    #[error("skill catalog is empty")]
    EmptyCatalog,

    /// A user or IDP referenced by a job no longer exists.
    #[error("{kind} not found: {id}")]
    EntityNotFound { kind: EntityKind, id: String },

    /// Unexpected failure while computing a ranking.
    #[error("computation failed: {0}")]
    Computation(String),

    /// The backing store rejected a read or write.
    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl RecommendError {
    pub fn embedding_unavailable(skill: &str, reason: impl Into<String>) -> Self {
        Self::EmbeddingUnavailable {
            skill: skill.to_string(),
            reason: reason.into(),
        }
    }

    pub fn not_found(kind: EntityKind, id: &str) -> Self {
        Self::EntityNotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Whether re-running the same job could plausibly succeed.
    ///
    /// Store and embedding failures are transient. Missing entities and
    /// computation failures repeat on the same inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_) | Self::EmbeddingUnavailable { .. })
    }
}
