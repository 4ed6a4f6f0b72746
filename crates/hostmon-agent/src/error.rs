use hostmon_collector::CollectError;
use hostmon_common::EncodeError;

/// Coarse failure class of one collection iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Sampling,
    Serialization,
    Transmission,
    Config,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Sampling => write!(f, "sampling"),
            FailureKind::Serialization => write!(f, "serialization"),
            FailureKind::Transmission => write!(f, "transmission"),
            FailureKind::Config => write!(f, "config"),
        }
    }
}

/// Errors produced by the agent.
///
/// Everything except [`AgentError::Config`] can occur per iteration and is
/// reported through [`crate::runner::IterationOutcome`] instead of ending the
/// process.
///
/// # Examples
///
/// ```rust
/// use hostmon_agent::error::{AgentError, FailureKind};
///
/// let err = AgentError::Rejected { status: 500, body: "db down".to_string() };
/// assert_eq!(err.kind(), FailureKind::Transmission);
/// assert!(err.to_string().contains("500"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A metric source could not read or parse its OS counters.
    #[error("sampling failed in '{source_name}': {error}")]
    Sampling {
        source_name: String,
        #[source]
        error: CollectError,
    },

    /// The envelope could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(#[from] EncodeError),

    /// The request did not complete: connection refused, DNS, timeout.
    #[error("transmission failed: {0}")]
    Transmission(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("collection endpoint rejected sample: status={status}, body={body}")]
    Rejected { status: u16, body: String },

    /// Invalid configuration detected at startup.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AgentError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AgentError::Sampling { .. } => FailureKind::Sampling,
            AgentError::Serialization(_) => FailureKind::Serialization,
            AgentError::Transmission(_) | AgentError::Rejected { .. } => FailureKind::Transmission,
            AgentError::Config(_) => FailureKind::Config,
        }
    }
}

/// Convenience `Result` alias for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
