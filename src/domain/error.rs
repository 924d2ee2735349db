//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors are local usage errors of the tree and type algebra.
/// They are surfaced immediately; nothing in the domain retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("unknown mutation level: {0}")]
    UnknownLevel(String),

    #[error("mutation level {level} needs fields {missing:?} which are not in the table")]
    MissingDependency { level: String, missing: Vec<String> },

    #[error("mismatching mutation levels: {left} and {right}")]
    LevelMismatch { left: String, right: String },

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("key has {requested} levels but only {available} remain below this node")]
    KeyDepthOverflow { requested: usize, available: usize },

    #[error("no branch {branch} at mutation level {level}")]
    BranchNotFound { level: String, branch: String },
}

impl DomainError {
    pub(crate) fn level_mismatch(left: Option<&str>, right: Option<&str>) -> Self {
        Self::LevelMismatch {
            left: left.unwrap_or("none").to_string(),
            right: right.unwrap_or("none").to_string(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
