use thiserror::Error;

/// A single inbound message that could not be applied. The rest of the batch
/// still runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("message #{index} is not a JSON object")]
    NotAnObject { index: usize },

    #[error("message #{index} has unknown kind '{kind}'")]
    UnknownKind { index: usize, kind: String },

    #[error("message #{index} must carry exactly one kind, found {found}")]
    AmbiguousKind { index: usize, found: usize },

    #[error("message #{index} ({kind}) is malformed: {reason}")]
    Malformed {
        index: usize,
        kind: &'static str,
        reason: String,
    },

    #[error("message #{index} ({kind}) could not be applied: {source}")]
    Apply {
        index: usize,
        kind: &'static str,
        #[source]
        source: DataPathError,
    },
}

/// Resolution failures, scoped to a surface or to a single subtree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("surface '{0}' does not exist")]
    SurfaceNotFound(String),

    #[error("surface '{0}' has no root component")]
    NoRoot(String),

    #[error("component '{id}' is referenced by '{referenced_by}' but was never defined")]
    DanglingReference { id: String, referenced_by: String },

    #[error("component '{id}' is reachable from itself")]
    CyclicGraph { id: String },

    #[error("component '{id}' is nested deeper than {limit} levels")]
    DepthExceeded { id: String, limit: usize },

    #[error("resolution stopped at '{id}' after {limit} nodes")]
    BudgetExceeded { id: String, limit: usize },
}

/// A data-model write that cannot land at the requested path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataPathError {
    #[error("cannot descend through non-container value at '{segment}' in {path}")]
    NotAContainer { path: String, segment: String },

    #[error("invalid array index '{segment}' in {path}")]
    InvalidIndex { path: String, segment: String },

    #[error("array index out of bounds '{segment}' in {path}")]
    IndexOutOfBounds { path: String, segment: String },
}
