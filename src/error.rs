//! Crate error type.
//!
//! Errors carry a category (`ErrorKind`) plus a human-readable message. Callers
//! branch on the category; the message is for people.

/// Failure categories surfaced by the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Scaling reference points coincide, so the affine map has no slope.
    DegenerateScaling,
    /// Nothing is left to compare after truncation and the joint finite filter.
    EmptyDomain,
    /// Every candidate of a precision round failed to evaluate.
    AllCandidatesFailed,
    /// A dataset or delta names a parameter missing from the trial values.
    UnknownParameter,
    /// Options or inputs that can never produce a search.
    InvalidConfig,
    /// A required evaluation (seed point, winner) could not be computed.
    EvaluationFailed,
    /// Reading or writing JSON failed.
    Io,
}

#[derive(Clone)]
pub struct CollapseError {
    kind: ErrorKind,
    message: String,
}

impl CollapseError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for CollapseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for CollapseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollapseError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for CollapseError {}

/// Failure reported by a user-supplied evaluation function.
///
/// The search treats this as "candidate not viable" rather than a hard error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError(pub String);

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for EvalError {}
