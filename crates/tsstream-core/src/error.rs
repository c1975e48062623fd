//! Module: error
//! Responsibility: structured, classified engine errors.
//! Does not own: transport-level error formatting; that is the host's job.
//! Boundary: every fallible path in this crate returns `EngineError`.

use std::fmt;
use thiserror::Error as ThisError;

///
/// EngineError
///
/// Structured runtime error with a stable classification. Every command
/// aborts synchronously on the first error; there is no partial rollback
/// inside the engine (see the concurrency model in the crate docs).
///

#[derive(Debug, ThisError)]
#[error("{class}: {message}")]
pub struct EngineError {
    pub class: ErrorClass,
    pub message: String,
}

impl EngineError {
    #[must_use]
    pub fn argument(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Argument,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn lookup(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Lookup,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn collaborator(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Collaborator,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invariant(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::InvariantViolation,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_argument(&self) -> bool {
        matches!(self.class, ErrorClass::Argument)
    }
}

///
/// ErrorClass
///
/// Stable classification used by embedders to decide retry/log policy.
/// Not meant to encode every failure shape; see `EngineError::message` for
/// the human-readable detail.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// Missing/wrong-shaped arguments, malformed filter or aggregation
    /// grammar, conflicting options.
    Argument,
    /// Unknown command name.
    Lookup,
    /// The stream collaborator rejected a read or write.
    Collaborator,
    /// Storage returned data that violates an engine invariant (e.g. two
    /// entries for a unique id). Indicates corruption, not caller error.
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Argument => "argument_error",
            Self::Lookup => "lookup_error",
            Self::Collaborator => "collaborator_error",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
