//! Error types for value conversion and buffer provisioning

use crate::runtime::ValueKind;

/// Errors surfaced by value operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// A conversion was requested that the stored kind cannot satisfy
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// The buffer allocator returned a null pointer
    #[error("buffer allocation of {bytes} bytes failed")]
    AllocationFailed { bytes: usize },
    /// Container access on a handle that holds no container of that kind
    #[error("{kind} is not a {expected}")]
    NotAContainer {
        kind: ValueKind,
        expected: ValueKind,
    },
    /// The held value is already borrowed mutably elsewhere
    #[error("{kind} is already borrowed")]
    Borrowed { kind: ValueKind },
    /// A deep copy reached a value that contains itself
    #[error("{kind} contains itself")]
    Cycle { kind: ValueKind },
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ValueError>;
