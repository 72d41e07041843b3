//! Error taxonomy for container operations.
//!
//! Every error here is recoverable at the call boundary. A failed write is
//! a no-op on the container it targeted.

use std::fmt;

use super::models::Key;

/// Result type for container operations
pub type ContainerResult<T> = Result<T, ContainerError>;

/// Error type for container, handle and store operations
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerError {
    /// Read of an absent key - the caller decides the fallback
    NotFound(Key),

    /// Index outside the declared capacity, or negative
    Range { index: i64, size: usize },

    /// Key or index of the wrong kind for the container variant
    Type(String),

    /// Write that the container contract forbids (e.g. growing a fixed array by append)
    ImmutableWrite(String),

    /// Store key pattern could not be parsed or compiled
    InvalidPattern(String),

    /// A recursive structure was reached where a finite tree is required
    Recursion,

    /// A nested write re-entered a reference cell that is already being written
    CyclicReference,

    /// Configuration could not be read or parsed
    Config(String),
}

impl ContainerError {
    /// Short kind name, stable across message changes
    pub fn kind(&self) -> &'static str {
        match self {
            ContainerError::NotFound(_) => "NotFound",
            ContainerError::Range { .. } => "RangeError",
            ContainerError::Type(_) => "TypeError",
            ContainerError::ImmutableWrite(_) => "ImmutableWriteError",
            ContainerError::InvalidPattern(_) => "InvalidPattern",
            ContainerError::Recursion => "Recursion",
            ContainerError::CyclicReference => "CyclicReference",
            ContainerError::Config(_) => "ConfigError",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ContainerError::NotFound(_))
    }
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerError::NotFound(key) => write!(f, "Undefined index: {}", key),
            ContainerError::Range { index, size } => {
                write!(f, "Index invalid or out of range: {} (size {})", index, size)
            }
            ContainerError::Type(msg) => write!(f, "Type error: {}", msg),
            ContainerError::ImmutableWrite(msg) => write!(f, "Immutable write: {}", msg),
            ContainerError::InvalidPattern(msg) => write!(f, "Invalid pattern: {}", msg),
            ContainerError::Recursion => write!(f, "Recursive structure detected"),
            ContainerError::CyclicReference => {
                write!(f, "Cannot write through a reference that is already being written")
            }
            ContainerError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ContainerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_range_error() {
        let err = ContainerError::Range { index: -1, size: 0 };
        assert_eq!(err.to_string(), "Index invalid or out of range: -1 (size 0)");
        assert_eq!(err.kind(), "RangeError");
    }

    #[test]
    fn test_not_found_carries_key() {
        let err = ContainerError::NotFound(Key::from("missing"));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Undefined index: missing");
    }
}
