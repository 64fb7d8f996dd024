//! Error types for the shadebridge library.

use thiserror::Error;

/// Main error type for stage and export operations.
///
/// Expected-absent data (missing plugs, unauthored attributes, unmapped
/// paths) is represented with `Option`, never with an error. Errors are
/// reserved for structurally invalid requests.
#[derive(Error, Debug)]
pub enum Error {
    /// Path text could not be parsed into an absolute scene path
    #[error("Invalid scene path: {0:?}")]
    InvalidPath(String),

    /// No prim exists at the given path
    #[error("Prim not found: {0}")]
    PrimNotFound(String),

    /// A prim already exists at the path with a conflicting schema type
    #[error("Schema mismatch at {path}: expected {expected}, got {actual}")]
    SchemaMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// Tried to define a typed prim at the pseudo-root
    #[error("Cannot author at the pseudo-root: {0}")]
    RootNotWritable(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Result type alias for shadebridge operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::InvalidPath("foo//bar".to_string());
        assert!(e.to_string().contains("foo//bar"));

        let e = Error::SchemaMismatch {
            path: "/World/mat".to_string(),
            expected: "Material".to_string(),
            actual: "Scope".to_string(),
        };
        assert!(e.to_string().contains("Material"));
        assert!(e.to_string().contains("Scope"));
    }
}
