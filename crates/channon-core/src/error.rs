//! Error types for the orchestrator core.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::RunId;

/// Error type shared by every store, executor and persistence operation.
#[derive(Error, Debug)]
pub enum ChannonError {
    /// A plan with this name is already registered
    #[error("Plan '{name}' already exists")]
    NameConflict { name: String },
    /// No plan is registered under this name
    #[error("Plan '{name}' not found")]
    PlanNotFound { name: String },
    /// The plan exists but has no run with this id
    #[error("Run {id} of plan '{plan}' not found")]
    RunNotFound { plan: String, id: RunId },
    /// File system operation errors
    #[error("File system error at path '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A step could not be spawned or exited unsuccessfully
    #[error("Step '{step}' failed: {reason}")]
    Subprocess { step: String, reason: String },
    /// A persisted document could not be decoded
    #[error("Malformed document at '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// XDG directory specification errors
    #[error("XDG directory error: {0}")]
    XdgDirectory(String),
    /// Invalid input validation errors
    #[error("Invalid input for field '{field}': {reason}")]
    InvalidInput { field: String, reason: String },
    /// Serialization errors while encoding a document
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    /// Runtime and configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Builder for creating input validation errors.
pub struct InvalidInputBuilder {
    field: String,
}

impl InvalidInputBuilder {
    /// Create a new invalid input error builder for a field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Build the error with the given reason.
    pub fn with_reason(self, reason: impl Into<String>) -> ChannonError {
        ChannonError::InvalidInput {
            field: self.field,
            reason: reason.into(),
        }
    }
}

impl ChannonError {
    /// Creates a builder for input validation errors.
    pub fn invalid_input(field: impl Into<String>) -> InvalidInputBuilder {
        InvalidInputBuilder::new(field)
    }

    pub(crate) fn plan_not_found(name: impl Into<String>) -> Self {
        Self::PlanNotFound { name: name.into() }
    }

    pub(crate) fn subprocess(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Subprocess {
            step: step.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is a missing plan or run.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PlanNotFound { .. } | Self::RunNotFound { .. })
    }
}

/// Extension trait attaching the offending path to I/O errors.
pub trait FileSystemResultExt<T> {
    /// Map an I/O error to [`ChannonError::FileSystem`] at `path`.
    fn at_path(self, path: &Path) -> Result<T>;
}

impl<T> FileSystemResultExt<T> for std::result::Result<T, std::io::Error> {
    fn at_path(self, path: &Path) -> Result<T> {
        self.map_err(|source| ChannonError::FileSystem {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, ChannonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_path_keeps_path_and_source() {
        let err = Err::<(), _>(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "nope",
        ))
        .at_path(Path::new("/plans/deploy/plan.json"))
        .unwrap_err();

        match err {
            ChannonError::FileSystem { path, source } => {
                assert_eq!(path, PathBuf::from("/plans/deploy/plan.json"));
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_not_found_classification() {
        assert!(ChannonError::plan_not_found("x").is_not_found());
        assert!(ChannonError::RunNotFound {
            plan: "x".to_string(),
            id: 3
        }
        .is_not_found());
        assert!(!ChannonError::NameConflict {
            name: "x".to_string()
        }
        .is_not_found());
    }

    #[test]
    fn test_invalid_input_builder() {
        let err = ChannonError::invalid_input("name").with_reason("must not be empty");
        assert_eq!(
            err.to_string(),
            "Invalid input for field 'name': must not be empty"
        );
    }
}
