//! Domain-specific errors.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::model::ElementLocation;

/// Stable identifiers for project authoring mistakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectErrorCode {
    MatchOnMetadataIsRestrictedToReferencedItems,
    UnsupportedItemExpression,
    InvalidGlobPattern,
    InvalidItemElement,
}

impl fmt::Display for ProjectErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MatchOnMetadataIsRestrictedToReferencedItems => {
                "MatchOnMetadataIsRestrictedToReferencedItems"
            }
            Self::UnsupportedItemExpression => "UnsupportedItemExpression",
            Self::InvalidGlobPattern => "InvalidGlobPattern",
            Self::InvalidItemElement => "InvalidItemElement",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum EvalError {
    /// The project is malformed; evaluation of the item type cannot continue.
    #[error("{location}: error {code}: {message}")]
    InvalidProjectFile {
        location: ElementLocation,
        code: ProjectErrorCode,
        message: String,
    },
    #[error(transparent)]
    FileSystem(#[from] FileSystemError),
}

impl EvalError {
    pub fn invalid_project(
        location: &ElementLocation,
        code: ProjectErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidProjectFile {
            location: location.clone(),
            code,
            message: message.into(),
        }
    }

    /// Error code when this is a project authoring error.
    pub fn code(&self) -> Option<ProjectErrorCode> {
        match self {
            Self::InvalidProjectFile { code, .. } => Some(*code),
            Self::FileSystem(_) => None,
        }
    }
}

/// Failures raised by a [`crate::infra::fs::FileSystem`] implementation.
#[derive(Debug, Error)]
pub enum FileSystemError {
    #[error("I/O error at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to walk {}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },
    #[error("invalid search pattern '{pattern}'")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

impl FileSystemError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
