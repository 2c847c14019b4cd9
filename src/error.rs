use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unified error type for git-versioning operations
///
/// Every variant names the stage that failed so a build tool can report
/// whether reading the repository, reading configuration or expanding the
/// version template went wrong.
#[derive(Error, Debug)]
pub enum GitVersioningError {
    #[error("Failed to read repository state: {0}")]
    RepositoryAccess(#[from] git2::Error),

    #[error("Failed to read configuration '{}': {message}", path.display())]
    Configuration { path: PathBuf, message: String },

    #[error("Failed to expand version template for '{ref_name}' (pattern '{pattern}'): {message}")]
    VersionResolution {
        pattern: String,
        ref_name: String,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in git-versioning
pub type Result<T> = std::result::Result<T, GitVersioningError>;

impl GitVersioningError {
    /// Create a configuration error naming the offending file
    pub fn configuration(path: impl AsRef<Path>, msg: impl Into<String>) -> Self {
        GitVersioningError::Configuration {
            path: path.as_ref().to_path_buf(),
            message: msg.into(),
        }
    }

    /// Create a resolution error naming the matched rule and ref
    pub fn resolution(
        pattern: impl Into<String>,
        ref_name: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        GitVersioningError::VersionResolution {
            pattern: pattern.into(),
            ref_name: ref_name.into(),
            message: msg.into(),
        }
    }

    /// Create a repository access error from a plain message
    pub fn repository(msg: impl AsRef<str>) -> Self {
        GitVersioningError::RepositoryAccess(git2::Error::from_str(msg.as_ref()))
    }
}
