//! Repository access abstraction layer
//!
//! This module provides a trait-based abstraction over the read-only git
//! queries version resolution depends on, allowing for a real repository
//! implementation and a mock implementation for testing.
//!
//! # Overview
//!
//! The primary abstraction is the [Repository] trait. The concrete
//! implementations include:
//!
//! - [repository::Git2Repository]: A real implementation using the `git2` crate
//! - [mock::MockRepository]: An in-memory implementation for testing
//!
//! None of the operations mutate repository state.
//!
//! ```rust
//! # use git_versioning::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> Result<(), Box<dyn std::error::Error>> {
//! if let Some(head) = repo.resolve_head()? {
//!     let tags = repo.tags_pointing_at(head)?;
//!     println!("{} is tagged {:?}", head, tags);
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::error::Result;
use git2::Oid;

/// Where HEAD currently points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadRef {
    /// HEAD is a symbolic ref to a local branch (short name)
    Branch(String),
    /// HEAD points directly at a commit id
    Detached,
}

/// Read-only git operations needed to build a [crate::domain::GitSituation]
///
/// ## Thread Safety
///
/// All implementors must be `Send + Sync` so independent resolutions can
/// share one repository handle.
///
/// ## Error Handling
///
/// Implementations map underlying failures (corrupt ref store, I/O) to
/// [crate::error::GitVersioningError::RepositoryAccess].
pub trait Repository: Send + Sync {
    /// Resolve HEAD to a commit id
    ///
    /// Returns `Ok(None)` when the repository has no commits yet.
    fn resolve_head(&self) -> Result<Option<Oid>>;

    /// Get the ref HEAD points to
    ///
    /// Only meaningful once [Repository::resolve_head] returned a commit.
    fn current_branch(&self) -> Result<HeadRef>;

    /// Get every tag with the commit it ultimately references
    ///
    /// Annotated tags are peeled to their target commit. Names carry no
    /// `refs/tags/` prefix and are sorted by name.
    fn peeled_tags(&self) -> Result<Vec<(String, Oid)>>;

    /// Walk history from a commit, newest first
    fn walk_history(&self, from: Oid) -> Result<Vec<Oid>>;

    /// Describe HEAD against the nearest reachable tag
    ///
    /// # Arguments
    /// * `match_glob` - Only consider tags matching this glob (all tags if `None`)
    /// * `long_format` - Always render `<tag>-<distance>-g<abbrev>`, even at distance 0
    ///
    /// # Returns
    /// * `Ok(None)` - If no tag is reachable
    fn describe(&self, match_glob: Option<&str>, long_format: bool) -> Result<Option<String>>;

    /// Whether the working tree has uncommitted or untracked changes
    fn is_dirty(&self) -> Result<bool>;

    /// Get the tag names whose peeled target equals `commit`
    fn tags_pointing_at(&self, commit: Oid) -> Result<Vec<String>> {
        Ok(self
            .peeled_tags()?
            .into_iter()
            .filter(|(_, target)| *target == commit)
            .map(|(name, _)| name)
            .collect())
    }
}
