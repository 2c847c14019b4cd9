use crate::error::{GitVersioningError, Result};
use crate::git::{HeadRef, Repository};
use git2::Oid;
use std::collections::HashMap;

/// Mock repository for testing without actual git operations
///
/// History is linear: commits are appended oldest first and HEAD is the
/// last commit added unless [MockRepository::set_head] says otherwise.
/// `describe` is derived from the tags the same way `git describe --tags`
/// does: nearest tagged ancestor whose name matches the glob.
pub struct MockRepository {
    commits: Vec<Oid>,
    head: Option<Oid>,
    head_ref: HeadRef,
    tags: HashMap<String, Oid>,
    dirty: bool,
    fail_reads: bool,
}

impl MockRepository {
    /// Create a new mock repository with no commits on `master`
    pub fn new() -> Self {
        MockRepository {
            commits: Vec::new(),
            head: None,
            head_ref: HeadRef::Branch("master".to_string()),
            tags: HashMap::new(),
            dirty: false,
            fail_reads: false,
        }
    }

    /// Append a commit and move HEAD to it
    pub fn add_commit(&mut self, oid: Oid) {
        self.commits.push(oid);
        self.head = Some(oid);
    }

    /// Point HEAD at an existing commit
    pub fn set_head(&mut self, oid: Oid) {
        self.head = Some(oid);
    }

    /// Check out a branch
    pub fn set_branch(&mut self, branch: impl Into<String>) {
        self.head_ref = HeadRef::Branch(branch.into());
    }

    /// Detach HEAD from any branch
    pub fn detach(&mut self) {
        self.head_ref = HeadRef::Detached;
    }

    /// Add a tag pointing to an OID
    pub fn add_tag(&mut self, name: impl Into<String>, oid: Oid) {
        self.tags.insert(name.into(), oid);
    }

    /// Mark the working tree as modified
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Make every query fail as if the ref store were corrupt
    pub fn fail_reads(&mut self) {
        self.fail_reads = true;
    }

    fn check(&self) -> Result<()> {
        if self.fail_reads {
            return Err(GitVersioningError::repository("corrupt ref store"));
        }
        Ok(())
    }
}

/// `git describe --match` globs as used here: a trailing `*` or an exact name
fn glob_matches(glob: &str, name: &str) -> bool {
    match glob.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => name == glob,
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MockRepository {
    fn resolve_head(&self) -> Result<Option<Oid>> {
        self.check()?;
        Ok(self.head)
    }

    fn current_branch(&self) -> Result<HeadRef> {
        self.check()?;
        Ok(self.head_ref.clone())
    }

    fn peeled_tags(&self) -> Result<Vec<(String, Oid)>> {
        self.check()?;
        let mut tags: Vec<_> = self
            .tags
            .iter()
            .map(|(name, oid)| (name.clone(), *oid))
            .collect();
        tags.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(tags)
    }

    fn walk_history(&self, from: Oid) -> Result<Vec<Oid>> {
        self.check()?;
        let position = self
            .commits
            .iter()
            .position(|oid| *oid == from)
            .ok_or_else(|| GitVersioningError::repository(format!("Unknown commit: {}", from)))?;

        Ok(self.commits[..=position].iter().rev().copied().collect())
    }

    fn describe(&self, match_glob: Option<&str>, long_format: bool) -> Result<Option<String>> {
        self.check()?;
        let head = match self.head {
            Some(head) => head,
            None => return Ok(None),
        };

        for (distance, oid) in self.walk_history(head)?.into_iter().enumerate() {
            // Among several candidates on one commit the smallest name is reported
            let tag = self
                .tags
                .iter()
                .filter(|(name, target)| {
                    **target == oid && match_glob.map_or(true, |glob| glob_matches(glob, name))
                })
                .map(|(name, _)| name)
                .min();

            if let Some(tag) = tag {
                if distance == 0 && !long_format {
                    return Ok(Some(tag.clone()));
                }
                let short = head.to_string();
                return Ok(Some(format!("{}-{}-g{}", tag, distance, &short[..7])));
            }
        }

        Ok(None)
    }

    fn is_dirty(&self) -> Result<bool> {
        self.check()?;
        Ok(self.dirty)
    }
}
