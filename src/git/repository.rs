use crate::error::{GitVersioningError, Result};
use crate::git::HeadRef;
use git2::{
    DescribeFormatOptions, DescribeOptions, ErrorClass, ErrorCode, ObjectType, Oid,
    Repository as Git2Repo, Sort, StatusOptions,
};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Wrapper around git2::Repository with our trait interface.
///
/// libgit2 forbids concurrent use of one repository handle, so every
/// operation takes the lock for its whole duration.
pub struct Git2Repository {
    repo: Mutex<Git2Repo>,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Self::from_git2(repo))
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository {
            repo: Mutex::new(repo),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Git2Repo>> {
        self.repo
            .lock()
            .map_err(|_| GitVersioningError::repository("repository handle lock is poisoned"))
    }
}

fn head_commit(repo: &Git2Repo) -> Result<Option<Oid>> {
    match repo.head() {
        Ok(head) => {
            let commit = head.peel_to_commit()?;
            Ok(Some(commit.id()))
        }
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl super::Repository for Git2Repository {
    fn resolve_head(&self) -> Result<Option<Oid>> {
        head_commit(&*self.lock()?)
    }

    fn current_branch(&self) -> Result<HeadRef> {
        let repo = self.lock()?;
        if repo.head_detached()? {
            return Ok(HeadRef::Detached);
        }

        let head = repo.head()?;
        let name = head.shorthand().ok_or_else(|| {
            GitVersioningError::repository("HEAD reference name is not valid UTF-8")
        })?;

        Ok(HeadRef::Branch(name.to_string()))
    }

    fn peeled_tags(&self) -> Result<Vec<(String, Oid)>> {
        let repo = self.lock()?;
        let names = repo.tag_names(None)?;
        let mut tags = Vec::new();

        for tag_name in names.iter().flatten() {
            let reference = repo.find_reference(&format!("refs/tags/{}", tag_name))?;
            let target = reference.peel(ObjectType::Any)?;
            // Tags pointing at trees or blobs never name a commit
            if target.kind() == Some(ObjectType::Commit) {
                tags.push((tag_name.to_string(), target.id()));
            }
        }

        tags.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(tags)
    }

    fn walk_history(&self, from: Oid) -> Result<Vec<Oid>> {
        let repo = self.lock()?;
        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(from)?;

        let mut commits = Vec::new();
        for oid in revwalk {
            commits.push(oid?);
        }

        Ok(commits)
    }

    fn describe(&self, match_glob: Option<&str>, long_format: bool) -> Result<Option<String>> {
        let repo = self.lock()?;
        if head_commit(&repo)?.is_none() {
            return Ok(None);
        }

        let mut desc_opts = DescribeOptions::new();
        desc_opts.describe_tags();
        if let Some(glob) = match_glob {
            desc_opts.pattern(glob);
        }

        let describe = match repo.describe(&desc_opts) {
            Ok(describe) => describe,
            Err(e) if e.code() == ErrorCode::NotFound || e.class() == ErrorClass::Describe => {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        };

        let mut fmt_opts = DescribeFormatOptions::new();
        fmt_opts.always_use_long_format(long_format);

        Ok(Some(describe.format(Some(&fmt_opts))?))
    }

    fn is_dirty(&self) -> Result<bool> {
        let repo = self.lock()?;
        if repo.is_bare() {
            return Ok(false);
        }

        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .include_ignored(false)
            .exclude_submodules(true);

        let statuses = repo.statuses(Some(&mut opts))?;
        Ok(statuses
            .iter()
            .any(|entry| entry.status() != git2::Status::IGNORED))
    }
}
