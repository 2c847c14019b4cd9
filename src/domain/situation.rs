use crate::error::Result;
use crate::git::{HeadRef, Repository};
use git2::Oid;
use std::collections::HashMap;
use std::fmt;

/// Branch reported for a repository without any commits
pub const DEFAULT_BRANCH: &str = "master";

/// Length of `${commit.short}`
pub const SHORT_COMMIT_LENGTH: usize = 7;

/// Parsed long-form `git describe` output: `<tag>-<distance>-g<abbrev>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Describe {
    pub tag: String,
    pub distance: u32,
    pub commit: String,
    raw: String,
}

impl Describe {
    /// Parse a long-form description
    ///
    /// Tags may themselves contain dashes, so the string is split from the right.
    ///
    /// # Returns
    /// * `None` - If the string is not in long format
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.rsplitn(3, '-');
        let commit = parts.next()?.strip_prefix('g')?;
        let distance = parts.next()?.parse::<u32>().ok()?;
        let tag = parts.next()?;

        if tag.is_empty() || commit.is_empty() {
            return None;
        }

        Some(Describe {
            tag: tag.to_string(),
            distance,
            commit: commit.to_string(),
            raw: raw.to_string(),
        })
    }
}

impl fmt::Display for Describe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Snapshot of the repository state a version is derived from.
///
/// Read once per build and never mutated afterwards, so it can be shared
/// across threads freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSituation {
    /// Full 40-hex commit id, all zeros when there is no commit yet
    pub head_commit: String,
    /// Short branch name; `None` for a detached HEAD
    pub head_branch: Option<String>,
    /// Tags whose peeled target is the head commit, sorted by name
    pub head_tags: Vec<String>,
    /// Nearest tag found walking history from HEAD
    pub last_tag: Option<String>,
    pub describe: Option<Describe>,
    /// Working tree has uncommitted or untracked changes
    pub dirty: bool,
}

impl GitSituation {
    /// Reads the current repository state.
    ///
    /// # Arguments
    /// * `repo` - Repository to query
    ///
    /// # Returns
    /// * `Ok(GitSituation)` - The snapshot
    /// * `Err` - If repository metadata cannot be read
    pub fn read<R: Repository + ?Sized>(repo: &R) -> Result<Self> {
        let dirty = repo.is_dirty()?;

        let head = match repo.resolve_head()? {
            Some(head) => head,
            None => {
                return Ok(GitSituation {
                    head_commit: Oid::zero().to_string(),
                    head_branch: Some(DEFAULT_BRANCH.to_string()),
                    head_tags: Vec::new(),
                    last_tag: None,
                    describe: None,
                    dirty,
                })
            }
        };

        let head_branch = match repo.current_branch()? {
            HeadRef::Branch(name) => Some(name),
            HeadRef::Detached => None,
        };

        let tags = repo.peeled_tags()?;
        let mut head_tags: Vec<String> = tags
            .iter()
            .filter(|(_, target)| *target == head)
            .map(|(name, _)| name.clone())
            .collect();
        head_tags.sort();

        let last_tag = find_last_tag(repo, head, &tags)?;

        let glob = last_tag.as_ref().map(|tag| format!("{}*", tag));
        let describe = repo
            .describe(glob.as_deref(), true)?
            .and_then(|raw| Describe::parse(&raw));

        Ok(GitSituation {
            head_commit: head.to_string(),
            head_branch,
            head_tags,
            last_tag,
            describe,
            dirty,
        })
    }
}

/// Abbreviate a commit id for `${commit.short}`
pub fn short_commit(commit: &str) -> &str {
    match commit.char_indices().nth(SHORT_COMMIT_LENGTH) {
        Some((end, _)) => &commit[..end],
        None => commit,
    }
}

/// Walks history from `head` and returns a tag naming the first tagged commit.
///
/// When several tags name that commit the greatest name wins.
fn find_last_tag<R: Repository + ?Sized>(
    repo: &R,
    head: Oid,
    tags: &[(String, Oid)],
) -> Result<Option<String>> {
    if tags.is_empty() {
        return Ok(None);
    }

    let mut tags_by_commit: HashMap<Oid, &str> = HashMap::new();
    for (name, target) in tags {
        let entry = tags_by_commit.entry(*target).or_insert(name.as_str());
        if name.as_str() > *entry {
            *entry = name.as_str();
        }
    }

    for oid in repo.walk_history(head)? {
        if let Some(name) = tags_by_commit.get(&oid) {
            return Ok(Some(name.to_string()));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockRepository;

    fn oid(byte: u8) -> Oid {
        Oid::from_bytes(&[byte; 20]).unwrap()
    }

    #[test]
    fn test_empty_repository() {
        let repo = MockRepository::new();
        let situation = GitSituation::read(&repo).unwrap();

        assert_eq!(situation.head_commit, "0".repeat(40));
        assert_eq!(situation.head_branch.as_deref(), Some(DEFAULT_BRANCH));
        assert!(situation.head_tags.is_empty());
        assert_eq!(situation.last_tag, None);
        assert_eq!(situation.describe, None);
    }

    #[test]
    fn test_branch_checkout() {
        let mut repo = MockRepository::new();
        repo.add_commit(oid(1));
        repo.set_branch("main");

        let situation = GitSituation::read(&repo).unwrap();
        assert_eq!(situation.head_commit, oid(1).to_string());
        assert_eq!(situation.head_branch.as_deref(), Some("main"));
    }

    #[test]
    fn test_detached_head_has_no_branch() {
        let mut repo = MockRepository::new();
        repo.add_commit(oid(1));
        repo.detach();

        let situation = GitSituation::read(&repo).unwrap();
        assert_eq!(situation.head_branch, None);
    }

    #[test]
    fn test_head_tags_only_include_head_commit() {
        let mut repo = MockRepository::new();
        repo.add_commit(oid(1));
        repo.add_commit(oid(2));
        repo.add_tag("v1.0.0", oid(1));
        repo.add_tag("v2.0.0", oid(2));
        repo.add_tag("release", oid(2));

        let situation = GitSituation::read(&repo).unwrap();
        assert_eq!(
            situation.head_tags,
            vec!["release".to_string(), "v2.0.0".to_string()]
        );
    }

    #[test]
    fn test_last_tag_walks_to_nearest_ancestor() {
        let mut repo = MockRepository::new();
        repo.add_commit(oid(1));
        repo.add_commit(oid(2));
        repo.add_commit(oid(3));
        repo.add_tag("v1.0.0", oid(1));
        repo.add_tag("v1.1.0", oid(2));

        let situation = GitSituation::read(&repo).unwrap();
        assert!(situation.head_tags.is_empty());
        assert_eq!(situation.last_tag.as_deref(), Some("v1.1.0"));
    }

    #[test]
    fn test_last_tag_tie_picks_greatest_name() {
        let mut repo = MockRepository::new();
        repo.add_commit(oid(1));
        repo.add_commit(oid(2));
        repo.add_tag("v1.0.0", oid(1));
        repo.add_tag("v1.0.0-rc1", oid(1));

        let situation = GitSituation::read(&repo).unwrap();
        assert_eq!(situation.last_tag.as_deref(), Some("v1.0.0-rc1"));
    }

    #[test]
    fn test_last_tag_ignores_tags_outside_history() {
        let mut repo = MockRepository::new();
        repo.add_commit(oid(1));
        repo.add_commit(oid(2));
        repo.set_head(oid(1));
        repo.add_tag("v2.0.0", oid(2));

        let situation = GitSituation::read(&repo).unwrap();
        assert_eq!(situation.last_tag, None);
    }

    #[test]
    fn test_describe_is_parsed() {
        let mut repo = MockRepository::new();
        repo.add_commit(oid(1));
        repo.add_tag("v1.0.0", oid(1));

        let situation = GitSituation::read(&repo).unwrap();
        let describe = situation.describe.unwrap();
        assert_eq!(describe.tag, "v1.0.0");
        assert_eq!(describe.distance, 0);
        assert_eq!(describe.commit, "0101010");
        assert_eq!(describe.to_string(), "v1.0.0-0-g0101010");
    }

    #[test]
    fn test_describe_is_restricted_to_last_tag() {
        let mut repo = MockRepository::new();
        repo.add_commit(oid(1));
        repo.add_commit(oid(2));
        repo.add_tag("a-build", oid(2));
        repo.add_tag("v2.0.0", oid(2));
        repo.add_commit(oid(3));

        let situation = GitSituation::read(&repo).unwrap();
        assert_eq!(situation.last_tag.as_deref(), Some("v2.0.0"));

        // An unrestricted describe would report "a-build"
        let describe = situation.describe.unwrap();
        assert_eq!(describe.tag, "v2.0.0");
        assert_eq!(describe.distance, 1);
        assert_eq!(describe.commit, "0303030");
    }

    #[test]
    fn test_describe_parse_tag_with_dashes() {
        let describe = Describe::parse("release-2024-01-12-gabcdef1").unwrap();
        assert_eq!(describe.tag, "release-2024-01");
        assert_eq!(describe.distance, 12);
        assert_eq!(describe.commit, "abcdef1");
    }

    #[test]
    fn test_describe_parse_rejects_short_form() {
        assert_eq!(Describe::parse("v1.0.0"), None);
        assert_eq!(Describe::parse("v1.0.0-3"), None);
        assert_eq!(Describe::parse("-3-gabc"), None);
    }

    #[test]
    fn test_dirty_flag() {
        let mut repo = MockRepository::new();
        repo.add_commit(oid(1));
        repo.set_dirty(true);

        assert!(GitSituation::read(&repo).unwrap().dirty);
    }

    #[test]
    fn test_read_failure_propagates() {
        let mut repo = MockRepository::new();
        repo.fail_reads();

        assert!(GitSituation::read(&repo).is_err());
    }

    #[test]
    fn test_short_commit() {
        assert_eq!(short_commit("abc1234def"), "abc1234");
        assert_eq!(short_commit("abc"), "abc");
    }
}
