use crate::domain::situation::GitSituation;
use crate::domain::VersioningConfiguration;
use crate::error::Result;
use crate::git::Repository;
use crate::resolver::ConfigurationResolver;
use crate::version::{resolve_version, ResolvedVersion};
use std::sync::{Mutex, OnceLock, PoisonError};

/// One build invocation.
///
/// The configuration and the git situation are each computed on first use
/// and reused for the rest of the session; later calls never re-read files
/// or query the repository again. Modules may resolve against one session
/// from several threads: the first computation of each value runs under
/// `init_lock` and everyone else waits for its result.
pub struct BuildSession<R: Repository> {
    repo: R,
    resolver: ConfigurationResolver,
    configuration: OnceLock<VersioningConfiguration>,
    situation: OnceLock<GitSituation>,
    init_lock: Mutex<()>,
}

/// Fills `cell` with `compute` at most once, even under contention.
/// A failed computation leaves the cell empty so the error reaches every caller.
fn init_once<'a, T>(
    cell: &'a OnceLock<T>,
    lock: &Mutex<()>,
    compute: impl FnOnce() -> Result<T>,
) -> Result<&'a T> {
    if let Some(value) = cell.get() {
        return Ok(value);
    }

    // The lock guards no data, so a poisoned lock is still usable
    let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(value) = cell.get() {
        return Ok(value);
    }

    let value = compute()?;
    Ok(cell.get_or_init(|| value))
}

impl<R: Repository> BuildSession<R> {
    pub fn new(repo: R, resolver: ConfigurationResolver) -> Self {
        BuildSession {
            repo,
            resolver,
            configuration: OnceLock::new(),
            situation: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    /// The session's configuration, resolved on first access
    pub fn configuration(&self) -> Result<&VersioningConfiguration> {
        init_once(&self.configuration, &self.init_lock, || self.resolver.resolve())
    }

    /// The repository snapshot, read on first access
    pub fn git_situation(&self) -> Result<&GitSituation> {
        init_once(&self.situation, &self.init_lock, || {
            GitSituation::read(&self.repo)
        })
    }

    /// Resolves the version for a project declaring `declared_version`.
    ///
    /// When versioning is disabled the declared version is returned as-is
    /// and the repository is never read.
    pub fn project_version(&self, declared_version: &str) -> Result<ResolvedVersion> {
        let configuration = self.configuration()?;
        if !configuration.enabled {
            tracing::info!("git versioning is disabled");
            return Ok(ResolvedVersion::unchanged(declared_version));
        }

        let situation = self.git_situation()?;
        resolve_version(situation, configuration, Some(declared_version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLocation;
    use crate::git::{HeadRef, MockRepository};
    use crate::overrides::OverrideSource;
    use git2::Oid;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Counts HEAD lookups and makes each one slow enough for callers to overlap
    struct CountingRepository {
        inner: MockRepository,
        head_reads: AtomicUsize,
    }

    impl Repository for CountingRepository {
        fn resolve_head(&self) -> Result<Option<Oid>> {
            self.head_reads.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            self.inner.resolve_head()
        }

        fn current_branch(&self) -> Result<HeadRef> {
            self.inner.current_branch()
        }

        fn peeled_tags(&self) -> Result<Vec<(String, Oid)>> {
            self.inner.peeled_tags()
        }

        fn walk_history(&self, from: Oid) -> Result<Vec<Oid>> {
            self.inner.walk_history(from)
        }

        fn describe(&self, match_glob: Option<&str>, long_format: bool) -> Result<Option<String>> {
            self.inner.describe(match_glob, long_format)
        }

        fn is_dirty(&self) -> Result<bool> {
            self.inner.is_dirty()
        }
    }

    fn resolver(root: &TempDir, props: &[(&str, &str)]) -> ConfigurationResolver {
        let props: HashMap<String, String> = props
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConfigurationResolver::new(
            ConfigLocation::for_root(root.path()),
            OverrideSource::with_env(props, |_| None),
        )
    }

    fn repo_on(branch: &str) -> MockRepository {
        let mut repo = MockRepository::new();
        repo.add_commit(Oid::from_bytes(&[0xab; 20]).unwrap());
        repo.set_branch(branch);
        repo
    }

    #[test]
    fn test_project_version_from_branch() {
        let root = TempDir::new().unwrap();
        let session = BuildSession::new(repo_on("main"), resolver(&root, &[]));

        let resolved = session.project_version("1.0.0").unwrap();
        assert_eq!(resolved.version, "main-SNAPSHOT");
    }

    #[test]
    fn test_disabled_returns_declared_version_without_reading_git() {
        let root = TempDir::new().unwrap();
        let mut repo = repo_on("main");
        repo.fail_reads();
        let session = BuildSession::new(repo, resolver(&root, &[("gitVersioning", "false")]));

        let resolved = session.project_version("1.0.0").unwrap();
        assert_eq!(resolved.version, "1.0.0");
        assert!(resolved.properties.is_empty());
    }

    #[test]
    fn test_configuration_is_memoized() {
        let root = TempDir::new().unwrap();
        let session = BuildSession::new(repo_on("main"), resolver(&root, &[]));

        let first = session.configuration().unwrap() as *const VersioningConfiguration;

        // A configuration file appearing later must not be picked up
        let dir = root.path().join(".git-versioning");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), "not = [valid").unwrap();

        let second = session.configuration().unwrap() as *const VersioningConfiguration;
        assert_eq!(first, second);
    }

    #[test]
    fn test_git_situation_is_memoized() {
        let root = TempDir::new().unwrap();
        let session = BuildSession::new(repo_on("main"), resolver(&root, &[]));

        let first = session.git_situation().unwrap() as *const GitSituation;
        let second = session.git_situation().unwrap() as *const GitSituation;
        assert_eq!(first, second);
    }

    #[test]
    fn test_repository_failure_propagates() {
        let root = TempDir::new().unwrap();
        let mut repo = repo_on("main");
        repo.fail_reads();
        let session = BuildSession::new(repo, resolver(&root, &[]));

        let err = session.project_version("1.0.0").unwrap_err();
        assert!(err.to_string().starts_with("Failed to read repository state"));
    }

    #[test]
    fn test_concurrent_callers_read_repository_once() {
        let root = TempDir::new().unwrap();
        let repo = CountingRepository {
            inner: repo_on("main"),
            head_reads: AtomicUsize::new(0),
        };
        let session = BuildSession::new(repo, resolver(&root, &[]));

        let versions: Vec<String> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| session.project_version("1.0").unwrap().version))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(versions.iter().all(|v| v == "main-SNAPSHOT"));
        assert_eq!(session.repo.head_reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_read_is_not_memoized() {
        let root = TempDir::new().unwrap();
        let mut repo = repo_on("main");
        repo.fail_reads();
        let session = BuildSession::new(repo, resolver(&root, &[]));

        assert!(session.git_situation().is_err());
        assert!(session.git_situation().is_err());
    }
}
