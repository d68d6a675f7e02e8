//! Resolution orchestration and the TTL cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use clipforge_core::{Clock, Platform, SystemClock};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::env::{EnvProvider, SystemEnv};
use crate::fs::{FsProvider, SystemFs};
use crate::search::CandidateSearch;
use crate::types::{Attempt, AttemptOutcome, ResolveError, ResolvedExecutable, Strategy};
use crate::verify::{CommandLocator, ProcessVerifier, SystemLocator, Verifier};

/// Default cache lifetime for resolutions.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
/// Default bound on each verification subprocess.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Cache key: command name plus the normalized custom-path set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    name: String,
    custom_paths: Vec<PathBuf>,
}

impl CacheKey {
    fn new(name: &str, custom_paths: &[PathBuf]) -> Self {
        let mut custom_paths = custom_paths.to_vec();
        custom_paths.sort();
        custom_paths.dedup();
        Self {
            name: name.to_string(),
            custom_paths,
        }
    }
}

/// One cached resolution, positive or negative.
#[derive(Debug, Clone)]
struct ExecutableRecord {
    outcome: Result<ResolvedExecutable, ResolveError>,
    stored_at: Instant,
}

/// Counters exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverStats {
    /// Full multi-strategy probes (one per cache miss).
    pub strategy_runs: u64,
    /// Verification subprocesses started.
    pub verifications: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

#[derive(Debug, Default)]
struct Counters {
    strategy_runs: AtomicU64,
    verifications: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ResolverStats {
        ResolverStats {
            strategy_runs: self.strategy_runs.load(Ordering::Relaxed),
            verifications: self.verifications.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }
}

/// Multi-strategy executable resolver with verification and a TTL cache.
///
/// Search order for a bare name:
/// 1. Caller-supplied custom paths, then curated install locations
/// 2. Directories of `PATH`
/// 3. The native locator (`which` / `where`)
/// 4. Version-manager directories, newest version first
///
/// An absolute name is checked directly and falls back to its basename.
/// Only candidates that pass verification are accepted.
pub struct ExecutableResolver {
    env: Arc<dyn EnvProvider>,
    fs: Arc<dyn FsProvider>,
    verifier: Arc<dyn Verifier>,
    locator: Arc<dyn SystemLocator>,
    clock: Arc<dyn Clock>,
    platform: Platform,
    ttl: Duration,
    cache: Mutex<HashMap<CacheKey, ExecutableRecord>>,
    counters: Counters,
}

impl Default for ExecutableResolver {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_VERIFY_TIMEOUT)
    }
}

impl ExecutableResolver {
    /// Resolver wired to the real host.
    pub fn new(ttl: Duration, verify_timeout: Duration) -> Self {
        Self {
            env: Arc::new(SystemEnv),
            fs: Arc::new(SystemFs),
            verifier: Arc::new(ProcessVerifier::new(verify_timeout)),
            locator: Arc::new(CommandLocator::new(verify_timeout)),
            clock: Arc::new(SystemClock),
            platform: Platform::current(),
            ttl,
            cache: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    #[must_use]
    pub fn with_env(mut self, env: Arc<dyn EnvProvider>) -> Self {
        self.env = env;
        self
    }

    #[must_use]
    pub fn with_fs(mut self, fs: Arc<dyn FsProvider>) -> Self {
        self.fs = fs;
        self
    }

    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn Verifier>) -> Self {
        self.verifier = verifier;
        self
    }

    #[must_use]
    pub fn with_locator(mut self, locator: Arc<dyn SystemLocator>) -> Self {
        self.locator = locator;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub const fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub const fn platform(&self) -> Platform {
        self.platform
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Resolve `name` to a verified executable path.
    ///
    /// Positive and negative results are cached per (name, custom-path set)
    /// for the configured TTL.
    pub async fn resolve(
        &self,
        name: &str,
        custom_paths: &[PathBuf],
    ) -> Result<ResolvedExecutable, ResolveError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ResolveError::EmptyCommand);
        }

        let key = CacheKey::new(name, custom_paths);
        if let Some(cached) = self.lookup(&key) {
            Counters::bump(&self.counters.cache_hits);
            debug!(name = %name, "Executable resolution served from cache");
            return cached.map(|mut hit| {
                hit.from_cache = true;
                hit
            });
        }
        Counters::bump(&self.counters.cache_misses);

        let outcome = self.probe(name, custom_paths).await;
        match &outcome {
            Ok(hit) => info!(
                name = %name,
                path = %hit.path.display(),
                strategy = %hit.strategy,
                "Resolved executable"
            ),
            Err(e) => warn!(name = %name, error = %e, "Executable not found"),
        }

        self.lock_cache().insert(
            key,
            ExecutableRecord {
                outcome: outcome.clone(),
                stored_at: self.clock.now(),
            },
        );
        outcome
    }

    /// Drop every cached entry for `name`, whatever its custom paths.
    pub fn invalidate(&self, name: &str) {
        self.lock_cache().retain(|key, _| key.name != name);
    }

    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    pub fn stats(&self) -> ResolverStats {
        self.counters.snapshot()
    }

    fn lookup(&self, key: &CacheKey) -> Option<Result<ResolvedExecutable, ResolveError>> {
        let now = self.clock.now();
        let mut cache = self.lock_cache();
        let fresh = cache
            .get(key)
            .map(|record| now.duration_since(record.stored_at) < self.ttl)?;
        if fresh {
            cache.get(key).map(|record| record.outcome.clone())
        } else {
            cache.remove(key);
            None
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, HashMap<CacheKey, ExecutableRecord>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run every strategy in order until a candidate verifies.
    async fn probe(
        &self,
        name: &str,
        custom_paths: &[PathBuf],
    ) -> Result<ResolvedExecutable, ResolveError> {
        Counters::bump(&self.counters.strategy_runs);

        let mut attempts = Vec::new();
        let mut warnings = Vec::new();
        let mut tried = Vec::new();
        let mut command = name;

        let as_path = Path::new(name);
        if as_path.is_absolute() {
            tried.push(Strategy::Direct);
            let (outcome, version) = self.check(as_path).await;
            attempts.push(Attempt {
                candidate: as_path.to_path_buf(),
                strategy: Strategy::Direct,
                outcome: outcome.clone(),
            });
            if let Some(version) = version {
                return Ok(hit(name, as_path, Strategy::Direct, version, attempts, warnings));
            }

            let Some(basename) = as_path.file_name().and_then(|n| n.to_str()) else {
                return Err(ResolveError::not_found(name, tried, attempts));
            };
            warnings.push(format!(
                "Absolute path '{name}' failed ({outcome}), falling back to basename '{basename}'"
            ));
            warn!(path = %name, basename = %basename, "Absolute executable path unusable");
            command = basename;
        }

        for strategy in Strategy::SEARCH_ORDER {
            tried.push(strategy);
            for candidate in self.candidates(strategy, command, custom_paths).await {
                if attempts.iter().any(|a: &Attempt| a.candidate == candidate) {
                    continue;
                }
                let (outcome, version) = self.check(&candidate).await;
                debug!(
                    candidate = %candidate.display(),
                    strategy = %strategy,
                    outcome = %outcome,
                    "Checked executable candidate"
                );
                attempts.push(Attempt {
                    candidate: candidate.clone(),
                    strategy,
                    outcome,
                });
                if let Some(version) = version {
                    return Ok(hit(name, &candidate, strategy, version, attempts, warnings));
                }
            }
        }

        Err(ResolveError::not_found(name, tried, attempts))
    }

    async fn candidates(
        &self,
        strategy: Strategy,
        command: &str,
        custom_paths: &[PathBuf],
    ) -> Vec<PathBuf> {
        let search = CandidateSearch::new(self.env.as_ref(), self.fs.as_ref(), self.platform);
        match strategy {
            Strategy::Direct => Vec::new(),
            Strategy::CuratedFallback => search.curated(command, custom_paths),
            Strategy::PathScan => search.path_scan(command),
            Strategy::SystemLocator => self.locator.locate(command).await.into_iter().collect(),
            Strategy::VersionManager => search.version_managers(command),
        }
    }

    /// Filesystem check, then the version query. Returns the version on success.
    async fn check(&self, candidate: &Path) -> (AttemptOutcome, Option<String>) {
        let outcome = self.fs.check_executable(candidate);
        if outcome != AttemptOutcome::Ok {
            return (outcome, None);
        }

        Counters::bump(&self.counters.verifications);
        match self.verifier.verify(candidate).await {
            Ok(version) => (AttemptOutcome::Ok, Some(version)),
            Err(e) => (AttemptOutcome::VerificationFailed(e.to_string()), None),
        }
    }

}

fn hit(
    name: &str,
    path: &Path,
    strategy: Strategy,
    version: String,
    attempts: Vec<Attempt>,
    warnings: Vec<String>,
) -> ResolvedExecutable {
    ResolvedExecutable {
        name: name.to_string(),
        path: path.to_path_buf(),
        strategy,
        version,
        resolved_at: Utc::now(),
        attempts,
        warnings,
        from_cache: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::StaticEnv;
    use crate::fs::MockFs;
    use crate::verify::{MockSystemLocator, MockVerifier, VerifyError};
    use clipforge_core::ManualClock;

    fn no_locator() -> MockSystemLocator {
        let mut locator = MockSystemLocator::new();
        locator.expect_locate().returning(|_| None);
        locator
    }

    fn resolver(env: StaticEnv, fs: MockFs, verifier: MockVerifier) -> ExecutableResolver {
        ExecutableResolver::default()
            .with_env(Arc::new(env))
            .with_fs(Arc::new(fs))
            .with_verifier(Arc::new(verifier))
            .with_locator(Arc::new(no_locator()))
            .with_platform(Platform::Linux)
    }

    #[tokio::test]
    async fn test_resolve_in_path() {
        let env = StaticEnv::from([("PATH", "/nowhere:/work/bin")]);
        let fs = MockFs::new().with_executable("/work/bin/npx");
        let mut verifier = MockVerifier::new();
        verifier
            .expect_verify()
            .times(1)
            .returning(|_| Ok("10.2.4".to_string()));

        let resolved = resolver(env, fs, verifier).resolve("npx", &[]).await.unwrap();

        assert_eq!(resolved.path, PathBuf::from("/work/bin/npx"));
        assert_eq!(resolved.strategy, Strategy::PathScan);
        assert_eq!(resolved.version, "10.2.4");
        assert!(!resolved.from_cache);
    }

    #[tokio::test]
    async fn test_second_resolve_within_ttl_skips_verification() {
        let env = StaticEnv::from([("PATH", "/work/bin")]);
        let fs = MockFs::new().with_executable("/work/bin/node");
        let mut verifier = MockVerifier::new();
        verifier
            .expect_verify()
            .times(1)
            .returning(|_| Ok("v20.11.1".to_string()));

        let resolver = resolver(env, fs, verifier);
        let first = resolver.resolve("node", &[]).await.unwrap();
        let second = resolver.resolve("node", &[]).await.unwrap();

        assert_eq!(first.path, second.path);
        assert!(second.from_cache);
        let stats = resolver.stats();
        assert_eq!(stats.strategy_runs, 1);
        assert_eq!(stats.verifications, 1);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_reprobed() {
        let env = StaticEnv::from([("PATH", "/work/bin")]);
        let fs = MockFs::new().with_executable("/work/bin/node");
        let mut verifier = MockVerifier::new();
        verifier
            .expect_verify()
            .times(2)
            .returning(|_| Ok("v20.11.1".to_string()));
        let clock = Arc::new(ManualClock::new());

        let resolver = resolver(env, fs, verifier).with_clock(clock.clone());
        resolver.resolve("node", &[]).await.unwrap();
        clock.advance(DEFAULT_TTL - Duration::from_secs(1));
        resolver.resolve("node", &[]).await.unwrap();
        assert_eq!(resolver.stats().strategy_runs, 1);

        clock.advance(Duration::from_secs(1));
        resolver.resolve("node", &[]).await.unwrap();
        assert_eq!(resolver.stats().strategy_runs, 2);
    }

    #[tokio::test]
    async fn test_negative_result_is_cached() {
        let env = StaticEnv::from([("PATH", "/usr/bin")]);
        let fs = MockFs::new();
        let verifier = MockVerifier::new();
        let mut locator = MockSystemLocator::new();
        locator.expect_locate().times(1).returning(|_| None);

        let resolver = resolver(env, fs, verifier).with_locator(Arc::new(locator));
        let first = resolver.resolve("remotion", &[]).await.unwrap_err();
        let second = resolver.resolve("remotion", &[]).await.unwrap_err();

        assert!(matches!(first, ResolveError::ExecutableNotFound { .. }));
        assert!(matches!(second, ResolveError::ExecutableNotFound { .. }));
        assert_eq!(resolver.stats().strategy_runs, 1);
    }

    #[tokio::test]
    async fn test_custom_path_set_is_part_of_the_key() {
        let env = StaticEnv::from([("PATH", "/usr/bin")]);
        let fs = MockFs::new()
            .with_executable("/usr/bin/npx")
            .with_executable("/custom/bin/npx");
        let mut verifier = MockVerifier::new();
        verifier
            .expect_verify()
            .times(2)
            .returning(|_| Ok("10.0.0".to_string()));

        let resolver = resolver(env, fs, verifier);
        let plain = resolver.resolve("npx", &[]).await.unwrap();
        let custom = resolver
            .resolve("npx", &[PathBuf::from("/custom/bin")])
            .await
            .unwrap();

        assert_eq!(plain.path, PathBuf::from("/usr/bin/npx"));
        assert_eq!(custom.path, PathBuf::from("/custom/bin/npx"));
        assert_eq!(custom.strategy, Strategy::CuratedFallback);
    }

    #[tokio::test]
    async fn test_failed_verification_moves_to_next_candidate() {
        let env = StaticEnv::from([("PATH", "/broken/bin:/good/bin")]);
        let fs = MockFs::new()
            .with_executable("/broken/bin/node")
            .with_executable("/good/bin/node");
        let mut verifier = MockVerifier::new();
        verifier
            .expect_verify()
            .withf(|p| p == Path::new("/broken/bin/node"))
            .returning(|_| Err(VerifyError::ExitStatus("exit status: 1".to_string())));
        verifier
            .expect_verify()
            .withf(|p| p == Path::new("/good/bin/node"))
            .returning(|_| Ok("v22.0.0".to_string()));

        let resolved = resolver(env, fs, verifier).resolve("node", &[]).await.unwrap();

        assert_eq!(resolved.path, PathBuf::from("/good/bin/node"));
        let broken = resolved
            .attempts
            .iter()
            .find(|a| a.candidate == Path::new("/broken/bin/node"))
            .unwrap();
        assert!(matches!(broken.outcome, AttemptOutcome::VerificationFailed(_)));
    }

    #[tokio::test]
    async fn test_system_locator_is_third() {
        let env = StaticEnv::from([("PATH", "/usr/bin")]);
        let fs = MockFs::new().with_executable("/odd/place/npm");
        let mut verifier = MockVerifier::new();
        verifier.expect_verify().returning(|_| Ok("10.0.0".to_string()));
        let mut locator = MockSystemLocator::new();
        locator
            .expect_locate()
            .returning(|_| Some(PathBuf::from("/odd/place/npm")));

        let resolved = resolver(env, fs, verifier)
            .with_locator(Arc::new(locator))
            .resolve("npm", &[])
            .await
            .unwrap();

        assert_eq!(resolved.strategy, Strategy::SystemLocator);
    }

    #[tokio::test]
    async fn test_version_manager_is_last_resort() {
        let env = StaticEnv::from([("HOME", "/home/dev")]);
        let fs = MockFs::new()
            .with_subdirs("/home/dev/.nvm/versions/node", &["v18.0.0", "v20.0.0"])
            .with_executable("/home/dev/.nvm/versions/node/v18.0.0/bin/node")
            .with_executable("/home/dev/.nvm/versions/node/v20.0.0/bin/node");
        let mut verifier = MockVerifier::new();
        verifier.expect_verify().returning(|_| Ok("v20.0.0".to_string()));

        let resolved = resolver(env, fs, verifier).resolve("node", &[]).await.unwrap();

        assert_eq!(resolved.strategy, Strategy::VersionManager);
        assert_eq!(
            resolved.path,
            PathBuf::from("/home/dev/.nvm/versions/node/v20.0.0/bin/node")
        );
    }

    #[tokio::test]
    async fn test_absolute_path_failure_falls_back() {
        let env = StaticEnv::from([("PATH", "/opt/homebrew/bin")]);
        let fs = MockFs::new().with_executable("/opt/homebrew/bin/npx");
        let mut verifier = MockVerifier::new();
        verifier.expect_verify().returning(|_| Ok("10.0.0".to_string()));

        let resolved = resolver(env, fs, verifier)
            .resolve("/usr/local/bin/npx", &[])
            .await
            .unwrap();

        assert_eq!(resolved.path, PathBuf::from("/opt/homebrew/bin/npx"));
        assert!(!resolved.warnings.is_empty());
        assert_eq!(resolved.attempts[0].strategy, Strategy::Direct);
    }

    #[tokio::test]
    async fn test_resolve_empty_command() {
        let resolver = resolver(StaticEnv::default(), MockFs::new(), MockVerifier::new());
        let result = resolver.resolve("  ", &[]).await;
        assert!(matches!(result, Err(ResolveError::EmptyCommand)));
    }

    #[tokio::test]
    async fn test_not_found_reports_every_strategy() {
        let env = StaticEnv::from([("PATH", "/usr/bin")]);
        let fs = MockFs::new().with_non_executable("/usr/bin/npx");
        let resolver = resolver(env, fs, MockVerifier::new());

        let err = resolver.resolve("npx", &[]).await.unwrap_err();
        let ResolveError::ExecutableNotFound {
            strategies,
            attempts,
            ..
        } = err
        else {
            panic!("expected ExecutableNotFound");
        };
        assert_eq!(strategies, Strategy::SEARCH_ORDER.to_vec());
        assert!(
            attempts
                .iter()
                .any(|a| a.outcome == AttemptOutcome::NotExecutable)
        );
    }

    #[tokio::test]
    async fn test_invalidate_forces_reprobe() {
        let env = StaticEnv::from([("PATH", "/usr/bin")]);
        let fs = MockFs::new().with_executable("/usr/bin/node");
        let mut verifier = MockVerifier::new();
        verifier
            .expect_verify()
            .times(2)
            .returning(|_| Ok("v20.0.0".to_string()));

        let resolver = resolver(env, fs, verifier);
        resolver.resolve("node", &[]).await.unwrap();
        resolver.invalidate("node");
        resolver.resolve("node", &[]).await.unwrap();

        assert_eq!(resolver.stats().strategy_runs, 2);
    }
}
