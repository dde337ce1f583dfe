//! Per-process state context
//!
//! Built once at the entry point and passed down; every store created from
//! it shares the state directory, clock, and session scope.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::store::document::CacheDocument;
use crate::store::session::{SessionScopedStore, StoreLimits};
use crate::utils::{Clock, short_digest};

const STATE_DIR_ENV: &str = "CCGUARD_STATE_DIR";

/// Identifies one assistant run, usually by its transcript path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct SessionKey(String);

impl SessionKey {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Compose with a process group so a parent and its children share
    /// state while unrelated concurrent runs stay apart.
    pub(crate) fn with_process_group(self, pgid: Option<u32>) -> Self {
        match pgid {
            Some(pgid) => Self(format!("{}#pg{}", self.0, pgid)),
            None => self,
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }

    /// Stable short digest, used to name per-key files
    pub(crate) fn digest(&self) -> String {
        short_digest(&self.0, 16)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub(crate) struct StateContext {
    state_dir: PathBuf,
    clock: Arc<dyn Clock>,
    session: Option<SessionKey>,
}

impl StateContext {
    pub(crate) fn new(state_dir: PathBuf, clock: Arc<dyn Clock>) -> Self {
        Self {
            state_dir,
            clock,
            session: None,
        }
    }

    pub(crate) fn with_session(mut self, key: SessionKey) -> Self {
        self.session = Some(key);
        self
    }

    pub(crate) fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Store for `file_name` scoped to this context's session
    pub(crate) fn store<D: CacheDocument>(
        &self,
        file_name: &str,
        limits: StoreLimits,
    ) -> SessionScopedStore<D> {
        self.store_for(file_name, limits, self.session.as_ref())
    }

    /// Store for `file_name` scoped to an explicit key
    pub(crate) fn store_for<D: CacheDocument>(
        &self,
        file_name: &str,
        limits: StoreLimits,
        key: Option<&SessionKey>,
    ) -> SessionScopedStore<D> {
        let mut store =
            SessionScopedStore::new(self.state_dir.join(file_name), limits, self.clock.clone());
        if let Some(key) = key {
            store.set_session(key.as_str());
        }
        store
    }
}

/// Resolve the state directory: explicit flag, then env, then config, then
/// `~/.cache/ccguard`.
pub(crate) fn resolve_state_dir(flag: Option<&Path>, config: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = flag {
        return Some(dir.to_path_buf());
    }
    if let Some(dir) = std::env::var_os(STATE_DIR_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    if let Some(dir) = config {
        return Some(dir.to_path_buf());
    }
    let home = dirs::home_dir()?;
    Some(home.join(".cache").join("ccguard"))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use super::{SessionKey, StateContext};
    use crate::utils::ManualClock;

    pub(crate) const TEST_START_MS: i64 = 1_750_000_000_000;

    /// Context over a fresh temp dir with a manual clock and session "run-1"
    pub(crate) fn test_context() -> (tempfile::TempDir, Arc<ManualClock>, StateContext) {
        let dir = tempfile::tempdir().expect("temp dir");
        let clock = Arc::new(ManualClock::new(TEST_START_MS));
        let ctx = StateContext::new(dir.path().to_path_buf(), clock.clone())
            .with_session(SessionKey::new("run-1"));
        (dir, clock, ctx)
    }
}
