//! Session-scoped, file-persisted document store
//!
//! One JSON file per cache kind. The file records which session wrote it; a
//! store scoped to any other session reads it as empty until its next write
//! re-anchors the file.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::StoreError;
use crate::store::document::CacheDocument;
use crate::utils::{Clock, sha256_hex};

/// Result of a best-effort write. Callers are free to ignore the error.
pub(crate) type Advisory = Result<(), StoreError>;

/// Expiry and size bounds applied on every read and write
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StoreLimits {
    pub(crate) ttl: Option<Duration>,
    pub(crate) max_entries: Option<usize>,
}

impl StoreLimits {
    pub(crate) const UNBOUNDED: StoreLimits = StoreLimits {
        ttl: None,
        max_entries: None,
    };

    pub(crate) const fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl: Some(ttl),
            max_entries: Some(max_entries),
        }
    }

    pub(crate) const fn ttl_only(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            max_entries: None,
        }
    }
}

#[derive(Deserialize)]
struct Envelope<D> {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    user_message_hash: Option<String>,
    #[serde(flatten)]
    document: D,
}

#[derive(Serialize)]
struct EnvelopeRef<'a, D> {
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_message_hash: Option<&'a str>,
    #[serde(flatten)]
    document: &'a D,
}

pub(crate) struct SessionScopedStore<D> {
    path: PathBuf,
    limits: StoreLimits,
    clock: Arc<dyn Clock>,
    session: Option<String>,
    _document: PhantomData<fn() -> D>,
}

impl<D: CacheDocument> SessionScopedStore<D> {
    pub(crate) fn new(path: PathBuf, limits: StoreLimits, clock: Arc<dyn Clock>) -> Self {
        Self {
            path,
            limits,
            clock,
            session: None,
            _document: PhantomData,
        }
    }

    /// Scope every later read and write to `id`
    pub(crate) fn set_session(&mut self, id: impl Into<String>) {
        self.session = Some(id.into());
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Current document, bounded. Missing, unreadable, malformed, or
    /// foreign-session files all read as the default document.
    pub(crate) fn load(&self) -> D {
        let mut document = self
            .read_envelope()
            .map(|e| e.document)
            .unwrap_or_default();
        self.bound(&mut document);
        document
    }

    /// Replace the persisted document for the active session
    pub(crate) fn save(&self, document: &D) -> Advisory {
        let hash = self.read_envelope().and_then(|e| e.user_message_hash);
        self.write(document, hash.as_deref())
    }

    /// Read, transform, bound, write. The only mutation path caches use.
    pub(crate) fn update<F>(&self, transform: F) -> D
    where
        F: FnOnce(D) -> D,
    {
        let (mut current, hash) = match self.read_envelope() {
            Some(envelope) => (envelope.document, envelope.user_message_hash),
            None => (D::default(), None),
        };
        self.bound(&mut current);

        let mut next = transform(current);
        self.bound(&mut next);
        let _ = self.write(&next, hash.as_deref());
        next
    }

    pub(crate) fn clear(&self) -> Advisory {
        self.save(&D::default())
    }

    /// Reset all entries when `text` is not the last user message seen.
    /// Returns true when a reset happened.
    pub(crate) fn check_user_message(&self, text: &str) -> bool {
        let hash = sha256_hex(text);
        let remembered = self.read_envelope().and_then(|e| e.user_message_hash);
        if remembered.as_deref() == Some(hash.as_str()) {
            return false;
        }
        tracing::debug!(path = %self.path.display(), "new user message; resetting cache");
        let _ = self.write(&D::default(), Some(&hash));
        true
    }

    fn bound(&self, document: &mut D) {
        if let Some(ttl) = self.limits.ttl {
            let cutoff = self.clock.now_ms() - ttl.as_millis() as i64;
            document.expire_before(cutoff);
        }
        if let Some(max) = self.limits.max_entries {
            document.keep_newest(max);
        }
    }

    fn read_envelope(&self) -> Option<Envelope<D>> {
        let file = File::open(&self.path).ok()?;
        let envelope: Envelope<D> = match serde_json::from_reader(BufReader::new(file)) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::debug!(path = %self.path.display(), error = %err, "discarding malformed cache");
                return None;
            }
        };
        match (&self.session, &envelope.session_id) {
            (Some(active), Some(stored)) if active == stored => Some(envelope),
            (Some(_), _) => None,
            (None, _) => Some(envelope),
        }
    }

    fn write(&self, document: &D, user_message_hash: Option<&str>) -> Advisory {
        let envelope = EnvelopeRef {
            session_id: self.session.as_deref(),
            user_message_hash,
            document,
        };
        let bytes = serde_json::to_vec(&envelope)?;

        let result = atomic_write(&self.path, &bytes);
        if let Err(err) = &result {
            tracing::debug!(error = %err, "cache write skipped");
        }
        result
    }
}

/// Replace `path` as a whole so readers never observe a partial document
fn atomic_write(path: &Path, bytes: &[u8]) -> Advisory {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp = path.with_extension(format!("{}.tmp", std::process::id()));
    if let Err(err) = fs::write(&tmp, bytes).and_then(|_| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(err));
    }
    Ok(())
}
