//! Session storage.
//!
//! Each browser session owns one [`SigningSession`] per workflow variant,
//! addressed by [`SessionKey`] and shared through a [`SessionHandle`]. The
//! handle's mutex is the per-session guard every transition runs under.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::domain::session::{SessionId, SigningSession, SigningVariant};
use crate::infra::error::{GatewayError, GatewayResult};

/// Shared, lockable session context.
pub type SessionHandle = Arc<Mutex<SigningSession>>;

/// Lock a session handle, reporting a poisoned lock as an internal error.
pub fn lock_session(handle: &SessionHandle) -> GatewayResult<MutexGuard<'_, SigningSession>> {
    handle
        .lock()
        .map_err(|_| GatewayError::Internal("signing session lock poisoned".to_string()))
}

/// Address of one session slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub id: SessionId,
    pub variant: SigningVariant,
}

impl SessionKey {
    #[must_use]
    pub fn new(id: SessionId, variant: SigningVariant) -> Self {
        Self { id, variant }
    }
}

/// Per-session slot storage used by the coordinator and download gate.
pub trait SessionStore: Send + Sync {
    /// Existing, unexpired session for `key`.
    fn get(&self, key: &SessionKey) -> Option<SessionHandle>;

    /// Existing session for `key`, or a new `Draft` session.
    fn get_or_create(&self, key: &SessionKey) -> SessionHandle;

    /// Drop the session for `key`.
    fn remove(&self, key: &SessionKey);
}

struct StoredSession {
    handle: SessionHandle,
    last_access: Instant,
}

impl StoredSession {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.last_access.elapsed() >= ttl
    }
}

/// In-memory session store with idle expiry.
pub struct InMemorySessionStore {
    sessions: DashMap<SessionKey, StoredSession>,
    ttl: Duration,
    created_at: Instant,
    /// Seconds since `created_at` of the last sweep.
    last_sweep: AtomicU64,
}

/// Minimum spacing between expiry sweeps.
const SWEEP_INTERVAL_SECS: u64 = 60;

impl InMemorySessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
            created_at: Instant::now(),
            last_sweep: AtomicU64::new(0),
        }
    }

    /// Number of stored sessions, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Remove every expired session.
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        let ttl = self.ttl;
        self.sessions.retain(|_, stored| !stored.is_expired(ttl));
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            log::info!("Expired {removed} signing sessions");
        }
        removed
    }

    fn maybe_sweep(&self) {
        let now = self.created_at.elapsed().as_secs();
        let last = self.last_sweep.load(Ordering::Relaxed);
        if now.saturating_sub(last) < SWEEP_INTERVAL_SECS {
            return;
        }
        if self
            .last_sweep
            .compare_exchange(last, now, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
        {
            self.purge_expired();
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, key: &SessionKey) -> Option<SessionHandle> {
        let mut entry = self.sessions.get_mut(key)?;
        if entry.is_expired(self.ttl) {
            drop(entry);
            self.sessions.remove(key);
            log::debug!("Session {} ({}) expired", key.id, key.variant);
            return None;
        }
        entry.last_access = Instant::now();
        Some(entry.handle.clone())
    }

    fn get_or_create(&self, key: &SessionKey) -> SessionHandle {
        if let Some(handle) = self.get(key) {
            return handle;
        }
        self.maybe_sweep();

        let entry = self.sessions.entry(key.clone()).or_insert_with(|| {
            log::info!("Created signing session {} ({})", key.id, key.variant);
            StoredSession {
                handle: Arc::new(Mutex::new(SigningSession::new(
                    key.id.clone(),
                    key.variant,
                ))),
                last_access: Instant::now(),
            }
        });
        entry.handle.clone()
    }

    fn remove(&self, key: &SessionKey) {
        if self.sessions.remove(key).is_some() {
            log::debug!("Removed signing session {} ({})", key.id, key.variant);
        }
    }
}
