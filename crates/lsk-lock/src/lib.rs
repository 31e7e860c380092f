//! Duplicate-booking lock — atomic "acquire-if-absent with TTL".
//!
//! # Invariants
//!
//! - **Acquire is atomic.** [`LockService::acquire`] is a single
//!   set-if-absent operation; two concurrent callers for the same key can
//!   never both observe `true`.
//! - **Every key expires.** A crashed holder never wedges a key: the TTL
//!   reclaims it. Dropping a [`LockGuard`] without calling
//!   [`LockGuard::release`] leans on the same mechanism.
//! - **No silent unsynchronized mode.** There is no "lock service absent"
//!   degrade path. Callers that want single-node semantics wire
//!   [`LocalLockService`] explicitly; it honors the same contract.
//!
//! The create-order path serializes on `order:create:{resource}:{tenant}`
//! so that two concurrent requests for the same pair cannot both pass the
//! "no existing open order" check before either commits.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

/// Poll interval while waiting for a contended key.
const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Key scheme for the create-order critical section.
pub fn order_create_key(resource_id: i64, tenant_uid: i64) -> String {
    format!("order:create:{resource_id}:{tenant_uid}")
}

// ---------------------------------------------------------------------------
// LockError
// ---------------------------------------------------------------------------

/// Why a lock operation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// The wait window elapsed without winning the key. Retryable.
    Timeout { key: String },
    /// The lock backend could not be reached. Callers must NOT proceed
    /// unsynchronized; this propagates as an external-dependency failure.
    Unavailable(String),
}

impl std::fmt::Display for LockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockError::Timeout { key } => write!(f, "lock wait timed out: {key}"),
            LockError::Unavailable(msg) => write!(f, "lock service unavailable: {msg}"),
        }
    }
}

impl std::error::Error for LockError {}

// ---------------------------------------------------------------------------
// LockService
// ---------------------------------------------------------------------------

/// External coordination primitive: atomic set-if-absent with a TTL, plus
/// release. Backends are expected to provide at least the consistency of a
/// single-writer compare-and-set per key.
#[async_trait]
pub trait LockService: Send + Sync {
    /// Try to take `key` for `ttl`. Returns `true` iff this caller now
    /// holds it. Never blocks beyond one backend round-trip.
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<bool, LockError>;

    /// Drop `key`. Releasing a key that is not held is a no-op.
    async fn release(&self, key: &str) -> Result<(), LockError>;
}

// ---------------------------------------------------------------------------
// LockGuard
// ---------------------------------------------------------------------------

/// A held key. Call [`release`][LockGuard::release] on both the success and
/// the failure path of the protected section; if the guard is dropped
/// without release, the TTL reclaims the key.
pub struct LockGuard {
    svc: Arc<dyn LockService>,
    key: String,
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("key", &self.key).finish()
    }
}

impl LockGuard {
    /// The key this guard holds.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release the key. A backend failure here is logged and swallowed —
    /// the TTL bounds the damage, and the protected section has already
    /// completed.
    pub async fn release(self) {
        if let Err(e) = self.svc.release(&self.key).await {
            tracing::warn!(key = %self.key, error = %e, "lock release failed; TTL will reclaim");
        }
    }
}

/// Poll for `key` every 100 ms over a bounded `wait` window.
///
/// # Errors
/// [`LockError::Timeout`] when the window elapses without winning the key;
/// [`LockError::Unavailable`] when the backend itself fails.
pub async fn acquire_with_wait(
    svc: Arc<dyn LockService>,
    key: &str,
    wait: Duration,
    ttl: Duration,
) -> Result<LockGuard, LockError> {
    let deadline = Instant::now() + wait;
    loop {
        if svc.acquire(key, ttl).await? {
            return Ok(LockGuard {
                svc,
                key: key.to_string(),
            });
        }
        if Instant::now() >= deadline {
            return Err(LockError::Timeout {
                key: key.to_string(),
            });
        }
        tokio::time::sleep(RETRY_INTERVAL).await;
    }
}

// ---------------------------------------------------------------------------
// LocalLockService
// ---------------------------------------------------------------------------

/// In-process implementation of [`LockService`].
///
/// This is the explicit single-node configuration, not a fallback: a
/// deployment that spans processes must wire a shared backend instead.
/// Expired keys are treated as absent on the next acquire, so a crashed
/// holder cannot wedge a key.
#[derive(Default)]
pub struct LocalLockService {
    held: Mutex<HashMap<String, Instant>>,
}

impl LocalLockService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockService for LocalLockService {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<bool, LockError> {
        let mut held = self.held.lock().await;
        let now = Instant::now();
        match held.get(key) {
            Some(deadline) if *deadline > now => Ok(false),
            _ => {
                held.insert(key.to_string(), now + ttl);
                Ok(true)
            }
        }
    }

    async fn release(&self, key: &str) -> Result<(), LockError> {
        self.held.lock().await.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
