//! In-memory session store.
//!
//! Sessions live until they are deleted or sit idle longer than the configured
//! TTL; `spawn_idle_sweep` evicts the idle ones in the background.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::documents::debounce::Debouncer;
use crate::documents::session::DocumentSession;
use crate::errors::AppError;

/// One document: its session behind an async mutex, plus the debouncer that
/// coalesces background relayouts after edits.
pub struct SessionHandle {
    pub id: Uuid,
    session: Mutex<DocumentSession>,
    relayout: Debouncer,
    /// Milliseconds since the store's epoch at the last lookup.
    last_access_ms: AtomicU64,
}

impl SessionHandle {
    pub async fn lock(&self) -> MutexGuard<'_, DocumentSession> {
        self.session.lock().await
    }

    pub fn relayout(&self) -> &Debouncer {
        &self.relayout
    }
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<SessionHandle>>>>,
    debounce: Duration,
    epoch: Instant,
}

impl SessionStore {
    pub fn new(debounce: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            debounce,
            epoch: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    pub async fn insert(&self, session: DocumentSession) -> Arc<SessionHandle> {
        let handle = Arc::new(SessionHandle {
            id: session.id,
            session: Mutex::new(session),
            relayout: Debouncer::new(self.debounce),
            last_access_ms: AtomicU64::new(self.now_ms()),
        });
        self.sessions
            .write()
            .await
            .insert(handle.id, handle.clone());
        handle
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<SessionHandle>, AppError> {
        let handle = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Document {id} not found")))?;
        handle.last_access_ms.store(self.now_ms(), Ordering::Relaxed);
        Ok(handle)
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), AppError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Document {id} not found")))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops every session not looked up within `ttl`. Returns how many went.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let cutoff = self.now_ms().saturating_sub(ttl.as_millis() as u64);
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| handle.last_access_ms.load(Ordering::Relaxed) >= cutoff);
        before - sessions.len()
    }

    /// Evicts idle sessions every quarter TTL (at least once a second).
    pub fn spawn_idle_sweep(&self, ttl: Duration) -> JoinHandle<()> {
        let store = self.clone();
        let period = (ttl / 4).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle(ttl).await;
                if evicted > 0 {
                    let remaining = store.len().await;
                    info!(evicted, remaining, "Evicted idle documents");
                }
            }
        })
    }
}
