//! Registry of open image resolution sessions.
//!
//! Sessions end when the client closes them or after sitting idle for the
//! configured timeout, whichever comes first.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use gondola_core::{ImageResolver, ImageSession};

use crate::metrics::SESSIONS_ACTIVE;

/// A session guarded so that one interaction completes before the next starts.
pub type SharedSession = Arc<Mutex<ImageSession>>;

struct Entry {
    session: SharedSession,
    last_used: Instant,
}

/// Open sessions by id. Sessions never share cache or quota.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Entry>>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Open a session with a fresh cache and a full call budget.
    pub async fn create(&self, resolver: &ImageResolver) -> Uuid {
        let session = resolver.new_session();
        let id = session.id();

        let mut sessions = self.sessions.write().await;
        self.evict_idle(&mut sessions, Instant::now());
        sessions.insert(
            id,
            Entry {
                session: Arc::new(Mutex::new(session)),
                last_used: Instant::now(),
            },
        );
        SESSIONS_ACTIVE.set(sessions.len() as i64);

        info!(session_id = %id, "Session opened");
        id
    }

    /// Look up a session and mark it as used. Idle sessions are not returned.
    pub async fn get(&self, id: Uuid) -> Option<SharedSession> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        self.evict_idle(&mut sessions, now);
        SESSIONS_ACTIVE.set(sessions.len() as i64);

        let entry = sessions.get_mut(&id)?;
        entry.last_used = now;
        Some(Arc::clone(&entry.session))
    }

    /// Close a session, dropping its cache and call history.
    ///
    /// Returns false if no such session was open.
    pub async fn remove(&self, id: Uuid) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(&id).is_some();
        SESSIONS_ACTIVE.set(sessions.len() as i64);

        if removed {
            info!(session_id = %id, "Session closed");
        }
        removed
    }

    /// Close every session idle for longer than the timeout.
    ///
    /// Returns how many sessions were closed.
    pub async fn sweep_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let evicted = self.evict_idle(&mut sessions, Instant::now());
        SESSIONS_ACTIVE.set(sessions.len() as i64);
        evicted
    }

    fn evict_idle(&self, sessions: &mut HashMap<Uuid, Entry>, now: Instant) -> usize {
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let keep = now.duration_since(entry.last_used) <= self.idle_timeout;
            if !keep {
                info!(session_id = %id, "Session expired after inactivity");
            }
            keep
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gondola_core::config::ImageStoreConfig;
    use gondola_core::testing::MockCatalog;
    use gondola_core::{CatalogSnapshot, ImageAcquirer, ResolverSettings};

    fn resolver(dir: &std::path::Path) -> ImageResolver {
        let snapshot = Arc::new(CatalogSnapshot::new(
            Arc::new(MockCatalog::new()),
            Duration::from_secs(60),
        ));
        let store = ImageStoreConfig {
            dir: dir.to_path_buf(),
            ..Default::default()
        };
        let acquirer = Arc::new(ImageAcquirer::new(&store, snapshot).unwrap());
        let settings = ResolverSettings {
            max_results: 4,
            description_qualifier: "embalagem".to_string(),
            quota: Default::default(),
        };
        ImageResolver::new(None, acquirer, settings)
    }

    #[tokio::test]
    async fn test_create_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path());
        let registry = SessionRegistry::new(Duration::from_secs(3600));
        assert!(registry.is_empty().await);

        let id = registry.create(&resolver).await;
        assert_eq!(registry.len().await, 1);

        let session = registry.get(id).await.unwrap();
        assert_eq!(session.lock().await.id(), id);

        assert!(registry.remove(id).await);
        assert!(registry.get(id).await.is_none());
        assert!(!registry.remove(id).await);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path());
        let registry = SessionRegistry::new(Duration::from_secs(3600));

        let a = registry.create(&resolver).await;
        let b = registry.create(&resolver).await;
        assert_ne!(a, b);

        let session_a = registry.get(a).await.unwrap();
        session_a
            .lock()
            .await
            .quota_mut()
            .record_call("\"7891000100103\"", 2, "42_7891000100103");

        let session_b = registry.get(b).await.unwrap();
        assert_eq!(session_a.lock().await.quota().history().len(), 1);
        assert!(session_b.lock().await.quota().history().is_empty());
    }

    #[tokio::test]
    async fn test_idle_session_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path());
        let registry = SessionRegistry::new(Duration::from_millis(20));

        let idle = registry.create(&resolver).await;
        tokio::time::sleep(Duration::from_millis(60)).await;

        // Opening another session sweeps the idle one
        let fresh = registry.create(&resolver).await;
        assert!(registry.get(idle).await.is_none());
        assert!(registry.get(fresh).await.is_some());
        assert_eq!(registry.len().await, 1);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(registry.sweep_idle().await, 1);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_use_keeps_session_alive() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path());
        let registry = SessionRegistry::new(Duration::from_millis(300));

        let id = registry.create(&resolver).await;
        for _ in 0..3 {
            tokio::time::sleep(Duration::from_millis(150)).await;
            assert!(registry.get(id).await.is_some());
        }
        assert_eq!(registry.sweep_idle().await, 0);
    }
}
