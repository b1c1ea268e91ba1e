//! Session management
//!
//! Id-keyed map of live conversation controllers with a capacity bound
//! and periodic idle expiry.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use sommelier_cart::CartStore;
use sommelier_catalog::CatalogQueryEngine;
use sommelier_config::{PersonaConfig, SessionPolicy};
use sommelier_session::{AvatarSessionClient, ConversationStateController};

use crate::ServerError;

/// Session manager
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<ConversationStateController>>>,
    max_sessions: usize,
    session_timeout: Duration,
    cleanup_interval: Duration,
}

impl SessionManager {
    pub fn new(max_sessions: usize) -> Self {
        Self::with_config(
            max_sessions,
            Duration::from_secs(900),
            Duration::from_secs(60),
        )
    }

    pub fn with_config(
        max_sessions: usize,
        session_timeout: Duration,
        cleanup_interval: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            session_timeout,
            cleanup_interval,
        }
    }

    /// Start a background task that periodically expires idle sessions.
    ///
    /// Returns a shutdown sender for the task.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = Arc::clone(self);
        let interval = manager.cleanup_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let removed = manager.cleanup_expired().await;
                        if removed > 0 {
                            tracing::info!(
                                removed,
                                remaining = manager.count(),
                                "expired idle sessions"
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("session cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// Create a controller and register it under a fresh id.
    pub async fn create(
        &self,
        persona: PersonaConfig,
        policy: SessionPolicy,
        engine: Arc<CatalogQueryEngine>,
        cart: Arc<dyn CartStore>,
        avatar: Option<Arc<AvatarSessionClient>>,
    ) -> Result<Arc<ConversationStateController>, ServerError> {
        if self.count() >= self.max_sessions {
            self.cleanup_expired().await;
            if self.count() >= self.max_sessions {
                return Err(ServerError::Session("max sessions reached".to_string()));
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let mut controller =
            ConversationStateController::new(&id, persona, policy, engine, cart);
        if let Some(client) = avatar {
            controller = controller.with_avatar(client);
        }
        let controller = Arc::new(controller);
        self.sessions.write().insert(id.clone(), controller.clone());

        tracing::info!(session_id = %id, "created session");
        Ok(controller)
    }

    pub fn get(&self, id: &str) -> Option<Arc<ConversationStateController>> {
        self.sessions.read().get(id).cloned()
    }

    /// Remove and disconnect a session.
    pub async fn remove(&self, id: &str) -> bool {
        let controller = self.sessions.write().remove(id);
        match controller {
            Some(controller) => {
                controller.disconnect("session deleted").await;
                tracing::info!(session_id = %id, "removed session");
                true
            }
            None => false,
        }
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn list(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Disconnect and drop sessions idle past the timeout. Returns how
    /// many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let expired: Vec<(String, Arc<ConversationStateController>)> = {
            let mut sessions = self.sessions.write();
            let ids: Vec<String> = sessions
                .iter()
                .filter(|(_, s)| s.idle_for() > self.session_timeout)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| sessions.remove(&id).map(|s| (id, s)))
                .collect()
        };

        let removed = expired.len();
        for (id, controller) in expired {
            controller.disconnect("idle timeout").await;
            tracing::info!(session_id = %id, "expired session");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sommelier_cart::SqliteCartStore;
    use sommelier_catalog::{create_pool, ensure_schema};
    use sommelier_config::CatalogConfig;

    fn deps() -> (Arc<CatalogQueryEngine>, Arc<dyn CartStore>) {
        let pool = create_pool(":memory:").unwrap();
        {
            let conn = pool.get().unwrap();
            ensure_schema(&conn).unwrap();
        }
        let engine = Arc::new(CatalogQueryEngine::new(pool, CatalogConfig::default()));
        let cart: Arc<dyn CartStore> = Arc::new(SqliteCartStore::open(":memory:").unwrap());
        (engine, cart)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let manager = SessionManager::new(10);
        let (engine, cart) = deps();
        let controller = manager
            .create(
                PersonaConfig::default(),
                SessionPolicy::default(),
                engine,
                cart,
                None,
            )
            .await
            .unwrap();

        let id = controller.session_id().to_string();
        assert!(manager.get(&id).is_some());
        assert_eq!(manager.count(), 1);
    }

    #[tokio::test]
    async fn test_capacity_bound() {
        let manager = SessionManager::with_config(
            1,
            Duration::from_secs(3600),
            Duration::from_secs(60),
        );
        let (engine, cart) = deps();
        manager
            .create(
                PersonaConfig::default(),
                SessionPolicy::default(),
                engine.clone(),
                cart.clone(),
                None,
            )
            .await
            .unwrap();

        let result = manager
            .create(
                PersonaConfig::default(),
                SessionPolicy::default(),
                engine,
                cart,
                None,
            )
            .await;
        assert!(matches!(result, Err(ServerError::Session(_))));
    }

    #[tokio::test]
    async fn test_remove_disconnects() {
        let manager = SessionManager::new(10);
        let (engine, cart) = deps();
        let controller = manager
            .create(
                PersonaConfig::default(),
                SessionPolicy::default(),
                engine,
                cart,
                None,
            )
            .await
            .unwrap();
        let id = controller.session_id().to_string();

        assert!(manager.remove(&id).await);
        assert!(manager.get(&id).is_none());
        assert!(!manager.remove(&id).await);
    }

    #[tokio::test]
    async fn test_idle_expiry() {
        let manager =
            SessionManager::with_config(10, Duration::from_millis(0), Duration::from_secs(60));
        let (engine, cart) = deps();
        manager
            .create(
                PersonaConfig::default(),
                SessionPolicy::default(),
                engine,
                cart,
                None,
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        let removed = manager.cleanup_expired().await;
        assert_eq!(removed, 1);
        assert_eq!(manager.count(), 0);
    }
}
