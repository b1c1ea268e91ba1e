//! Application state
//!
//! Shared state across all handlers: settings, session manager, catalog
//! engine, cart store, and the voice tool registry.

use std::sync::Arc;
use std::time::Duration;

use sommelier_cart::{CartStore, SqliteCartStore};
use sommelier_catalog::{
    create_pool, ensure_schema, seed_demo_catalog_if_empty, CatalogQueryEngine,
};
use sommelier_config::Settings;
use sommelier_session::AvatarSessionClient;
use sommelier_tools::{create_wine_registry, ToolRegistry};

use crate::session::SessionManager;
use crate::ServerError;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub sessions: Arc<SessionManager>,
    pub engine: Arc<CatalogQueryEngine>,
    pub cart: Arc<dyn CartStore>,
    pub tools: Arc<ToolRegistry>,
    pub avatar: Option<Arc<AvatarSessionClient>>,
}

impl AppState {
    /// Open the stores and build the shared state.
    pub fn new(config: Settings) -> Result<Self, ServerError> {
        let pool = create_pool(&config.catalog.database_path)
            .map_err(|e| ServerError::Internal(format!("catalog open failed: {e}")))?;
        {
            let conn = pool
                .get()
                .map_err(|e| ServerError::Internal(format!("catalog pool: {e}")))?;
            ensure_schema(&conn)?;
            if seed_demo_catalog_if_empty(&conn)? {
                tracing::info!(path = %config.catalog.database_path, "seeded demo catalog");
            }
        }
        let engine = Arc::new(CatalogQueryEngine::new(pool, config.catalog.clone()));

        let cart: Arc<dyn CartStore> = Arc::new(SqliteCartStore::open(&config.cart.database_path)?);

        let tools = Arc::new(create_wine_registry(Arc::clone(&engine)));

        // Without an API key the shop still runs, just without video.
        let avatar = config
            .avatar
            .api_key
            .as_ref()
            .map(|_| Arc::new(AvatarSessionClient::new(config.avatar.clone())));

        let sessions = Arc::new(SessionManager::with_config(
            config.server.max_sessions,
            Duration::from_secs(config.server.session_timeout_secs),
            CLEANUP_INTERVAL,
        ));

        Ok(Self {
            config: Arc::new(config),
            sessions,
            engine,
            cart,
            tools,
            avatar,
        })
    }
}
