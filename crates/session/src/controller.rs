//! Conversation state controller
//!
//! One controller per voice session. Tool calls arrive on an `mpsc`
//! channel and are dispatched single-flight: at most one catalog query
//! runs at a time, later arrivals queue, and a queued call is superseded
//! by a newer call with the same tool name. Results are applied to the
//! UI state in issuing order and published as `watch` snapshots.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio::task::JoinHandle;

use sommelier_cart::CartStore;
use sommelier_catalog::{CatalogQueryEngine, UseCase};
use sommelier_config::{PersonaConfig, SessionPolicy};
use sommelier_core::{ActiveFilters, CartItem, ShopState, ToolCallEvent, ToolName, UiState, Wine};

use crate::avatar::{AvatarSession, AvatarSessionClient};
use crate::state::{SessionEvent, SessionState};
use crate::SessionError;

const CALL_CHANNEL_CAPACITY: usize = 32;
const EVENT_CHANNEL_CAPACITY: usize = 100;
/// How many listing rows go onto the discussed shelf.
const LISTING_SHELF_SUBSET: usize = 5;

/// What a completed catalog query does to the UI state.
enum QueryOutcome {
    /// Filter-replacing ranked results (search, recommend).
    Ranked {
        filters: ActiveFilters,
        wines: Vec<Wine>,
    },
    /// A single resolved wine (get), filters untouched.
    Single(Wine),
    /// Catalog listing, shelf only.
    Listing(Vec<Wine>),
}

impl QueryOutcome {
    fn count(&self) -> usize {
        match self {
            QueryOutcome::Ranked { wines, .. } => wines.len(),
            QueryOutcome::Single(_) => 1,
            QueryOutcome::Listing(wines) => wines.len(),
        }
    }
}

/// Per-session controller: state machine, dispatch loop, UI snapshots.
pub struct ConversationStateController {
    session_id: String,
    persona: PersonaConfig,
    policy: SessionPolicy,
    engine: Arc<CatalogQueryEngine>,
    cart: Arc<dyn CartStore>,
    avatar: Option<Arc<AvatarSessionClient>>,
    state: Arc<RwLock<SessionState>>,
    ui: Arc<Mutex<UiState>>,
    call_tx: Mutex<mpsc::Sender<ToolCallEvent>>,
    call_rx: Arc<RwLock<Option<mpsc::Receiver<ToolCallEvent>>>>,
    event_tx: broadcast::Sender<SessionEvent>,
    shop_tx: watch::Sender<ShopState>,
    shutdown_tx: broadcast::Sender<()>,
    dispatch: Mutex<Option<JoinHandle<()>>>,
    last_activity: Mutex<Instant>,
}

impl ConversationStateController {
    pub fn new(
        session_id: impl Into<String>,
        persona: PersonaConfig,
        policy: SessionPolicy,
        engine: Arc<CatalogQueryEngine>,
        cart: Arc<dyn CartStore>,
    ) -> Self {
        let (call_tx, call_rx) = mpsc::channel(CALL_CHANNEL_CAPACITY);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown_tx, _) = broadcast::channel(1);
        let ui = UiState::new(policy.discussed_capacity);
        let (shop_tx, _) = watch::channel(ui.snapshot());

        Self {
            session_id: session_id.into(),
            persona,
            policy,
            engine,
            cart,
            avatar: None,
            state: Arc::new(RwLock::new(SessionState::Idle)),
            ui: Arc::new(Mutex::new(ui)),
            call_tx: Mutex::new(call_tx),
            call_rx: Arc::new(RwLock::new(Some(call_rx))),
            event_tx,
            shop_tx,
            shutdown_tx,
            dispatch: Mutex::new(None),
            last_activity: Mutex::new(Instant::now()),
        }
    }

    /// Attach an avatar client; `connect` will then create a renderer
    /// session when the persona carries a face id.
    pub fn with_avatar(mut self, client: Arc<AvatarSessionClient>) -> Self {
        self.avatar = Some(client);
        self
    }

    /// Establish the session and start the dispatch loop.
    ///
    /// Avatar session creation is bounded by the configured establishment
    /// timeout; failure or timeout transitions to `Error`.
    pub async fn connect(&self) -> Result<Option<AvatarSession>, SessionError> {
        let current = *self.state.read().await;
        if matches!(current, SessionState::Connecting | SessionState::Connected) {
            return Err(SessionError::AlreadyActive(current));
        }
        self.set_state(SessionState::Connecting).await;

        let avatar = match (&self.avatar, &self.persona.avatar_face_id) {
            (Some(client), Some(face_id)) => {
                let deadline = Duration::from_millis(self.policy.connect_timeout_ms);
                match tokio::time::timeout(deadline, client.start_session(face_id)).await {
                    Ok(Ok(session)) => Some(session),
                    Ok(Err(e)) => {
                        self.set_state(SessionState::Error).await;
                        return Err(e);
                    }
                    Err(_) => {
                        self.set_state(SessionState::Error).await;
                        return Err(SessionError::ConnectTimeout(self.policy.connect_timeout_ms));
                    }
                }
            }
            _ => None,
        };

        self.set_state(SessionState::Connected).await;
        let _ = self.event_tx.send(SessionEvent::Started {
            session_id: self.session_id.clone(),
        });
        self.spawn_dispatch().await;

        tracing::info!(
            session_id = %self.session_id,
            persona = %self.persona.name,
            avatar = avatar.is_some(),
            "session connected"
        );
        Ok(avatar)
    }

    /// Submit a tool call for dispatch. Only valid while connected.
    pub async fn submit_tool_call(&self, call: ToolCallEvent) -> Result<(), SessionError> {
        let state = *self.state.read().await;
        if !state.accepts_tool_calls() {
            return Err(SessionError::NotConnected(state));
        }
        self.touch();
        let tx = self.call_tx.lock().clone();
        tx.send(call).await.map_err(|_| SessionError::ChannelClosed)
    }

    /// Explicit user filter action: replaces the whole filter record.
    pub fn set_filters(&self, filters: ActiveFilters) {
        self.touch();
        let mut ui = self.ui.lock();
        ui.set_filters(filters);
        let _ = self.shop_tx.send(ui.snapshot());
    }

    /// Add to the cart. Allowed in any session state; the cart outlives
    /// the session.
    pub async fn add_to_cart(&self, item: CartItem) -> Result<CartItem, SessionError> {
        self.touch();
        Ok(self.cart.add(item).await?)
    }

    /// Remove from the cart. Allowed in any session state.
    pub async fn remove_from_cart(&self, wine_id: i64) -> Result<(), SessionError> {
        self.touch();
        Ok(self.cart.remove(wine_id).await?)
    }

    /// End the session normally: abort dispatch, discard queued and
    /// in-flight work, clear derived UI state. The cart is untouched.
    pub async fn disconnect(&self, reason: impl Into<String>) {
        self.end(SessionState::Disconnected, reason.into()).await;
    }

    /// End the session with a failure. Same cleanup as `disconnect`.
    pub async fn fail(&self, reason: impl Into<String>) {
        self.end(SessionState::Error, reason.into()).await;
    }

    async fn end(&self, terminal: SessionState, reason: String) {
        if let Some(handle) = self.dispatch.lock().take() {
            handle.abort();
        }
        let _ = self.shutdown_tx.send(());

        // Fresh call channel so a later reconnect gets a working dispatch
        // pair; the old receiver dies with the aborted task.
        let (call_tx, call_rx) = mpsc::channel(CALL_CHANNEL_CAPACITY);
        *self.call_tx.lock() = call_tx;
        *self.call_rx.write().await = Some(call_rx);

        {
            let mut ui = self.ui.lock();
            ui.clear();
            let _ = self.shop_tx.send(ui.snapshot());
        }

        self.set_state(terminal).await;
        tracing::info!(session_id = %self.session_id, %reason, state = %terminal, "session ended");
        let _ = self.event_tx.send(SessionEvent::Ended { reason });
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn persona(&self) -> &PersonaConfig {
        &self.persona
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    /// Current UI snapshot.
    pub fn snapshot(&self) -> ShopState {
        self.ui.lock().snapshot()
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Watch channel of UI snapshots.
    pub fn shop_state(&self) -> watch::Receiver<ShopState> {
        self.shop_tx.subscribe()
    }

    /// Time since the last user-driven action, for idle expiry.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    async fn set_state(&self, new_state: SessionState) {
        let old_state = {
            let mut state = self.state.write().await;
            let old = *state;
            *state = new_state;
            old
        };
        if old_state != new_state {
            let _ = self.event_tx.send(SessionEvent::StateChanged {
                old: old_state,
                new: new_state,
            });
        }
    }

    /// Start the single-flight dispatch task.
    async fn spawn_dispatch(&self) {
        let mut rx = match self.call_rx.write().await.take() {
            Some(rx) => rx,
            None => {
                tracing::error!(session_id = %self.session_id, "dispatch receiver already taken");
                return;
            }
        };
        let engine = Arc::clone(&self.engine);
        let ui = Arc::clone(&self.ui);
        let shop_tx = self.shop_tx.clone();
        let event_tx = self.event_tx.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let session_id = self.session_id.clone();
        let tool_timeout = Duration::from_secs(self.policy.tool_timeout_secs);

        let handle = tokio::spawn(async move {
            let mut queue: VecDeque<ToolCallEvent> = VecDeque::new();
            let mut closed = false;

            loop {
                let call = match queue.pop_front() {
                    Some(call) => call,
                    None if closed => break,
                    None => {
                        tokio::select! {
                            _ = shutdown_rx.recv() => break,
                            call = rx.recv() => match call {
                                Some(call) => call,
                                None => break,
                            },
                        }
                    }
                };

                tracing::debug!(
                    session_id = %session_id,
                    call_id = %call.id,
                    tool = %call.name,
                    "dispatching tool call"
                );

                // Keep receiving while the query runs so newer calls can
                // queue (and supersede same-named queued ones). The query
                // future borrows `call`, so the id is cloned out for the
                // result events.
                let call_id = call.id.clone();
                let query = tokio::time::timeout(tool_timeout, run_query(&engine, &call));
                tokio::pin!(query);
                let outcome = loop {
                    tokio::select! {
                        _ = shutdown_rx.recv() => return,
                        result = &mut query => break result,
                        next = rx.recv(), if !closed => match next {
                            Some(next) => enqueue(&mut queue, next),
                            None => closed = true,
                        },
                    }
                };

                match outcome {
                    Ok(Ok(result)) => {
                        let count = result.count();
                        {
                            let mut ui = ui.lock();
                            apply_outcome(&mut ui, result);
                            let _ = shop_tx.send(ui.snapshot());
                        }
                        let _ = event_tx.send(SessionEvent::ToolCompleted {
                            call_id,
                            name: call.name,
                            count,
                        });
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(
                            session_id = %session_id,
                            tool = %call.name,
                            error = %e,
                            "tool call failed"
                        );
                        let _ = event_tx.send(SessionEvent::ToolFailed {
                            call_id,
                            name: call.name,
                            message: e.to_string(),
                        });
                    }
                    Err(_) => {
                        let _ = event_tx.send(SessionEvent::ToolFailed {
                            call_id,
                            name: call.name,
                            message: format!(
                                "query timed out after {}s",
                                tool_timeout.as_secs()
                            ),
                        });
                    }
                }
            }
            tracing::debug!(session_id = %session_id, "dispatch loop exited");
        });

        *self.dispatch.lock() = Some(handle);
    }
}

/// Queue a call, dropping any older queued call with the same tool name.
fn enqueue(queue: &mut VecDeque<ToolCallEvent>, call: ToolCallEvent) {
    queue.retain(|queued| queued.name != call.name);
    queue.push_back(call);
}

async fn run_query(
    engine: &CatalogQueryEngine,
    call: &ToolCallEvent,
) -> Result<QueryOutcome, sommelier_core::Error> {
    match call.name {
        ToolName::SearchWines => {
            let filters = ActiveFilters::from_arguments(&call.arguments)?;
            let wines = engine.search(&filters).await?;
            Ok(QueryOutcome::Ranked { filters, wines })
        }
        ToolName::GetWine => {
            let name = call
                .arguments
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| sommelier_core::Error::Validation("name is required".into()))?;
            Ok(QueryOutcome::Single(engine.get_by_name(name).await?))
        }
        ToolName::ListWines => Ok(QueryOutcome::Listing(engine.list().await?)),
        ToolName::RecommendWines => {
            let use_case = UseCase::parse(call.arguments.get("use_case").and_then(Value::as_str));
            let budget = call.arguments.get("budget").and_then(Value::as_f64);
            let mut filters = ActiveFilters::from_arguments(&call.arguments)?;
            if filters.max_price.is_none() {
                filters.max_price = budget;
            }
            let recommendations = engine.recommend(use_case, budget).await?;
            let wines = recommendations.into_iter().map(|r| r.wine).collect();
            Ok(QueryOutcome::Ranked { filters, wines })
        }
    }
}

fn apply_outcome(ui: &mut UiState, outcome: QueryOutcome) {
    match outcome {
        QueryOutcome::Ranked { filters, wines } => ui.apply_ranked_results(filters, &wines),
        QueryOutcome::Single(wine) => ui.apply_single(wine),
        QueryOutcome::Listing(wines) => {
            let subset = &wines[..wines.len().min(LISTING_SHELF_SUBSET)];
            ui.apply_listing(subset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: ToolName, args: Value) -> ToolCallEvent {
        ToolCallEvent::new(name, args)
    }

    fn sample_wine(id: i64) -> Wine {
        Wine {
            id,
            slug: None,
            name: format!("Wine {id}"),
            winery: "Test Winery".into(),
            region: "Bordeaux".into(),
            country: "France".into(),
            grape_variety: None,
            vintage: Some(2018),
            wine_type: "red".into(),
            style: None,
            color: None,
            price_retail: 25.0,
            price_trade: None,
            bottle_size: None,
            tasting_notes: None,
            food_pairings: None,
            critic_scores: None,
            drinking_window: None,
            image_url: None,
            supplier: None,
            is_active: true,
        }
    }

    #[test]
    fn test_enqueue_supersedes_same_name() {
        let mut queue = VecDeque::new();
        enqueue(&mut queue, call(ToolName::SearchWines, json!({"region": "rioja"})));
        enqueue(&mut queue, call(ToolName::RecommendWines, json!({})));
        enqueue(
            &mut queue,
            call(ToolName::SearchWines, json!({"region": "bordeaux"})),
        );

        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].name, ToolName::RecommendWines);
        assert_eq!(queue[1].name, ToolName::SearchWines);
        assert_eq!(queue[1].arguments["region"], "bordeaux");
    }

    #[test]
    fn test_enqueue_keeps_distinct_names_in_order() {
        let mut queue = VecDeque::new();
        enqueue(&mut queue, call(ToolName::SearchWines, json!({})));
        enqueue(&mut queue, call(ToolName::GetWine, json!({"name": "Barolo"})));
        enqueue(&mut queue, call(ToolName::ListWines, json!({})));

        let names: Vec<ToolName> = queue.iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec![ToolName::SearchWines, ToolName::GetWine, ToolName::ListWines]
        );
    }

    #[test]
    fn test_listing_subset_is_capped() {
        let mut ui = UiState::new(12);
        let wines: Vec<Wine> = (1..=8).map(sample_wine).collect();
        apply_outcome(&mut ui, QueryOutcome::Listing(wines));
        assert_eq!(ui.discussed().len(), LISTING_SHELF_SUBSET);
        assert!(ui.featured().is_none());
        assert!(ui.filters().is_empty());
    }
}
