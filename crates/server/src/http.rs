//! HTTP endpoints
//!
//! REST surface for the voice widget and the voice service's tool
//! invocations. Identity is the externally resolved `X-User-Id` header,
//! passed through verbatim; no authentication happens here.

use axum::{
    extract::{Json, Path, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use sommelier_core::{CartItem, ToolCallEvent, ToolName};
use sommelier_session::SessionError;
use sommelier_tools::{ToolError, ToolExecutor};

use crate::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.config.server.cors_origins,
        state.config.server.cors_enabled,
    );

    Router::new()
        // Session endpoints
        .route("/api/sessions", post(create_session))
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id", delete(delete_session))
        .route("/api/sessions/:id/state", get(get_shop_state))
        .route("/api/sessions/:id/tool-calls", post(submit_tool_call))
        // Direct tool invocation (the shape the voice service calls)
        .route("/api/tools", get(list_tools))
        .route("/api/tools/:name", post(call_tool))
        // Cart endpoints
        .route("/api/cart", get(get_cart))
        .route("/api/cart", post(add_cart_item))
        .route("/api/cart/:wine_id", delete(remove_cart_item))
        // Health check
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build the CORS layer from configured origins.
///
/// Disabled CORS allows everything (development only); an empty origin
/// list falls back to localhost:3000.
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled, allowing all origins (not for production)");
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "invalid CORS origin, skipping");
                None
            }
        })
        .collect();

    let allowed = if parsed.is_empty() {
        tracing::info!("no valid CORS origins configured, defaulting to localhost:3000");
        vec![HeaderValue::from_static("http://localhost:3000")]
    } else {
        parsed
    };

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

fn user_id(headers: &HeaderMap) -> Option<&str> {
    headers.get("x-user-id").and_then(|v| v.to_str().ok())
}

/// Create a session and establish it.
async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let controller = match state
        .sessions
        .create(
            state.config.persona.clone(),
            state.config.session.clone(),
            state.engine.clone(),
            state.cart.clone(),
            state.avatar.clone(),
        )
        .await
    {
        Ok(controller) => controller,
        Err(e) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": e.to_string() })),
            );
        }
    };

    match controller.connect().await {
        Ok(avatar) => (
            StatusCode::CREATED,
            Json(json!({
                "session_id": controller.session_id(),
                "state": controller.state().await,
                "persona": controller.persona().name,
                "avatar_session_token": avatar.map(|a| a.session_token),
                // Rates the widget's transcoder must use for this session.
                "audio": {
                    "source_sample_rate": state.config.audio.source_sample_rate,
                    "target_sample_rate": state.config.audio.target_sample_rate,
                },
            })),
        ),
        Err(e) => {
            let id = controller.session_id().to_string();
            state.sessions.remove(&id).await;
            tracing::error!(session_id = %id, error = %e, "session establishment failed");
            let status = match e {
                SessionError::ConnectTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            };
            (status, Json(json!({ "error": e.to_string() })))
        }
    }
}

async fn list_sessions(State(state): State<AppState>) -> Json<Value> {
    let sessions = state.sessions.list();
    Json(json!({
        "sessions": sessions,
        "count": sessions.len(),
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let controller = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({
        "session_id": controller.session_id(),
        "state": controller.state().await,
        "idle_secs": controller.idle_for().as_secs(),
    })))
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    if state.sessions.remove(&id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Current shop state snapshot for a session.
async fn get_shop_state(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let controller = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let snapshot = controller.snapshot();
    serde_json::to_value(snapshot)
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[derive(Debug, Deserialize)]
struct ToolCallSubmission {
    /// Correlation id from the voice service; generated when absent.
    id: Option<String>,
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Queue a tool call for single-flight dispatch.
async fn submit_tool_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(submission): Json<ToolCallSubmission>,
) -> impl IntoResponse {
    let Some(controller) = state.sessions.get(&id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "session not found" })),
        );
    };

    let Some(name) = ToolName::parse(&submission.name) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("unknown tool: {}", submission.name) })),
        );
    };

    let mut call = ToolCallEvent::new(name, submission.arguments);
    if let Some(call_id) = submission.id {
        call.id = call_id;
    }
    let call_id = call.id.clone();

    match controller.submit_tool_call(call).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(json!({ "accepted": true, "call_id": call_id })),
        ),
        Err(SessionError::NotConnected(session_state)) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": format!("session is {session_state}") })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    let tools: Vec<Value> = state
        .tools
        .list_tools()
        .into_iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "input_schema": t.input_schema,
            })
        })
        .collect();

    Json(json!({ "tools": tools }))
}

#[derive(Debug, Deserialize)]
struct ToolCallRequest {
    #[serde(default)]
    arguments: Value,
}

/// Direct synchronous tool invocation for the voice service.
async fn call_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ToolCallRequest>,
) -> impl IntoResponse {
    tracing::debug!(tool = %name, user_id = user_id(&headers), "tool invocation");

    match state.tools.execute(&name, request.arguments).await {
        Ok(output) => (StatusCode::OK, Json(output.content)),
        Err(e) => {
            let status = match &e {
                ToolError::NotFound(_) | ToolError::NoResult(_) => StatusCode::NOT_FOUND,
                ToolError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                ToolError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                ToolError::ExecutionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::warn!(tool = %name, error = %e, "tool invocation failed");
            (
                status,
                Json(json!({ "success": false, "message": e.to_string() })),
            )
        }
    }
}

async fn get_cart(State(state): State<AppState>) -> impl IntoResponse {
    match state.cart.list().await {
        Ok(items) => {
            let count: u32 = items.iter().map(|i| i.quantity).sum();
            (StatusCode::OK, Json(json!({ "items": items, "count": count })))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

async fn add_cart_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(item): Json<CartItem>,
) -> impl IntoResponse {
    tracing::debug!(
        wine_id = item.wine_id,
        quantity = item.quantity,
        user_id = user_id(&headers),
        "cart add"
    );

    match state.cart.add(item).await {
        Ok(stored) => (StatusCode::CREATED, Json(json!({ "item": stored }))),
        Err(e) => {
            let status = StatusCode::from(crate::ServerError::from(e));
            (status, Json(json!({ "error": "cart add failed" })))
        }
    }
}

async fn remove_cart_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(wine_id): Path<i64>,
) -> StatusCode {
    tracing::debug!(wine_id, user_id = user_id(&headers), "cart remove");

    match state.cart.remove(wine_id).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(sommelier_cart::CartError::NotFound(_)) => StatusCode::NOT_FOUND,
        Err(e) => {
            tracing::error!(wine_id, error = %e, "cart remove failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let mut healthy = true;

    let catalog = match state.engine.list().await {
        Ok(wines) => json!({ "status": "ok", "wines": wines.len() }),
        Err(e) => {
            healthy = false;
            json!({ "status": "error", "message": e.to_string() })
        }
    };
    let cart = match state.cart.count().await {
        Ok(count) => json!({ "status": "ok", "count": count }),
        Err(e) => {
            healthy = false;
            json!({ "status": "error", "message": e.to_string() })
        }
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status_code,
        Json(json!({
            "status": if healthy { "healthy" } else { "degraded" },
            "version": env!("CARGO_PKG_VERSION"),
            "checks": {
                "catalog": catalog,
                "cart": cart,
                "tools": { "status": "ok", "count": state.tools.len() },
                "sessions": { "status": "ok", "count": state.sessions.count() },
            },
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use sommelier_config::Settings;
    use tower::util::ServiceExt;

    fn test_state() -> AppState {
        let mut settings = Settings::default();
        settings.catalog.database_path = ":memory:".into();
        settings.cart.database_path = ":memory:".into();
        AppState::new(settings).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_ok() {
        let app = create_router(test_state());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["checks"]["catalog"]["wines"], 8);
        assert_eq!(body["checks"]["tools"]["count"], 4);
    }

    #[tokio::test]
    async fn test_tool_invocation_over_http() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::post("/api/tools/search_wines")
                    .header("content-type", "application/json")
                    .header("x-user-id", "user-42")
                    .body(Body::from(
                        json!({ "arguments": { "country": "Italy" } }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 2);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::post("/api/tools/pour_wine")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "arguments": {} }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_session_lifecycle_over_http() {
        let state = test_state();
        let app = create_router(state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/sessions")
                    .header("content-type", "application/json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["state"], "connected");
        assert_eq!(body["audio"]["source_sample_rate"], 48_000);
        assert_eq!(body["audio"]["target_sample_rate"], 16_000);
        let session_id = body["session_id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(
                Request::post(format!("/api/sessions/{session_id}/tool-calls"))
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({ "name": "search_wines", "arguments": { "region": "bordeaux" } })
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let response = app
            .clone()
            .oneshot(
                Request::delete(format!("/api/sessions/{session_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.sessions.count(), 0);
    }

    #[tokio::test]
    async fn test_cart_round_trip_over_http() {
        let app = create_router(test_state());

        let item = json!({
            "wine_id": 7,
            "name": "Prosecco Superiore",
            "winery": "Nino Franco",
            "price": 22.0,
            "quantity": 2,
        });
        let response = app
            .clone()
            .oneshot(
                Request::post("/api/cart")
                    .header("content-type", "application/json")
                    .body(Body::from(item.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(Request::get("/api/cart").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["count"], 2);

        let response = app
            .oneshot(
                Request::delete("/api/cart/7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
