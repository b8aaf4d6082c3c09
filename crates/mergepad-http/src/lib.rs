use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use dashmap::DashMap;
use mergepad_core::config::HttpSettings;
use mergepad_engine::reconcile::Row;
use mergepad_engine::{
    DiffStats, EngineConfig, InitialSelection, MergeSession, Mode, SegmentId, SegmentState,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use uuid::Uuid;

struct SessionEntry {
    session: MergeSession,
    last_used: Instant,
}

impl SessionEntry {
    fn new(session: MergeSession, now: Instant) -> Self {
        Self {
            session,
            last_used: now,
        }
    }
}

#[derive(Clone)]
struct AppState {
    sessions: Arc<DashMap<Uuid, SessionEntry>>,
    defaults: EngineConfig,
    max_sessions: usize,
    idle: Duration,
}

impl AppState {
    fn new(settings: &HttpSettings, defaults: EngineConfig) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            defaults,
            max_sessions: settings.max_sessions.max(1),
            idle: Duration::from_secs(settings.session_idle_secs),
        }
    }

    /// Drop sessions idle past the timeout, then evict the least recently
    /// used until one more session fits. Returns how many were removed.
    fn make_room(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        let idle = self.idle;
        self.sessions
            .retain(|_, entry| now.saturating_duration_since(entry.last_used) < idle);

        while self.sessions.len() >= self.max_sessions {
            let oldest = self
                .sessions
                .iter()
                .min_by_key(|entry| entry.last_used)
                .map(|entry| *entry.key());
            match oldest {
                Some(id) => {
                    self.sessions.remove(&id);
                    tracing::debug!(%id, "evicted least recently used session");
                }
                None => break,
            }
        }
        before.saturating_sub(self.sessions.len())
    }

    /// Run `f` against a live session and mark it as used.
    fn with_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut MergeSession) -> T,
    ) -> Result<T, ApiError> {
        let mut entry = self
            .sessions
            .get_mut(&id)
            .ok_or(ApiError::SessionNotFound(id))?;
        entry.last_used = Instant::now();
        Ok(f(&mut entry.session))
    }
}

#[derive(Debug, Default, Deserialize)]
struct CreateSessionRequest {
    #[serde(default)]
    mode: Option<Mode>,
    #[serde(default)]
    initial_selection: Option<InitialSelection>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub id: Uuid,
    pub mode: Mode,
    pub initial_selection: InitialSelection,
}

#[derive(Debug, Deserialize)]
struct CompareRequest {
    original: String,
    modified: String,
}

#[derive(Debug, Deserialize)]
struct ToggleRequest {
    segment_id: SegmentId,
    /// When present, the toggle is dropped unless it matches the current run.
    #[serde(default)]
    generation: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SelectRequest {
    policy: InitialSelection,
}

/// Full state of one session as returned by every session endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub id: Uuid,
    pub mode: Mode,
    pub generation: u64,
    pub segments: Vec<SegmentState>,
    pub merged: String,
    /// Merged output as display lines; text sessions drop a trailing blank
    /// line.
    pub lines: Vec<String>,
    /// Per-side line numbers; code sessions only.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rows: Option<Vec<Row>>,
    pub stats: DiffStats,
}

impl SessionView {
    fn new(id: Uuid, session: &MergeSession) -> Self {
        let segments = session.snapshot();
        Self {
            id,
            mode: session.mode(),
            generation: session.generation(),
            stats: DiffStats::from_states(&segments),
            merged: session.merged(),
            lines: session.merged_lines(),
            rows: session.rows(),
            segments,
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: String,
    version: String,
    sessions: usize,
}

#[derive(Debug, Error)]
enum ApiError {
    #[error("session {0} not found")]
    SessionNotFound(Uuid),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// HTTP API exposing comparison sessions to a browser front end.
pub struct HttpServer {
    settings: HttpSettings,
    defaults: EngineConfig,
}

impl HttpServer {
    pub fn new(settings: HttpSettings, defaults: EngineConfig) -> Self {
        Self { settings, defaults }
    }

    pub fn router(&self) -> Router {
        let state = AppState::new(&self.settings, self.defaults);

        Router::new()
            .route("/v1/status", get(status_handler))
            .route("/v1/sessions", post(create_session_handler))
            .route(
                "/v1/sessions/{id}",
                get(get_session_handler).delete(delete_session_handler),
            )
            .route("/v1/sessions/{id}/compare", post(compare_handler))
            .route("/v1/sessions/{id}/toggle", post(toggle_handler))
            .route("/v1/sessions/{id}/select", post(select_handler))
            .layer(cors_layer(&self.settings.cors_origins))
            .with_state(state)
    }

    pub async fn start(
        &self,
        mut shutdown: tokio::sync::broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let app = self.router();

        let addr = SocketAddr::from(([0, 0, 0, 0], self.settings.port));
        tracing::info!("HTTP API listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        Ok(())
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin {}: {}", origin, e);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sessions: state.sessions.len(),
    })
}

async fn create_session_handler(
    State(state): State<AppState>,
    body: Option<Json<CreateSessionRequest>>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let config = EngineConfig {
        mode: req.mode.unwrap_or(state.defaults.mode),
        initial_selection: req
            .initial_selection
            .unwrap_or(state.defaults.initial_selection),
        ..state.defaults
    };

    let now = Instant::now();
    let evicted = state.make_room(now);
    if evicted > 0 {
        tracing::info!(evicted, live = state.sessions.len(), "sessions evicted");
    }

    let id = Uuid::new_v4();
    state
        .sessions
        .insert(id, SessionEntry::new(MergeSession::new(config), now));
    tracing::info!(%id, mode = %config.mode, "session created");

    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            id,
            mode: config.mode,
            initial_selection: config.initial_selection,
        }),
    )
}

async fn get_session_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    state
        .with_session(id, |session| SessionView::new(id, session))
        .map(Json)
}

async fn delete_session_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .remove(&id)
        .ok_or(ApiError::SessionNotFound(id))?;
    tracing::info!(%id, "session deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn compare_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<SessionView>, ApiError> {
    state
        .with_session(id, |session| {
            let stats = session.compare(&req.original, &req.modified);
            tracing::info!(
                %id,
                added = stats.added,
                removed = stats.removed,
                "comparison run"
            );
            SessionView::new(id, session)
        })
        .map(Json)
}

async fn toggle_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<SessionView>, ApiError> {
    state
        .with_session(id, |session| {
            match req.generation {
                Some(generation) => session.toggle_in(generation, req.segment_id),
                None => session.toggle(req.segment_id),
            };
            SessionView::new(id, session)
        })
        .map(Json)
}

async fn select_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectRequest>,
) -> Result<Json<SessionView>, ApiError> {
    state
        .with_session(id, |session| {
            session.select(req.policy);
            SessionView::new(id, session)
        })
        .map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde::de::DeserializeOwned;
    use tower::ServiceExt;

    fn app() -> Router {
        HttpServer::new(HttpSettings::default(), EngineConfig::default()).router()
    }

    fn app_with(settings: HttpSettings) -> Router {
        HttpServer::new(settings, EngineConfig::default()).router()
    }

    async fn send_raw(app: &Router, method: &str, uri: &str, body: &str) -> StatusCode {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        app.clone().oneshot(request).await.unwrap().status()
    }

    async fn live_sessions(app: &Router) -> u64 {
        let (_, body) = call::<serde_json::Value>(app, "GET", "/v1/status", None).await;
        body.unwrap()["sessions"].as_u64().unwrap()
    }

    async fn call<T: DeserializeOwned>(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, Option<T>) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).ok())
    }

    async fn create(app: &Router, body: serde_json::Value) -> CreateSessionResponse {
        let (status, created) = call(app, "POST", "/v1/sessions", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        created.unwrap()
    }

    #[tokio::test]
    async fn test_status() {
        let (status, body) = call::<serde_json::Value>(&app(), "GET", "/v1/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap()["status"], "ok");
    }

    #[tokio::test]
    async fn test_code_compare_and_toggle() {
        let app = app();
        let created = create(&app, serde_json::json!({})).await;
        assert_eq!(created.mode, Mode::Code);

        let uri = format!("/v1/sessions/{}/compare", created.id);
        let body = serde_json::json!({ "original": "a\nb\nc", "modified": "a\nx\nc" });
        let (status, view) = call::<SessionView>(&app, "POST", &uri, Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        let view = view.unwrap();
        assert_eq!(view.merged, "a\nx\nc");
        assert_eq!(view.segments.len(), 4);
        assert_eq!(view.rows.as_ref().unwrap()[2].original_line, None);

        let uri = format!("/v1/sessions/{}/toggle", created.id);
        call::<SessionView>(&app, "POST", &uri, Some(serde_json::json!({ "segment_id": 2 }))).await;
        let (_, view) = call::<SessionView>(
            &app,
            "POST",
            &uri,
            Some(serde_json::json!({ "segment_id": 1, "generation": 1 })),
        )
        .await;
        assert_eq!(view.unwrap().merged, "a\nb\nc");
    }

    #[tokio::test]
    async fn test_stale_generation_is_ignored() {
        let app = app();
        let created = create(&app, serde_json::json!({ "mode": "text" })).await;

        let uri = format!("/v1/sessions/{}/compare", created.id);
        let body = serde_json::json!({ "original": "The cat sat", "modified": "The dog sat" });
        call::<SessionView>(&app, "POST", &uri, Some(body.clone())).await;
        call::<SessionView>(&app, "POST", &uri, Some(body)).await;

        let uri = format!("/v1/sessions/{}/toggle", created.id);
        let (_, view) = call::<SessionView>(
            &app,
            "POST",
            &uri,
            Some(serde_json::json!({ "segment_id": 2, "generation": 1 })),
        )
        .await;
        let view = view.unwrap();
        assert_eq!(view.generation, 2);
        assert_eq!(view.merged, "The dog sat");
        assert!(view.rows.is_none());
    }

    #[tokio::test]
    async fn test_select_policy() {
        let app = app();
        let created = create(&app, serde_json::json!({ "mode": "text" })).await;

        let uri = format!("/v1/sessions/{}/compare", created.id);
        let body = serde_json::json!({ "original": "The cat sat", "modified": "The dog sat" });
        call::<SessionView>(&app, "POST", &uri, Some(body)).await;

        let uri = format!("/v1/sessions/{}/select", created.id);
        let (_, view) = call::<SessionView>(
            &app,
            "POST",
            &uri,
            Some(serde_json::json!({ "policy": "original" })),
        )
        .await;
        assert_eq!(view.unwrap().merged, "The cat sat");
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let app = app();
        let uri = format!("/v1/sessions/{}", Uuid::new_v4());
        let (status, body) = call::<serde_json::Value>(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.unwrap()["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_delete_session() {
        let app = app();
        let created = create(&app, serde_json::json!({})).await;
        let uri = format!("/v1/sessions/{}", created.id);

        let (status, _) = call::<serde_json::Value>(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call::<serde_json::Value>(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_session_count_is_capped() {
        let app = app_with(HttpSettings {
            max_sessions: 3,
            ..HttpSettings::default()
        });
        for _ in 0..10 {
            create(&app, serde_json::json!({})).await;
        }
        assert_eq!(live_sessions(&app).await, 3);
    }

    #[tokio::test]
    async fn test_recently_used_session_survives_eviction() {
        let app = app_with(HttpSettings {
            max_sessions: 2,
            ..HttpSettings::default()
        });
        let first = create(&app, serde_json::json!({})).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = create(&app, serde_json::json!({})).await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        let first_uri = format!("/v1/sessions/{}", first.id);
        let (status, _) = call::<serde_json::Value>(&app, "GET", &first_uri, None).await;
        assert_eq!(status, StatusCode::OK);
        tokio::time::sleep(Duration::from_millis(5)).await;

        create(&app, serde_json::json!({})).await;

        let (status, _) = call::<serde_json::Value>(&app, "GET", &first_uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let second_uri = format!("/v1/sessions/{}", second.id);
        let (status, _) = call::<serde_json::Value>(&app, "GET", &second_uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_make_room_sweeps_idle_sessions() {
        let settings = HttpSettings {
            max_sessions: 10,
            session_idle_secs: 60,
            ..HttpSettings::default()
        };
        let state = AppState::new(&settings, EngineConfig::default());
        let start = Instant::now();
        let stale = Uuid::new_v4();
        let fresh = Uuid::new_v4();
        let config = EngineConfig::default();
        state
            .sessions
            .insert(stale, SessionEntry::new(MergeSession::new(config), start));
        state.sessions.insert(
            fresh,
            SessionEntry::new(MergeSession::new(config), start + Duration::from_secs(90)),
        );

        let removed = state.make_room(start + Duration::from_secs(100));
        assert_eq!(removed, 1);
        assert!(!state.sessions.contains_key(&stale));
        assert!(state.sessions.contains_key(&fresh));
    }

    #[test]
    fn test_make_room_evicts_least_recently_used() {
        let settings = HttpSettings {
            max_sessions: 2,
            ..HttpSettings::default()
        };
        let state = AppState::new(&settings, EngineConfig::default());
        let start = Instant::now();
        let ids: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        for (offset, id) in [20, 10].into_iter().zip(&ids) {
            let entry = SessionEntry::new(
                MergeSession::new(EngineConfig::default()),
                start + Duration::from_secs(offset),
            );
            state.sessions.insert(*id, entry);
        }

        assert_eq!(state.make_room(start + Duration::from_secs(30)), 1);
        assert!(state.sessions.contains_key(&ids[0]));
        assert!(!state.sessions.contains_key(&ids[1]));
    }

    #[tokio::test]
    async fn test_rejected_bodies() {
        let app = app();
        let created = create(&app, serde_json::json!({})).await;
        let uri = format!("/v1/sessions/{}/compare", created.id);

        assert_eq!(
            send_raw(&app, "POST", &uri, "{\"original\": ").await,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            send_raw(&app, "POST", &uri, r#"{"original": "a"}"#).await,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            send_raw(&app, "POST", "/v1/sessions", r#"{"mode": "prose"}"#).await,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(live_sessions(&app).await, 1);
    }
}
