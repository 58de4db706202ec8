//! Authenticated operator surface: issues tokens, reads and clears the log.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracelink_core::{SessionId, TokenIssuer};
use tracelink_store::{Event, EventQuery, EventStore, SessionSummary, MAX_PAGE};
use tracing::info;

use crate::auth::{require_basic_auth, AuthGate};
use crate::blocking::run_blocking;
use crate::error::OperatorError;
use crate::pages;
use crate::render::{png_data_uri, CodeRenderer};

#[derive(Clone)]
pub struct OperatorState {
    pub store: EventStore,
    pub issuer: Arc<TokenIssuer>,
    pub renderer: Arc<dyn CodeRenderer>,
    /// Where rendered codes are written, one `{session}.png` per token.
    pub codes_dir: PathBuf,
}

/// Routes of the operator listener, all behind `gate`.
pub fn router(state: OperatorState, gate: AuthGate, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(console))
        .route("/dashboard", get(console))
        .route("/admin/generate", get(generate))
        .route("/admin/logs", get(logs))
        .route("/admin/sessions", get(sessions))
        .route("/admin/clear_logs", post(clear_logs))
        .nest_service("/static/img", ServeDir::new(static_dir))
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn_with_state(gate, require_basic_auth))
}

async fn console() -> Html<&'static str> {
    Html(pages::OPERATOR_CONSOLE)
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

#[derive(Debug, Deserialize)]
struct GenerateParams {
    custom_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub qr: String,
    pub session: SessionId,
    pub saved_file: String,
    pub visit_url: String,
}

/// GET /admin/generate: issue a token and render its access URL.
async fn generate(
    State(state): State<OperatorState>,
    Query(params): Query<GenerateParams>,
) -> Result<Json<GenerateResponse>, OperatorError> {
    let token = state.issuer.issue(params.custom_url.as_deref());
    let path = state.codes_dir.join(format!("{}.png", token.session));

    let renderer = Arc::clone(&state.renderer);
    let url = token.visit_url.clone();
    let target = path.clone();
    let png = run_blocking(move || {
        let png = renderer.render_png(&url)?;
        write_artifact(&target, &png)?;
        Ok::<_, OperatorError>(png)
    })
    .await?;

    info!(session_id = %token.session, file = %path.display(), "rendered access code");

    Ok(Json(GenerateResponse {
        qr: png_data_uri(&png),
        session: token.session,
        saved_file: path.display().to_string(),
        visit_url: token.visit_url,
    }))
}

fn write_artifact(path: &Path, bytes: &[u8]) -> Result<(), OperatorError> {
    let artifact_err = |e: std::io::Error| OperatorError::Artifact {
        path: path.display().to_string(),
        detail: e.to_string(),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(artifact_err)?;
    }
    std::fs::write(path, bytes).map_err(artifact_err)
}

#[derive(Debug, Default, Deserialize)]
struct LogParams {
    session: Option<String>,
    limit: Option<u32>,
    before: Option<i64>,
}

impl LogParams {
    fn into_query(self) -> EventQuery {
        EventQuery {
            session: self
                .session
                .filter(|s| !s.is_empty())
                .map(SessionId::from_raw),
            before_id: self.before,
            limit: self.limit.unwrap_or(MAX_PAGE),
        }
    }
}

/// GET /admin/logs: newest first, at most [`MAX_PAGE`].
async fn logs(
    State(state): State<OperatorState>,
    Query(params): Query<LogParams>,
) -> Result<Json<Vec<Event>>, OperatorError> {
    let query = params.into_query();
    let store = state.store.clone();
    let events = run_blocking(move || store.query(&query).map_err(OperatorError::from)).await?;
    Ok(Json(events))
}

async fn sessions(
    State(state): State<OperatorState>,
) -> Result<Json<Vec<SessionSummary>>, OperatorError> {
    let store = state.store.clone();
    let summaries =
        run_blocking(move || store.sessions(MAX_PAGE).map_err(OperatorError::from)).await?;
    Ok(Json(summaries))
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: bool,
    pub removed: u64,
}

async fn clear_logs(State(state): State<OperatorState>) -> Result<Json<ClearResponse>, OperatorError> {
    let store = state.store.clone();
    let removed = run_blocking(move || store.clear().map_err(OperatorError::from)).await?;
    Ok(Json(ClearResponse {
        cleared: true,
        removed,
    }))
}
