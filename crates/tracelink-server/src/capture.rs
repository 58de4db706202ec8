//! Public capture surface: records visits and client reports.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::debug;

use tracelink_core::SessionId;
use tracelink_store::{EventStore, NewEvent, Payload};

use crate::blocking::run_blocking;
use crate::client::ClientMeta;
use crate::error::CaptureError;
use crate::health::{self, HealthResponse};
use crate::pages;

#[derive(Clone)]
pub struct CaptureState {
    pub store: EventStore,
}

impl CaptureState {
    pub fn new(store: EventStore) -> Self {
        Self { store }
    }
}

/// Routes of the capture listener.
pub fn router(state: CaptureState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/visit", get(visit))
        .route(
            "/report",
            post(report).layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// First value of `name` in a decoded query string.
fn first_param(pairs: Vec<(String, String)>, name: &str) -> Option<String> {
    pairs.into_iter().find(|(k, _)| k == name).map(|(_, v)| v)
}

/// A decoded `/report` body.
#[derive(Debug, PartialEq, Deserialize)]
pub struct ReportBody {
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub payload: Option<Payload>,
}

impl ReportBody {
    /// Parse a raw body. It must be a JSON object; `session` must be a string
    /// and `payload` an object when present.
    pub fn parse(raw: &[u8]) -> Result<Self, CaptureError> {
        let value: Value = serde_json::from_slice(raw).map_err(|_| CaptureError::InvalidJson)?;
        if !value.is_object() {
            return Err(CaptureError::InvalidJson);
        }
        serde_json::from_value(value).map_err(|_| CaptureError::InvalidJson)
    }

    pub fn session_id(&self) -> SessionId {
        self.session
            .as_deref()
            .map_or_else(SessionId::unknown, SessionId::from_raw)
    }
}

async fn index() -> Html<&'static str> {
    Html(pages::CAPTURE_INDEX)
}

/// GET /visit: one event per request, then the landing page.
async fn visit(
    State(state): State<CaptureState>,
    Query(pairs): Query<Vec<(String, String)>>,
    client: ClientMeta,
) -> Result<Html<String>, CaptureError> {
    let session = first_param(pairs, "s").map_or_else(SessionId::unknown, SessionId::from_raw);
    let event = NewEvent::visit(session.clone(), client.address, client.user_agent).at(Utc::now());

    let store = state.store.clone();
    let id = run_blocking(move || store.append(event).map_err(CaptureError::from)).await?;
    debug!(event_id = id, session_id = %session, "visit recorded");

    Ok(Html(pages::render_landing(session.as_str())))
}

/// POST /report: body is parsed whatever the declared content type.
async fn report(
    State(state): State<CaptureState>,
    client: ClientMeta,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Value>, CaptureError> {
    let body = body.map_err(CaptureError::from_body_rejection)?;
    let parsed = ReportBody::parse(&body)?;
    let session = parsed.session_id();
    let payload = parsed.payload.unwrap_or_default();
    let event =
        NewEvent::report(session.clone(), client.address, client.user_agent, payload).at(Utc::now());

    let store = state.store.clone();
    let id = run_blocking(move || store.append(event).map_err(CaptureError::from)).await?;
    debug!(event_id = id, session_id = %session, "report recorded");

    Ok(Json(json!({"status": "ok"})))
}

async fn health_handler() -> Json<HealthResponse> {
    Json(health::health_check(Utc::now()))
}
