//! HTTP Basic gate for the operator surface.
//!
//! Applied once as a layer over the whole operator router; handlers never
//! check credentials themselves. Every request is authenticated on its own,
//! with no lockout and no session.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracelink_core::Credentials;
use tracing::debug;

pub const DEFAULT_REALM: &str = "Operator";

#[derive(Clone, Debug)]
pub struct AuthGate {
    credentials: Arc<Credentials>,
}

impl AuthGate {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials: Arc::new(credentials),
        }
    }

    /// Whether the request headers carry the configured pair.
    pub fn admits(&self, headers: &HeaderMap) -> bool {
        match basic_credentials(headers) {
            Some((user, pass)) => self.credentials.verify(&user, &pass),
            None => false,
        }
    }

    fn challenge(&self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            [(WWW_AUTHENTICATE, format!("Basic realm=\"{DEFAULT_REALM}\""))],
            "Auth required",
        )
            .into_response()
    }
}

/// Middleware: reject before the inner handler runs unless credentials match.
pub async fn require_basic_auth(State(gate): State<AuthGate>, req: Request, next: Next) -> Response {
    if gate.admits(req.headers()) {
        return next.run(req).await;
    }
    debug!(method = %req.method(), path = %req.uri().path(), "operator request rejected");
    gate.challenge()
}

/// Decode `Authorization: Basic ...` into `(username, password)`.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}
