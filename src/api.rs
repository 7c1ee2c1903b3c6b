// src/api.rs
//! Inbound HTTP boundary: `POST /` webhook intake and `GET /healthz`.
//!
//! The direction is chosen from the `User-Agent` header; the matching shared
//! secret must be present before the relay core is invoked.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use secrecy::{ExposeSecret, SecretString};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::config::HookSecrets;
use crate::relay::{Direction, Relay, RelayError, RelayOutcome};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const MISSKEY_AGENT: &str = "Misskey-Hooks";
const IFTTT_AGENT: &str = "IFTTT-Hooks";
const MISSKEY_SECRET_HEADER: &str = "x-misskey-hook-secret";
const IFTTT_SECRET_HEADER: &str = "x-ifttt-hook-secret";

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub secrets: Arc<HookSecrets>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(relay: Arc<Relay>, secrets: HookSecrets, request_timeout: Duration) -> Self {
        Self {
            relay,
            secrets: Arc::new(secrets),
            request_timeout,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(webhook))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Misskey,
    Ifttt,
}

impl Source {
    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let ua = headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if ua.contains(MISSKEY_AGENT) {
            Some(Source::Misskey)
        } else if ua.contains(IFTTT_AGENT) {
            Some(Source::Ifttt)
        } else {
            None
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Source::Misskey => "misskey",
            Source::Ifttt => "ifttt",
        }
    }

    fn direction(&self) -> Direction {
        match self {
            Source::Misskey => Direction::NoteToTweet,
            Source::Ifttt => Direction::TweetToNote,
        }
    }

    fn secret_header(&self) -> &'static str {
        match self {
            Source::Misskey => MISSKEY_SECRET_HEADER,
            Source::Ifttt => IFTTT_SECRET_HEADER,
        }
    }

    fn expected_secret<'a>(&self, secrets: &'a HookSecrets) -> Option<&'a SecretString> {
        match self {
            Source::Misskey => secrets.misskey.as_ref(),
            Source::Ifttt => secrets.ifttt.as_ref(),
        }
    }
}

/// Webhook rejections and failures, mapped to status codes.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unsupported User-Agent")]
    UnsupportedAgent,

    #[error("Invalid {0} secret")]
    Unauthorized(&'static str),

    #[error("Relay timed out")]
    Timeout,

    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::UnsupportedAgent => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Relay(RelayError::Decode { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Relay(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = match &self {
            ApiError::Relay(RelayError::Decode { .. }) => "Malformed payload".to_string(),
            ApiError::Relay(_) => "Failed to handle request".to_string(),
            other => other.to_string(),
        };
        (status, body).into_response()
    }
}

/// Length-independent byte comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn authorized(source: Source, headers: &HeaderMap, secrets: &HookSecrets) -> bool {
    let Some(expected) = source.expected_secret(secrets) else {
        return false;
    };
    let provided = headers
        .get(source.secret_header())
        .map(|v| v.as_bytes())
        .unwrap_or_default();
    constant_time_eq(provided, expected.expose_secret().as_bytes())
}

async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), ApiError> {
    let Some(source) = Source::from_headers(&headers) else {
        warn!("unsupported User-Agent");
        crate::metrics::record_webhook("unknown", "bad_request");
        crate::metrics::record_webhook_error("unknown", "unsupported_user_agent");
        return Err(ApiError::UnsupportedAgent);
    };
    let label = source.label();

    if !authorized(source, &headers, &state.secrets) {
        error!(source = label, "invalid hook secret");
        crate::metrics::record_webhook(label, "unauthorized");
        crate::metrics::record_webhook_error(label, "unauthorized");
        return Err(ApiError::Unauthorized(label));
    }

    let start = Instant::now();
    let relay = &state.relay;
    let fut = async {
        match source {
            Source::Misskey => relay.note_to_tweet(&body).await,
            Source::Ifttt => relay.tweet_to_note(&body).await,
        }
    };

    let result = match tokio::time::timeout(state.request_timeout, fut).await {
        Ok(r) => r,
        Err(_) => {
            error!(source = label, timeout = ?state.request_timeout, "relay timed out");
            // The relay future was dropped mid-flight; its claim stays held.
            crate::metrics::record_failure(source.direction());
            crate::metrics::record_webhook(label, "error");
            crate::metrics::record_webhook_error(label, "timeout");
            return Err(ApiError::Timeout);
        }
    };

    match result {
        Ok(outcome) => {
            crate::metrics::record_webhook(label, "success");
            crate::metrics::record_webhook_duration(label, start.elapsed());
            let msg = match outcome {
                RelayOutcome::Forwarded { .. } => "OK",
                RelayOutcome::Skipped(_) => "OK (skipped)",
            };
            Ok((StatusCode::OK, msg))
        }
        Err(e) => {
            error!(source = label, error = %e, "failed to handle request");
            crate::metrics::record_webhook(label, "error");
            crate::metrics::record_webhook_error(label, e.kind());
            Err(e.into())
        }
    }
}

async fn healthz() -> String {
    format!("note-tweet-connector is healthy\nVersion: {VERSION}")
}
