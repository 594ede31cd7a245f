//! HTTP surface: routes, request decoding, and the error-to-response mapping.

use crate::models::{ComposedRequest, PassthroughRequest, ProxyReply, ProxyRequest};
use crate::proxy::Proxy;
use crate::Error;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Relays the raw upstream JSON (`{ chatHistory }` in).
pub const PASSTHROUGH_ROUTE: &str = "/.netlify/functions/ask-wise-owl";
/// Composes a new user turn and answers `{ text }`.
pub const COMPOSED_ROUTE: &str = "/.netlify/functions/gemini-proxy";

const MISSING_KEY_MESSAGE: &str = "API sleutel is niet geconfigureerd op de server.";
const INTERNAL_ERROR_MESSAGE: &str = "Interne serverfout in de proxy-functie.";

#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<Proxy>,
}

pub fn create_router(proxy: Arc<Proxy>, max_body_bytes: usize) -> Router {
    let state = AppState { proxy };

    Router::new()
        .route(
            PASSTHROUGH_ROUTE,
            post(passthrough_handler).fallback(method_not_allowed),
        )
        .route(
            COMPOSED_ROUTE,
            post(composed_handler).fallback(method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
        // Middleware layers (applied in reverse order)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

async fn passthrough_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<ProxyReply, Error> {
    let request: PassthroughRequest = parse_body(&body)?;
    state.proxy.handle(request.into()).await
}

async fn composed_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<ProxyReply, Error> {
    let request: ComposedRequest = parse_body(&body)?;
    state.proxy.handle(ProxyRequest::from(request)).await
}

async fn method_not_allowed() -> Error {
    Error::MethodNotAllowed
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::error!("Failed to parse request body: {}", e);
        Error::MalformedInput(e.to_string())
    })
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("Handler panicked: {}", details);

    Error::Generic(details).into_response()
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Debug, Serialize)]
struct TextBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl IntoResponse for ProxyReply {
    fn into_response(self) -> Response {
        match self {
            ProxyReply::Relay(body) => (
                [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
                Json(body),
            )
                .into_response(),
            ProxyReply::Text(text) => Json(TextBody { text }).into_response(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response()
            }
            Error::MissingConfig(details) => {
                tracing::error!("Missing configuration: {}", details);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    MISSING_KEY_MESSAGE.to_string(),
                    Some(details),
                )
            }
            Error::Upstream { status, message } => error_response(
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                message,
                None,
            ),
            other => {
                tracing::error!("Proxy function error: {}", other);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MESSAGE.to_string(),
                    Some(other.to_string()),
                )
            }
        }
    }
}

fn error_response(status: StatusCode, message: String, details: Option<String>) -> Response {
    (status, Json(ErrorBody { message, details })).into_response()
}
