//! Portico HTTP Ingress
//!
//! Adapts the transport to the dispatch pipeline: derives the immutable
//! `RequestInfo` once per request, attaches the session, runs the front
//! controller inside the containment layer, and flushes the accumulated
//! `Page` to the wire exactly once at the end.

pub mod containment;
pub mod middleware;

use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    response::Response,
};
use futures::FutureExt;
use http::{HeaderValue, StatusCode, header};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;

use portico_core::page::{Body as PageBody, Page};
use portico_core::request::RequestInfo;
use portico_core::session::SessionManager;
use portico_routing::{FrontController, canonical_method, normalize_path};

pub use containment::{ErrorEvent, ErrorKind, render_error};

/// Session cookie name.
pub const SESSION_COOKIE: &str = "portico_sid";

/// Everything the gateway handler needs, injected once at startup.
#[derive(Clone)]
pub struct GatewayState {
    pub controller: Arc<FrontController>,
    pub sessions: Arc<SessionManager>,
    /// Global debug flag; individual requests may add `?_debug=1`.
    pub debug: bool,
    /// Hosting sub-directory prefix to strip from incoming paths.
    pub mount_prefix: String,
}

/// Build the gateway router. The whole URL space goes through the front
/// controller; the outermost panic layer serves a literal plain-text 500
/// should anything escape the in-handler containment.
pub fn gateway_router(state: GatewayState) -> Router {
    Router::new()
        .fallback(front_handler)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(CatchPanicLayer::custom(
            containment::fallback_panic_response,
        ))
        .with_state(state)
}

async fn front_handler(State(state): State<GatewayState>, req: Request) -> Response {
    let (parts, body) = req.into_parts();

    let raw_path = parts.uri.path().to_string();
    let query = parts.uri.query().map(String::from);
    let method = canonical_method(&parts.method);
    let path = normalize_path(&raw_path, &state.mount_prefix);

    let header_value = |name: header::HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };

    let mut info = RequestInfo::new(method, raw_path, path);
    if let Some(query) = query {
        info = info.with_query(query);
    }
    if let Some(accept) = header_value(header::ACCEPT) {
        info = info.with_accept(accept);
    }
    if let Some(content_type) = header_value(header::CONTENT_TYPE) {
        info = info.with_content_type(content_type);
    }
    if let Some(requested_with) = parts
        .headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
    {
        info = info.with_requested_with(requested_with.to_string());
    }
    if let Ok(bytes) = axum::body::to_bytes(body, usize::MAX).await {
        info = info.with_body(bytes);
    }

    let cookie_header = header_value(header::COOKIE);
    let incoming_sid = middleware::cookie_value(cookie_header.as_deref(), SESSION_COOKIE);
    let (sid, session) = state.sessions.attach(incoming_sid.as_deref());

    let debug_mode = state.debug || info.debug_override();

    // Exception hook: an Err from the pipeline. Fatal hook: a panic caught
    // here, which also drops whatever partial page the handler had built.
    let outcome = AssertUnwindSafe(state.controller.handle(&info, session.as_ref()))
        .catch_unwind()
        .await;
    let page = match outcome {
        Ok(Ok(page)) => page,
        Ok(Err(err)) => render_error(&containment::event_for(&err, &info), debug_mode),
        Err(payload) => {
            let message = containment::panic_message(payload.as_ref());
            render_error(&containment::fatal_event(message, &info), debug_mode)
        }
    };

    let mut response = flush_page(page);
    if incoming_sid.as_deref() != Some(sid.as_str())
        && let Ok(value) = HeaderValue::from_str(&format!(
            "{SESSION_COOKIE}={sid}; Path=/; HttpOnly; SameSite=Lax"
        ))
    {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

/// Convert the accumulated page into a transport response. This is the
/// single flush point; nothing is written to the wire before it.
fn flush_page(page: Page) -> Response {
    let mut builder = http::Response::builder().status(page.status());

    let mut has_content_type = false;
    for (name, value) in page.headers() {
        if name.eq_ignore_ascii_case("content-type") {
            has_content_type = true;
        }
        builder = builder.header(name.as_str(), value.as_str());
    }
    if !has_content_type {
        builder = builder.header(header::CONTENT_TYPE, page.content_type());
    }

    let body = match page.body() {
        PageBody::Empty => Body::empty(),
        PageBody::Text(text) => Body::from(text.clone()),
        PageBody::Html(html) => Body::from(html.clone()),
        PageBody::Json(value) => match serde_json::to_string(value) {
            Ok(json) => Body::from(json),
            // Unreachable for already-built Values; keep the literal
            // fallback anyway so the flush itself cannot fail.
            Err(_) => {
                return plain_500();
            }
        },
    };

    builder.body(body).unwrap_or_else(|_| plain_500())
}

fn plain_500() -> Response {
    let mut response = Response::new(Body::from("Unexpected error."));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}
