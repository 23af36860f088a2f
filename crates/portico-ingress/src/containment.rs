//! Error containment
//!
//! Two independent triggers, an `Err` bubbling out of the pipeline and a
//! panic caught around the handler future, are both turned into an
//! `ErrorEvent` and rendered by the one shared `render_error`. A
//! `CatchPanicLayer` sits outermost with a literal plain-text 500 for the
//! case where rendering itself panics. Whatever happens, the client gets
//! exactly one well-formed document: redirect, page, 404 or 500. Never a
//! raw trace in production, never a blank or mixed response.

use chrono::{DateTime, Utc};
use http::StatusCode;
use serde_json::json;
use tracing::{debug, error};

use portico_core::Error;
use portico_core::page::Page;
use portico_core::request::RequestInfo;

/// Generic bodies. Deliberately uninformative: 404s must not reveal
/// whether a tenant or module exists, 500s must not leak internals.
const NOT_FOUND_MESSAGE: &str = "Not found.";
const ERROR_MESSAGE: &str = "Unexpected error.";

/// How the request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An error value returned by the pipeline.
    Exception,
    /// A panic caught around the handler.
    Fatal,
}

impl ErrorKind {
    fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Exception => "exception",
            ErrorKind::Fatal => "fatal",
        }
    }
}

/// Transient description of a failure; exists only to render a response.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub kind: ErrorKind,
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub wants_json: bool,
}

/// Classify a pipeline error.
///
/// Routing and configuration failures both render as the same generic 404;
/// they differ only in log level so operators can tell a toggled-off module
/// from a broken deployment. Everything else is a 500.
pub fn event_for(err: &Error, req: &RequestInfo) -> ErrorEvent {
    let (status, message) = if err.is_routing_failure() {
        debug!(%err, path = %req.path, "routing failure");
        (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)
    } else if err.is_configuration_failure() {
        error!(%err, path = %req.path, "configuration failure");
        (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)
    } else {
        error!(%err, path = %req.path, "unhandled error");
        (StatusCode::INTERNAL_SERVER_ERROR, ERROR_MESSAGE)
    };
    ErrorEvent {
        kind: ErrorKind::Exception,
        status,
        message: message.to_string(),
        detail: Some(err.to_string()),
        timestamp: Utc::now(),
        wants_json: req.wants_json(),
    }
}

/// Build the event for a caught panic.
pub fn fatal_event(panic_message: String, req: &RequestInfo) -> ErrorEvent {
    error!(message = %panic_message, path = %req.path, "fatal: panic in handler");
    ErrorEvent {
        kind: ErrorKind::Fatal,
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: ERROR_MESSAGE.to_string(),
        detail: Some(panic_message),
        timestamp: Utc::now(),
        wants_json: req.wants_json(),
    }
}

/// Extract a printable message from a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic of unknown type".to_string()
    }
}

/// Render an event as a complete response document.
///
/// Infallible by construction: both branches build their body from plain
/// literals and already-owned strings.
pub fn render_error(event: &ErrorEvent, debug_mode: bool) -> Page {
    if event.wants_json {
        let mut body = json!({ "ok": false, "error": event.message });
        if debug_mode {
            body["debug"] = json!({
                "kind": event.kind.as_str(),
                "detail": event.detail,
                "timestamp": event.timestamp.to_rfc3339(),
            });
        }
        Page::json(body).with_status(event.status)
    } else {
        let detail = if debug_mode {
            event
                .detail
                .as_deref()
                .map(|d| format!("<pre>{}</pre>\n", escape_html(d)))
                .unwrap_or_default()
        } else {
            String::new()
        };
        let html = format!(
            "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>{status}</title></head>\n\
             <body>\n<h1>{message}</h1>\n{detail}</body>\n</html>\n",
            status = event.status.as_u16(),
            message = escape_html(&event.message),
        );
        Page::html(html).with_status(event.status)
    }
}

/// Outermost safety net for `CatchPanicLayer`: the most primitive response
/// there is, used only when normal error rendering is suspect.
pub fn fallback_panic_response(
    _payload: Box<dyn std::any::Any + Send + 'static>,
) -> http::Response<axum::body::Body> {
    error!("fatal: panic escaped the handler, serving literal fallback");
    let mut response = http::Response::new(axum::body::Body::from(ERROR_MESSAGE));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use portico_core::page::Body;

    fn req_html() -> RequestInfo {
        RequestInfo::new(Method::GET, "/t/acme/x", "/t/acme/x").with_accept("text/html")
    }

    fn req_json() -> RequestInfo {
        RequestInfo::new(Method::GET, "/t/acme/x", "/t/acme/x").with_accept("application/json")
    }

    #[test]
    fn test_routing_and_configuration_failures_render_identically() {
        let routing = event_for(&Error::TenantNotFound("ghost".into()), &req_html());
        let config = event_for(&Error::ModuleEntryMissing("pos".into()), &req_html());
        assert_eq!(routing.status, StatusCode::NOT_FOUND);
        assert_eq!(config.status, StatusCode::NOT_FOUND);

        let a = render_error(&routing, false);
        let b = render_error(&config, false);
        assert_eq!(a.body(), b.body());
    }

    #[test]
    fn test_runtime_error_is_500() {
        let event = event_for(&Error::Internal("boom".into()), &req_html());
        assert_eq!(event.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(event.kind, ErrorKind::Exception);
    }

    #[test]
    fn test_json_envelope_shape() {
        let event = event_for(&Error::Internal("boom".into()), &req_json());
        let page = render_error(&event, false);
        match page.body() {
            Body::Json(value) => {
                assert_eq!(value["ok"], false);
                assert!(value["error"].is_string());
                assert!(value.get("debug").is_none());
            }
            other => panic!("expected json, got {other:?}"),
        }
    }

    #[test]
    fn test_debug_mode_gates_detail() {
        let event = event_for(&Error::Internal("boom".into()), &req_json());
        let page = render_error(&event, true);
        match page.body() {
            Body::Json(value) => {
                assert_eq!(value["debug"]["kind"], "exception");
                assert!(value["debug"]["detail"].as_str().unwrap().contains("boom"));
            }
            other => panic!("expected json, got {other:?}"),
        }

        let event = event_for(&Error::Internal("boom".into()), &req_html());
        let production = render_error(&event, false);
        match production.body() {
            Body::Html(html) => {
                assert!(!html.contains("boom"));
                assert!(html.contains("Unexpected error."));
            }
            other => panic!("expected html, got {other:?}"),
        }
    }

    #[test]
    fn test_html_banner_is_a_complete_document() {
        let event = fatal_event("worker died".into(), &req_html());
        let page = render_error(&event, true);
        match page.body() {
            Body::Html(html) => {
                assert!(html.starts_with("<!doctype html>"));
                assert!(html.ends_with("</html>\n"));
                assert!(html.contains("worker died"));
            }
            other => panic!("expected html, got {other:?}"),
        }
    }

    #[test]
    fn test_detail_is_escaped() {
        let event = fatal_event("<script>alert(1)</script>".into(), &req_html());
        let page = render_error(&event, true);
        match page.body() {
            Body::Html(html) => {
                assert!(!html.contains("<script>"));
                assert!(html.contains("&lt;script&gt;"));
            }
            other => panic!("expected html, got {other:?}"),
        }
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("static str panic");
        assert_eq!(panic_message(boxed.as_ref()), "static str panic");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned panic"));
        assert_eq!(panic_message(boxed.as_ref()), "owned panic");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(boxed.as_ref()), "panic of unknown type");
    }
}
