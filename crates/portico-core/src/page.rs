//! Response page builder with deferred flush
//!
//! A `Page` accumulates status, headers and body while a request is being
//! handled and is converted to a transport response exactly once, at the
//! very end. On an error path the partially-built value is simply dropped
//! and a fresh error page is built instead, so the client never sees
//! partial output concatenated with an error banner.

use http::StatusCode;
use serde_json::Value;

/// Response body variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Text(String),
    Html(String),
    Json(Value),
}

#[derive(Debug, Clone)]
pub struct Page {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Body,
}

impl Page {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    /// 200 with a plain-text body.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: Vec::new(),
            body: Body::Text(body.into()),
        }
    }

    /// 200 with an HTML body.
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: Vec::new(),
            body: Body::Html(body.into()),
        }
    }

    /// 200 with a JSON body.
    pub fn json(value: Value) -> Self {
        Self {
            status: StatusCode::OK,
            headers: Vec::new(),
            body: Body::Json(value),
        }
    }

    /// 301 to `location`.
    pub fn redirect_permanent(location: impl Into<String>) -> Self {
        Self::new(StatusCode::MOVED_PERMANENTLY).with_header("Location", location)
    }

    /// 302 to `location`.
    pub fn redirect_temporary(location: impl Into<String>) -> Self {
        Self::new(StatusCode::FOUND).with_header("Location", location)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Append to a textual body. An empty body becomes text.
    pub fn append(&mut self, chunk: &str) {
        match &mut self.body {
            Body::Empty => self.body = Body::Text(chunk.to_string()),
            Body::Text(s) | Body::Html(s) => s.push_str(chunk),
            // JSON bodies are replaced wholesale, never appended to.
            Body::Json(_) => {}
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("location"))
            .map(|(_, value)| value.as_str())
    }

    /// Content type implied by the body variant.
    pub fn content_type(&self) -> &'static str {
        match &self.body {
            Body::Empty | Body::Text(_) => "text/plain; charset=utf-8",
            Body::Html(_) => "text/html; charset=utf-8",
            Body::Json(_) => "application/json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_page() {
        let page = Page::text("OK");
        assert_eq!(page.status(), StatusCode::OK);
        assert_eq!(page.body(), &Body::Text("OK".into()));
        assert_eq!(page.content_type(), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_redirects() {
        let page = Page::redirect_permanent("/t/acme/apps/pos/x");
        assert_eq!(page.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(page.location(), Some("/t/acme/apps/pos/x"));

        let page = Page::redirect_temporary("/t/acme/dashboard");
        assert_eq!(page.status(), StatusCode::FOUND);
        assert_eq!(page.location(), Some("/t/acme/dashboard"));
    }

    #[test]
    fn test_append_accumulates() {
        let mut page = Page::html("<p>one</p>");
        page.append("<p>two</p>");
        assert_eq!(page.body(), &Body::Html("<p>one</p><p>two</p>".into()));

        let mut page = Page::new(StatusCode::OK);
        page.append("chunk");
        assert_eq!(page.body(), &Body::Text("chunk".into()));
    }

    #[test]
    fn test_json_page() {
        let page = Page::json(json!({"ok": true}));
        assert_eq!(page.content_type(), "application/json");
    }

    #[test]
    fn test_with_status_and_header() {
        let page = Page::html("gone").with_status(StatusCode::NOT_FOUND).with_header("X-Kind", "routing");
        assert_eq!(page.status(), StatusCode::NOT_FOUND);
        assert_eq!(page.headers().len(), 1);
    }
}
