//! The immutable per-request value
//!
//! `RequestInfo` is derived exactly once at ingress and passed by reference
//! through the whole pipeline. Nothing below the HTTP adapter reads ambient
//! request state.

use bytes::Bytes;
use http::Method;

/// Everything the dispatch pipeline needs to know about a request.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    /// Canonical method (HEAD has already been mapped to GET).
    pub method: Method,
    /// The raw request path as received, before normalization.
    pub raw_path: String,
    /// Normalized path: prefix-stripped, percent-decoded, slash-collapsed.
    pub path: String,
    /// Raw query string, without the leading '?'.
    pub query: Option<String>,
    /// Accept header, verbatim.
    pub accept: Option<String>,
    /// Content-Type header, verbatim.
    pub content_type: Option<String>,
    /// X-Requested-With header, verbatim.
    pub requested_with: Option<String>,
    /// Request body, already read in full. Empty for GET.
    pub body: Bytes,
}

impl RequestInfo {
    pub fn new(method: Method, raw_path: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method,
            raw_path: raw_path.into(),
            path: path.into(),
            query: None,
            accept: None,
            content_type: None,
            requested_with: None,
            body: Bytes::new(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_requested_with(mut self, requested_with: impl Into<String>) -> Self {
        self.requested_with = Some(requested_with.into());
        self
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    /// Content negotiation for error bodies and API-style endpoints.
    ///
    /// JSON wins when the client says `Accept: application/json` without also
    /// preferring HTML, when the request was made via XMLHttpRequest, or when
    /// the request body itself is JSON.
    pub fn wants_json(&self) -> bool {
        if let Some(accept) = &self.accept {
            let accept = accept.to_ascii_lowercase();
            if accept.contains("application/json") && !accept.contains("text/html") {
                return true;
            }
        }
        if let Some(requested_with) = &self.requested_with
            && requested_with.eq_ignore_ascii_case("xmlhttprequest")
        {
            return true;
        }
        if let Some(content_type) = &self.content_type
            && content_type.to_ascii_lowercase().contains("application/json")
        {
            return true;
        }
        false
    }

    /// Per-request debug override: `?_debug=1` anywhere in the query string.
    pub fn debug_override(&self) -> bool {
        self.query
            .as_deref()
            .is_some_and(|q| q.split('&').any(|pair| pair == "_debug=1"))
    }
}
