//! Reserved tenant-core pages
//!
//! `dashboard`, `settings`, `users` and the directory check resolve before
//! any module dispatch. One `TenantPages` controller is built per request;
//! it goes through the per-controller context cache exactly like a module
//! controller would, and renders through the host-provided `Renderer`.

use http::Method;
use percent_encoding::percent_decode_str;
use serde_json::{Value, json};
use tracing::debug;

use portico_core::directory::Directory;
use portico_core::page::Page;
use portico_core::render::Renderer;
use portico_core::request::RequestInfo;
use portico_core::session::Session;
use portico_core::tenant::TenantContext;
use portico_core::{Error, Result};

use crate::controller::{ContextOverrides, ControllerContext, LAYOUT_HINT_KEY};

/// Session key prefix for per-org settings submitted through the form.
const SETTINGS_KEY_PREFIX: &str = "settings.org";

pub struct TenantPages<'a> {
    org: &'a TenantContext,
    req: &'a RequestInfo,
    session: &'a dyn Session,
    renderer: &'a dyn Renderer,
    directory: &'a dyn Directory,
    context: ControllerContext,
}

impl<'a> TenantPages<'a> {
    pub fn new(
        org: &'a TenantContext,
        req: &'a RequestInfo,
        session: &'a dyn Session,
        renderer: &'a dyn Renderer,
        directory: &'a dyn Directory,
    ) -> Self {
        Self {
            org,
            req,
            session,
            renderer,
            directory,
            context: ControllerContext::new(),
        }
    }

    fn base(&self) -> String {
        format!("/t/{}", self.org.org_slug)
    }

    fn render(&self, view: &str, mut data: Value) -> Result<Page> {
        let ctx = self.context.ctx(
            self.org,
            &self.req.method,
            &self.base(),
            self.session,
            None,
        );
        if let Some(map) = data.as_object_mut() {
            map.insert("org_name".into(), json!(ctx.org_name));
            map.insert("org_slug".into(), json!(ctx.org_slug));
            map.insert("base".into(), json!(ctx.module_base));
            map.insert("layout".into(), json!(ctx.layout));
        }
        Ok(Page::html(self.renderer.render(view, &data)?))
    }

    pub fn dashboard(&self) -> Result<Page> {
        self.render("tenant/dashboard", json!({}))
    }

    /// Settings form. GET renders the stored values; POST stores the
    /// submitted pairs in the session and redirects back to the form.
    pub fn settings(&self) -> Result<Page> {
        // Pin the form layout before the shared render path resolves the
        // context; the cache answers every later call with this one.
        let overrides = ContextOverrides {
            layout: Some("form".into()),
            scope: None,
        };
        self.context.ctx(
            self.org,
            &self.req.method,
            &self.base(),
            self.session,
            Some(&overrides),
        );

        let key = format!("{}{}", SETTINGS_KEY_PREFIX, self.org.org_id);
        if self.req.method == Method::GET {
            let stored = self.session.get(&key).unwrap_or_else(|| json!({}));
            self.render("tenant/settings", json!({ "settings": stored }))
        } else if self.req.method == Method::POST {
            let submitted = parse_form(&self.req.body);
            debug!(org = %self.org.org_id, fields = submitted.len(), "settings updated");
            // A submitted layout preference becomes the session hint the
            // context cache consults on later requests.
            if let Some((_, layout)) = submitted.iter().find(|(name, _)| name == "layout") {
                self.session.insert(LAYOUT_HINT_KEY, json!(layout));
            }
            self.session.insert(&key, json!(submitted));
            Ok(Page::redirect_temporary(format!("{}/settings", self.base())))
        } else {
            Err(Error::RouteNotFound(self.req.path.clone()))
        }
    }

    pub fn users(&self, tail: &str) -> Result<Page> {
        self.render("tenant/users", json!({ "section": tail }))
    }

    /// Directory connectivity check. A successful lookup round-trip means
    /// the backing store is reachable; the result content is irrelevant.
    pub async fn dbcheck(&self) -> Result<Page> {
        self.directory.org_by_slug(&self.org.org_slug).await?;
        if self.req.wants_json() {
            Ok(Page::json(json!({ "ok": true, "directory": "ok" })))
        } else {
            Ok(Page::text("directory ok"))
        }
    }
}

/// Minimal application/x-www-form-urlencoded decoding: pairs split on '&'
/// and '=', '+' as space, percent-escapes decoded lossily.
fn parse_form(body: &[u8]) -> Vec<(String, String)> {
    let text = String::from_utf8_lossy(body);
    text.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(name), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use portico_core::directory::{OrgRecord, StaticDirectory};
    use portico_core::page::Body;
    use portico_core::session::MemorySession;
    use portico_core::tenant::OrgId;

    struct EchoRenderer;

    impl Renderer for EchoRenderer {
        fn render(&self, view: &str, data: &Value) -> Result<String> {
            Ok(format!("{view}:{data}"))
        }
    }

    fn acme() -> TenantContext {
        TenantContext::new(OrgId::new(7), "acme", "Acme Corp")
    }

    fn directory() -> StaticDirectory {
        StaticDirectory::new().with_org(OrgRecord {
            id: OrgId::new(7),
            slug: "acme".into(),
            name: "Acme Corp".into(),
            active: true,
        })
    }

    #[test]
    fn test_parse_form() {
        assert_eq!(
            parse_form(b"name=Acme+Corp&tz=Asia%2FKathmandu"),
            vec![
                ("name".to_string(), "Acme Corp".to_string()),
                ("tz".to_string(), "Asia/Kathmandu".to_string()),
            ]
        );
        assert_eq!(parse_form(b""), vec![]);
        assert_eq!(parse_form(b"flag"), vec![("flag".to_string(), String::new())]);
    }

    #[test]
    fn test_dashboard_renders_context() {
        let org = acme();
        let req = RequestInfo::new(Method::GET, "/t/acme/dashboard", "/t/acme/dashboard");
        let session = MemorySession::new();
        let renderer = EchoRenderer;
        let directory = directory();
        let pages = TenantPages::new(&org, &req, &session, &renderer, &directory);

        let page = pages.dashboard().unwrap();
        match page.body() {
            Body::Html(html) => {
                assert!(html.starts_with("tenant/dashboard:"));
                assert!(html.contains("Acme Corp"));
                assert!(html.contains("/t/acme"));
            }
            other => panic!("expected html body, got {other:?}"),
        }
    }

    #[test]
    fn test_settings_get_uses_the_pinned_form_layout() {
        let org = acme();
        let req = RequestInfo::new(Method::GET, "/t/acme/settings", "/t/acme/settings");
        let session = MemorySession::new();
        let renderer = EchoRenderer;
        let directory = directory();
        let pages = TenantPages::new(&org, &req, &session, &renderer, &directory);

        let page = pages.settings().unwrap();
        match page.body() {
            Body::Html(html) => assert!(html.contains("\"layout\":\"form\"")),
            other => panic!("expected html body, got {other:?}"),
        }
    }

    #[test]
    fn test_settings_post_stores_and_redirects() {
        let org = acme();
        let req = RequestInfo::new(Method::POST, "/t/acme/settings", "/t/acme/settings")
            .with_body(Bytes::from_static(b"name=Acme"));
        let session = MemorySession::new();
        let renderer = EchoRenderer;
        let directory = directory();
        let pages = TenantPages::new(&org, &req, &session, &renderer, &directory);

        let page = pages.settings().unwrap();
        assert_eq!(page.status(), http::StatusCode::FOUND);
        assert_eq!(page.location(), Some("/t/acme/settings"));
        assert!(session.get("settings.org7").is_some());
    }

    #[test]
    fn test_settings_post_updates_layout_hint() {
        let org = acme();
        let req = RequestInfo::new(Method::POST, "/t/acme/settings", "/t/acme/settings")
            .with_body(Bytes::from_static(b"name=Acme&layout=compact"));
        let session = MemorySession::new();
        let renderer = EchoRenderer;
        let directory = directory();
        let pages = TenantPages::new(&org, &req, &session, &renderer, &directory);

        pages.settings().unwrap();
        assert_eq!(session.get(LAYOUT_HINT_KEY), Some(json!("compact")));

        // The next request's controller picks the hint up.
        let req = RequestInfo::new(Method::GET, "/t/acme/dashboard", "/t/acme/dashboard");
        let pages = TenantPages::new(&org, &req, &session, &renderer, &directory);
        let page = pages.dashboard().unwrap();
        match page.body() {
            Body::Html(html) => assert!(html.contains("\"layout\":\"compact\"")),
            other => panic!("expected html body, got {other:?}"),
        }
    }

    #[test]
    fn test_settings_rejects_other_methods() {
        let org = acme();
        let req = RequestInfo::new(Method::DELETE, "/t/acme/settings", "/t/acme/settings");
        let session = MemorySession::new();
        let renderer = EchoRenderer;
        let directory = directory();
        let pages = TenantPages::new(&org, &req, &session, &renderer, &directory);

        assert!(pages.settings().unwrap_err().is_routing_failure());
    }

    #[tokio::test]
    async fn test_dbcheck_negotiates_body() {
        let org = acme();
        let session = MemorySession::new();
        let renderer = EchoRenderer;
        let directory = directory();

        let req = RequestInfo::new(Method::GET, "/t/acme/_dbcheck", "/t/acme/_dbcheck");
        let pages = TenantPages::new(&org, &req, &session, &renderer, &directory);
        assert_eq!(pages.dbcheck().await.unwrap().body(), &Body::Text("directory ok".into()));

        let req = RequestInfo::new(Method::GET, "/t/acme/_dbcheck", "/t/acme/_dbcheck")
            .with_accept("application/json");
        let pages = TenantPages::new(&org, &req, &session, &renderer, &directory);
        let page = pages.dbcheck().await.unwrap();
        assert_eq!(page.content_type(), "application/json");
    }
}
