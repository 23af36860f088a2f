//! Module dispatch and legacy-URL redirection
//!
//! The canonical module route is `/t/{slug}/apps/{key}[/...]`. Two legacy
//! forms survive as permanent redirects: the old `modules/` area and the
//! bare `/t/{slug}/{key}` alias. Neither redirect is ever issued for a
//! module the gate does not confirm as enabled, so redirects cannot be used
//! to probe which modules exist.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

use portico_core::directory::Directory;
use portico_core::module::{ModuleContext, ModuleRegistry, sanitize_key};
use portico_core::page::Page;
use portico_core::request::RequestInfo;
use portico_core::tenant::TenantContext;
use portico_core::{Error, Result};

use crate::gate::{AccessDecision, AccessGate};

/// First path segments that are never treated as module keys.
pub const RESERVED_SEGMENTS: &[&str] =
    &["dashboard", "settings", "users", "_dbcheck", "apps", "modules"];

pub fn is_reserved(segment: &str) -> bool {
    RESERVED_SEGMENTS.contains(&segment)
}

static MODULE_TAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(apps|modules)/([A-Za-z0-9_-]+)(?:/(.*))?$").expect("module tail pattern")
});

/// Which URL area a module route came in through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    /// Canonical `apps/` form.
    Apps,
    /// Legacy `modules/` alias.
    Modules,
}

/// A tenant tail parsed as a module route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRoute {
    pub area: Area,
    pub raw_key: String,
    pub rest: String,
}

/// Match a tenant tail against the module-route grammar.
pub fn match_module_tail(tail: &str) -> Option<ModuleRoute> {
    let captures = MODULE_TAIL.captures(tail)?;
    let area = match captures.get(1).map(|m| m.as_str()) {
        Some("apps") => Area::Apps,
        Some("modules") => Area::Modules,
        _ => return None,
    };
    Some(ModuleRoute {
        area,
        raw_key: captures.get(2).map(|m| m.as_str()).unwrap_or("").to_string(),
        rest: captures.get(3).map(|m| m.as_str()).unwrap_or("").to_string(),
    })
}

pub struct Dispatcher {
    gate: AccessGate,
}

impl Dispatcher {
    pub fn new(directory: Arc<dyn Directory>, registry: Arc<ModuleRegistry>) -> Self {
        Self {
            gate: AccessGate::new(directory, registry),
        }
    }

    /// Dispatch a parsed module route for a resolved tenant.
    ///
    /// The legacy `modules/` area 301s to the canonical `apps` form,
    /// preserving the rest of the path. Disabled, unknown and unregistered
    /// modules all surface as errors that render as the same generic 404.
    pub async fn dispatch(
        &self,
        org: &TenantContext,
        req: &RequestInfo,
        route: ModuleRoute,
    ) -> Result<Page> {
        let key = sanitize_key(&route.raw_key);
        match self.gate.check(org.org_id, &route.raw_key).await? {
            AccessDecision::Enabled(handler) => match route.area {
                Area::Modules => {
                    let location = canonical_url(&org.org_slug, &key, &route.rest);
                    debug!(%location, "legacy modules/ area, redirecting");
                    Ok(Page::redirect_permanent(location))
                }
                Area::Apps => {
                    let ctx = ModuleContext::new(org.clone(), req.method.clone(), key, route.rest);
                    debug!(module = %ctx.module_key, tail = %ctx.tail, "dispatching");
                    handler.serve(ctx, req).await
                }
            },
            AccessDecision::Disabled => Err(Error::ModuleNotEnabled {
                org_id: org.org_id.get(),
                key,
            }),
            AccessDecision::Missing => Err(Error::ModuleEntryMissing(key)),
        }
    }

    /// Bare legacy alias: `/t/{slug}/{key}[/...]` where `{key}` is not a
    /// reserved segment. Redirects to the canonical form only when the gate
    /// confirms the module is enabled; everything else falls through to the
    /// caller's generic 404.
    pub async fn legacy_redirect(
        &self,
        org: &TenantContext,
        tail: &str,
    ) -> Result<Option<Page>> {
        let (head, rest) = match tail.split_once('/') {
            Some((head, rest)) => (head, rest),
            None => (tail, ""),
        };
        if head.is_empty() || is_reserved(head) {
            return Ok(None);
        }

        match self.gate.check(org.org_id, head).await? {
            AccessDecision::Enabled(_) => {
                let key = sanitize_key(head);
                let location = canonical_url(&org.org_slug, &key, rest);
                debug!(%location, "bare legacy alias, redirecting");
                Ok(Some(Page::redirect_permanent(location)))
            }
            AccessDecision::Disabled | AccessDecision::Missing => Ok(None),
        }
    }
}

fn canonical_url(slug: &str, key: &str, rest: &str) -> String {
    if rest.is_empty() {
        format!("/t/{slug}/apps/{key}")
    } else {
        format!("/t/{slug}/apps/{key}/{rest}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use http::Method;
    use portico_core::directory::{OrgRecord, StaticDirectory};
    use portico_core::module::ModuleHandler;
    use portico_core::page::Body;
    use portico_core::tenant::OrgId;

    struct EchoModule;

    #[async_trait]
    impl ModuleHandler for EchoModule {
        async fn serve(&self, ctx: ModuleContext, _req: &RequestInfo) -> Result<Page> {
            Ok(Page::text(format!("{}|{}", ctx.module_base, ctx.tail)))
        }
    }

    fn acme() -> TenantContext {
        TenantContext::new(OrgId::new(7), "acme", "Acme Corp")
    }

    fn dispatcher() -> Dispatcher {
        let directory = Arc::new(
            StaticDirectory::new()
                .with_org(OrgRecord {
                    id: OrgId::new(7),
                    slug: "acme".into(),
                    name: "Acme Corp".into(),
                    active: true,
                })
                .enable_module(OrgId::new(7), "pos"),
        );
        let mut registry = ModuleRegistry::new();
        registry.register("pos", Arc::new(EchoModule)).unwrap();
        Dispatcher::new(directory, Arc::new(registry))
    }

    fn req(path: &str) -> RequestInfo {
        RequestInfo::new(Method::GET, path, path)
    }

    #[test]
    fn test_match_module_tail() {
        let route = match_module_tail("apps/pos/branches/1").unwrap();
        assert_eq!(route.area, Area::Apps);
        assert_eq!(route.raw_key, "pos");
        assert_eq!(route.rest, "branches/1");

        let route = match_module_tail("modules/pos").unwrap();
        assert_eq!(route.area, Area::Modules);
        assert_eq!(route.rest, "");

        assert!(match_module_tail("apps").is_none());
        assert!(match_module_tail("apps/").is_none());
        assert!(match_module_tail("dashboard").is_none());
    }

    #[tokio::test]
    async fn test_dispatch_builds_frozen_context() {
        let page = dispatcher()
            .dispatch(
                &acme(),
                &req("/t/acme/apps/pos/branches"),
                match_module_tail("apps/pos/branches").unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(page.body(), &Body::Text("/t/acme/apps/pos|branches".into()));
    }

    #[tokio::test]
    async fn test_modules_area_redirects_to_canonical() {
        let page = dispatcher()
            .dispatch(
                &acme(),
                &req("/t/acme/modules/pos/x"),
                match_module_tail("modules/pos/x").unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(page.status(), http::StatusCode::MOVED_PERMANENTLY);
        assert_eq!(page.location(), Some("/t/acme/apps/pos/x"));
    }

    #[tokio::test]
    async fn test_disabled_module_is_an_error_in_both_areas() {
        for tail in ["apps/dms", "modules/dms"] {
            let err = dispatcher()
                .dispatch(&acme(), &req("/t/acme"), match_module_tail(tail).unwrap())
                .await
                .unwrap_err();
            assert!(err.is_routing_failure());
        }
    }

    #[tokio::test]
    async fn test_legacy_redirect_enabled_key() {
        let page = dispatcher()
            .legacy_redirect(&acme(), "pos/branches")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.status(), http::StatusCode::MOVED_PERMANENTLY);
        assert_eq!(page.location(), Some("/t/acme/apps/pos/branches"));
    }

    #[tokio::test]
    async fn test_legacy_redirect_never_leaks_disabled_modules() {
        assert!(
            dispatcher()
                .legacy_redirect(&acme(), "dms/x")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_legacy_redirect_skips_reserved_segments() {
        assert!(
            dispatcher()
                .legacy_redirect(&acme(), "dashboard")
                .await
                .unwrap()
                .is_none()
        );
    }
}
