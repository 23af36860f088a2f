//! Per-controller context cache
//!
//! Every controller (tenant-core pages here, module controllers elsewhere)
//! resolves its request context exactly once per instance and answers all
//! later calls from the cache, even when those calls pass different
//! override hints. First call wins. Existing modules rely on that quirk,
//! so it is preserved as observed; debug builds log when a later call
//! passes diverging overrides.

use http::Method;
use once_cell::sync::OnceCell;

use portico_core::session::Session;
use portico_core::tenant::TenantContext;

/// Session key for the user's preferred page layout.
pub const LAYOUT_HINT_KEY: &str = "ui.layout";

const DEFAULT_LAYOUT: &str = "app";
const DEFAULT_SCOPE: &str = "tenant";

/// Hints the first `ctx()` call may apply on top of the session and the
/// URL-derived tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextOverrides {
    pub layout: Option<String>,
    pub scope: Option<String>,
}

/// The memoized per-controller view of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContext {
    pub org_id: i64,
    pub org_slug: String,
    pub org_name: String,
    pub module_base: String,
    pub layout: String,
    pub scope: String,
    pub method: Method,
}

/// One cache per controller instance, one controller instance per request.
/// The cell is owned by the controller value, so the cache cannot survive
/// the request.
#[derive(Debug, Default)]
pub struct ControllerContext {
    cell: OnceCell<ResolvedContext>,
    first_overrides: OnceCell<ContextOverrides>,
}

impl ControllerContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the context, or return the already-resolved one.
    ///
    /// Merge order on the first call: explicit overrides, then the session
    /// layout hint, then URL-derived tenant values, then defaults. Later
    /// calls return the first result unchanged; their overrides are
    /// silently discarded.
    pub fn ctx(
        &self,
        org: &TenantContext,
        method: &Method,
        module_base: &str,
        session: &dyn Session,
        overrides: Option<&ContextOverrides>,
    ) -> &ResolvedContext {
        if let Some(resolved) = self.cell.get() {
            #[cfg(debug_assertions)]
            if let (Some(first), Some(later)) = (self.first_overrides.get(), overrides)
                && first != later
            {
                tracing::warn!(
                    ?first,
                    ?later,
                    "context already resolved; later overrides ignored"
                );
            }
            return resolved;
        }

        let _ = self
            .first_overrides
            .set(overrides.cloned().unwrap_or_default());

        self.cell.get_or_init(|| {
            let session_layout = session
                .get(LAYOUT_HINT_KEY)
                .and_then(|v| v.as_str().map(String::from));
            let layout = overrides
                .and_then(|o| o.layout.clone())
                .or(session_layout)
                .unwrap_or_else(|| DEFAULT_LAYOUT.to_string());
            let scope = overrides
                .and_then(|o| o.scope.clone())
                .unwrap_or_else(|| DEFAULT_SCOPE.to_string());

            ResolvedContext {
                org_id: org.org_id.get(),
                org_slug: org.org_slug.clone(),
                org_name: org.org_name.clone(),
                module_base: module_base.to_string(),
                layout,
                scope,
                method: method.clone(),
            }
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_core::session::MemorySession;
    use portico_core::tenant::OrgId;
    use serde_json::json;

    fn acme() -> TenantContext {
        TenantContext::new(OrgId::new(7), "acme", "Acme Corp")
    }

    #[test]
    fn test_first_call_resolves() {
        let cache = ControllerContext::new();
        let session = MemorySession::new();
        let ctx = cache.ctx(&acme(), &Method::GET, "/t/acme", &session, None);
        assert_eq!(ctx.org_id, 7);
        assert_eq!(ctx.layout, "app");
        assert_eq!(ctx.scope, "tenant");
        assert!(cache.is_resolved());
    }

    #[test]
    fn test_first_call_wins() {
        let cache = ControllerContext::new();
        let session = MemorySession::new();
        let first = ContextOverrides {
            layout: Some("bare".into()),
            scope: None,
        };
        let ctx = cache
            .ctx(&acme(), &Method::GET, "/t/acme", &session, Some(&first))
            .clone();
        assert_eq!(ctx.layout, "bare");

        let later = ContextOverrides {
            layout: Some("print".into()),
            scope: Some("admin".into()),
        };
        let again = cache.ctx(&acme(), &Method::GET, "/t/acme", &session, Some(&later));
        assert_eq!(again, &ctx);
        assert_eq!(again.layout, "bare");
        assert_eq!(again.scope, "tenant");
    }

    #[test]
    fn test_session_layout_hint_between_overrides_and_defaults() {
        let session = MemorySession::new();
        session.insert(LAYOUT_HINT_KEY, json!("compact"));

        let cache = ControllerContext::new();
        let ctx = cache.ctx(&acme(), &Method::GET, "/t/acme", &session, None);
        assert_eq!(ctx.layout, "compact");

        // An explicit override still beats the session hint.
        let cache = ControllerContext::new();
        let overrides = ContextOverrides {
            layout: Some("bare".into()),
            scope: None,
        };
        let ctx = cache.ctx(&acme(), &Method::GET, "/t/acme", &session, Some(&overrides));
        assert_eq!(ctx.layout, "bare");
    }
}
