//! Tenant resolution
//!
//! Maps a URL slug to an organization. Fails closed: an unresolved slug is
//! a 404 for the caller, and there is no default organization to fall
//! through to.

use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use portico_core::Result;
use portico_core::directory::Directory;
use portico_core::session::Session;
use portico_core::tenant::TenantContext;

/// Session key holding the last-known-good tenant hint.
pub const TENANT_HINT_KEY: &str = "tenant.hint";

pub struct TenantResolver {
    directory: Arc<dyn Directory>,
}

impl TenantResolver {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// Resolve `slug` to a tenant context, or `None` when the organization
    /// is unknown or inactive (indistinguishable to the caller).
    ///
    /// A last-known-good hint is kept in the session. The hint is advisory
    /// only: it is compared against the URL slug and the directory is
    /// consulted regardless, so a stale or forged hint can never authorize
    /// access to a different tenant.
    pub async fn resolve(
        &self,
        slug: &str,
        session: &dyn Session,
    ) -> Result<Option<TenantContext>> {
        let hinted_slug = session
            .get(TENANT_HINT_KEY)
            .and_then(|hint| hint.get("slug").and_then(|s| s.as_str().map(String::from)));
        match hinted_slug.as_deref() {
            Some(hinted) if hinted == slug => debug!(slug, "tenant hint warm"),
            Some(hinted) => {
                debug!(slug, hinted, "tenant hint stale, dropping");
                session.remove(TENANT_HINT_KEY);
            }
            None => {}
        }

        let Some(record) = self.directory.org_by_slug(slug).await? else {
            session.remove(TENANT_HINT_KEY);
            return Ok(None);
        };
        if !record.active || !record.id.is_valid() {
            session.remove(TENANT_HINT_KEY);
            return Ok(None);
        }

        session.insert(
            TENANT_HINT_KEY,
            json!({
                "org_id": record.id.get(),
                "slug": &record.slug,
                "name": &record.name,
            }),
        );
        Ok(Some(TenantContext::new(record.id, record.slug, record.name)))
    }
}
