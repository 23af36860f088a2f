//! The front controller
//!
//! One `handle()` call per request: liveness shortcut, tenant match,
//! reserved tenant-core routes, module dispatch, legacy redirects, and the
//! fail-closed 404s in between. Errors bubble up as `Err` and are rendered
//! by the containment layer above this crate.

use std::sync::Arc;
use tracing::debug;

use portico_core::directory::Directory;
use portico_core::module::ModuleRegistry;
use portico_core::page::Page;
use portico_core::render::Renderer;
use portico_core::request::RequestInfo;
use portico_core::session::Session;
use portico_core::{Error, Result};

use crate::dispatcher::{Dispatcher, match_module_tail};
use crate::pages::TenantPages;
use crate::resolver::TenantResolver;

/// Liveness path, served before any tenant or directory work.
pub const PING_PATH: &str = "/_ping";

pub struct FrontController {
    directory: Arc<dyn Directory>,
    renderer: Arc<dyn Renderer>,
    resolver: TenantResolver,
    dispatcher: Dispatcher,
}

impl FrontController {
    pub fn new(
        directory: Arc<dyn Directory>,
        registry: Arc<ModuleRegistry>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            resolver: TenantResolver::new(directory.clone()),
            dispatcher: Dispatcher::new(directory.clone(), registry),
            directory,
            renderer,
        }
    }

    /// Route one normalized request to a page, a redirect, or an error.
    pub async fn handle(&self, req: &RequestInfo, session: &dyn Session) -> Result<Page> {
        if req.path == PING_PATH {
            return Ok(Page::text("OK"));
        }

        let Some(tenant_tail) = req.path.strip_prefix("/t/") else {
            return Err(Error::RouteNotFound(req.path.clone()));
        };
        let (slug, tail) = match tenant_tail.split_once('/') {
            Some((slug, tail)) => (slug, tail),
            None => (tenant_tail, ""),
        };
        if slug.is_empty() {
            return Err(Error::RouteNotFound(req.path.clone()));
        }

        let org = self
            .resolver
            .resolve(slug, session)
            .await?
            .ok_or_else(|| Error::TenantNotFound(slug.to_string()))?;
        debug!(slug, org_id = %org.org_id, path = %req.path, "tenant resolved");

        if tail.is_empty() {
            return Ok(Page::redirect_temporary(format!("/t/{slug}/dashboard")));
        }

        let pages = TenantPages::new(
            &org,
            req,
            session,
            self.renderer.as_ref(),
            self.directory.as_ref(),
        );
        let (head, rest) = match tail.split_once('/') {
            Some((head, rest)) => (head, rest),
            None => (tail, ""),
        };
        match head {
            "dashboard" if rest.is_empty() => pages.dashboard(),
            "settings" if rest.is_empty() => pages.settings(),
            "users" => pages.users(rest),
            "_dbcheck" if rest.is_empty() => pages.dbcheck().await,
            "apps" | "modules" => {
                let route = match_module_tail(tail)
                    .ok_or_else(|| Error::RouteNotFound(req.path.clone()))?;
                self.dispatcher.dispatch(&org, req, route).await
            }
            _ => match self.dispatcher.legacy_redirect(&org, tail).await? {
                Some(redirect) => Ok(redirect),
                None => Err(Error::RouteNotFound(req.path.clone())),
            },
        }
    }
}
