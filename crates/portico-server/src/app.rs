//! Gateway state assembly with dependency-injected collaborators
//!
//! The server builds the directory, registry, session manager and renderer
//! once at startup and hands them to the ingress layer as a `GatewayState`.
//! Swapping any collaborator (a database-backed directory, a real template
//! engine) is a change here, not in the dispatch pipeline.

use serde_json::Value;
use std::sync::Arc;

use portico_core::Result;
use portico_core::module::ModuleRegistry;
use portico_core::render::Renderer;
use portico_core::session::SessionManager;
use portico_ingress::GatewayState;
use portico_routing::FrontController;

use crate::config::ServerConfig;

/// Minimal HTML-shell renderer for the tenant-core pages.
///
/// Real deployments wire a template engine behind the `Renderer` trait;
/// the shell keeps a bare install usable.
pub struct ShellRenderer;

impl Renderer for ShellRenderer {
    fn render(&self, view: &str, data: &Value) -> Result<String> {
        let title = data
            .get("org_name")
            .and_then(|v| v.as_str())
            .unwrap_or("Portico");
        Ok(format!(
            "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
             <body data-view=\"{view}\">\n<h1>{title}</h1>\n<pre>{data}</pre>\n</body>\n</html>\n",
            title = escape_html(title),
            view = escape_html(view),
            data = escape_html(&data.to_string()),
        ))
    }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Wire everything together for the ingress router.
pub fn build_state(config: &ServerConfig, registry: ModuleRegistry) -> GatewayState {
    let directory = Arc::new(config.build_directory());
    let controller = Arc::new(FrontController::new(
        directory,
        Arc::new(registry),
        Arc::new(ShellRenderer),
    ));
    GatewayState {
        controller,
        sessions: Arc::new(SessionManager::new()),
        debug: config.debug,
        mount_prefix: config.mount_prefix.clone(),
    }
}
