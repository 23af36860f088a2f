//! Module handler contract and registry
//!
//! A module (POS, DMS, ...) is opaque to the dispatch layer: it exposes a
//! single entry point that receives a frozen `ModuleContext` and owns all
//! further routing and rendering. Modules are registered explicitly at
//! startup, so a broken deployment surfaces when the registry is built
//! rather than on the first request.

use async_trait::async_trait;
use http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::page::Page;
use crate::request::RequestInfo;
use crate::tenant::TenantContext;
use crate::{Error, Result};

/// Lower-case a raw module key and strip everything outside `[a-z0-9_-]`.
///
/// An empty result means the key was garbage; callers treat that the same
/// as an unknown module.
pub fn sanitize_key(raw: &str) -> String {
    raw.chars()
        .flat_map(|c| c.to_lowercase())
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect()
}

/// The frozen per-request context handed to a module's entry point.
///
/// Built once by the dispatcher and passed by value; the module cannot
/// mutate dispatcher state through it.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    pub org: TenantContext,
    pub method: Method,
    pub module_key: String,
    pub tail: String,
    pub module_base: String,
}

impl ModuleContext {
    pub fn new(
        org: TenantContext,
        method: Method,
        module_key: impl Into<String>,
        tail: impl Into<String>,
    ) -> Self {
        let module_key = module_key.into();
        let module_base = format!("/t/{}/apps/{}", org.org_slug, module_key);
        Self {
            org,
            method,
            module_key,
            tail: tail.into(),
            module_base,
        }
    }
}

/// A module's single entry point.
#[async_trait]
pub trait ModuleHandler: Send + Sync {
    async fn serve(&self, ctx: ModuleContext, req: &RequestInfo) -> Result<Page>;
}

/// Registry mapping sanitized module keys to handlers.
#[derive(Default)]
pub struct ModuleRegistry {
    handlers: HashMap<String, Arc<dyn ModuleHandler>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `key`. The key must already be in sanitized
    /// form and unique; anything else is a startup error.
    pub fn register(&mut self, key: &str, handler: Arc<dyn ModuleHandler>) -> Result<()> {
        if key.is_empty() || sanitize_key(key) != key {
            return Err(Error::Registration(format!("invalid module key: {key:?}")));
        }
        if self.handlers.contains_key(key) {
            return Err(Error::Registration(format!("duplicate module key: {key}")));
        }
        self.handlers.insert(key.to_string(), handler);
        debug!(key, "module handler registered");
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn ModuleHandler>> {
        self.handlers.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.handlers.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
