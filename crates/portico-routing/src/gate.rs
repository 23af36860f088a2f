//! Module access gate
//!
//! Decides, fresh on every request, whether a module key may be dispatched
//! for an organization. The user-facing outcome collapses "unknown",
//! "disabled" and "enabled but unregistered" into the same 404; the log
//! stream keeps them apart.

use std::sync::Arc;
use tracing::{debug, error};

use portico_core::Result;
use portico_core::directory::Directory;
use portico_core::module::{ModuleHandler, ModuleRegistry, sanitize_key};
use portico_core::tenant::OrgId;

/// Outcome of a gate check.
pub enum AccessDecision {
    /// Enabled for the org and registered; dispatch may proceed.
    Enabled(Arc<dyn ModuleHandler>),
    /// Garbage key, invalid org, unknown module, or disabled for this org.
    Disabled,
    /// Enabled in the directory but no handler registered. Same 404 as
    /// `Disabled` for the user; a configuration failure in the logs.
    Missing,
}

impl AccessDecision {
    pub fn is_enabled(&self) -> bool {
        matches!(self, AccessDecision::Enabled(_))
    }
}

pub struct AccessGate {
    directory: Arc<dyn Directory>,
    registry: Arc<ModuleRegistry>,
}

impl AccessGate {
    pub fn new(directory: Arc<dyn Directory>, registry: Arc<ModuleRegistry>) -> Self {
        Self {
            directory,
            registry,
        }
    }

    /// Evaluate `(org, key)`. Never cached across requests; an admin may
    /// toggle enablement at any time.
    pub async fn check(&self, org_id: OrgId, raw_key: &str) -> Result<AccessDecision> {
        let key = sanitize_key(raw_key);
        if key.is_empty() || !org_id.is_valid() {
            debug!(%org_id, raw_key, "gate: unusable key or org");
            return Ok(AccessDecision::Disabled);
        }

        if !self.directory.module_enabled(org_id, &key).await? {
            debug!(%org_id, key, "gate: module disabled or unknown");
            return Ok(AccessDecision::Disabled);
        }

        match self.registry.get(&key) {
            Some(handler) => Ok(AccessDecision::Enabled(handler)),
            None => {
                error!(%org_id, key, "gate: module enabled but no handler registered");
                Ok(AccessDecision::Missing)
            }
        }
    }
}
