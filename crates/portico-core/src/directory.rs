//! Organization directory and module-enablement lookups
//!
//! The `Directory` trait abstracts the platform's organization records and
//! per-org module enablement. Backing storage is opaque to the dispatch
//! layer; this crate ships a config-seeded in-process implementation for
//! single-node deployments and tests. Enablement is read-only here; admin
//! tooling writes it elsewhere, which is why every check is evaluated fresh
//! per request and never cached.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::tenant::OrgId;
use crate::Result;

/// One organization as the directory knows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgRecord {
    pub id: OrgId,
    pub slug: String,
    pub name: String,
    pub active: bool,
}

/// Directory of organizations and their enabled modules.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Look up an organization by URL slug. Returns the record whether or
    /// not it is active; callers decide what inactive means for them.
    async fn org_by_slug(&self, slug: &str) -> Result<Option<OrgRecord>>;

    /// Whether `key` is enabled for the given organization. Must be
    /// re-evaluated on every request, since an admin may toggle it at any time.
    async fn module_enabled(&self, org_id: OrgId, key: &str) -> Result<bool>;
}

/// In-process directory seeded at startup.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    orgs: HashMap<String, OrgRecord>,
    enabled: HashSet<(i64, String)>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_org(mut self, record: OrgRecord) -> Self {
        self.orgs.insert(record.slug.clone(), record);
        self
    }

    pub fn enable_module(mut self, org_id: OrgId, key: impl Into<String>) -> Self {
        self.enabled.insert((org_id.get(), key.into()));
        self
    }

    pub fn org_count(&self) -> usize {
        self.orgs.len()
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn org_by_slug(&self, slug: &str) -> Result<Option<OrgRecord>> {
        Ok(self.orgs.get(slug).cloned())
    }

    async fn module_enabled(&self, org_id: OrgId, key: &str) -> Result<bool> {
        if !org_id.is_valid() {
            return Ok(false);
        }
        Ok(self.enabled.contains(&(org_id.get(), key.to_string())))
    }
}
