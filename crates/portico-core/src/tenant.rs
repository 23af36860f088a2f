//! Tenant types for multi-tenant dispatch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric identifier of an organization.
///
/// A valid id is strictly positive; zero and negative values mean
/// "unresolved" and must never pass an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrgId(i64);

impl OrgId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }

    /// Whether this id refers to a resolved organization.
    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The resolved tenant for one request.
///
/// Invariant: `org_id.is_valid()` iff resolution succeeded. The context
/// lives for exactly one request; any session-cached hint must be
/// re-validated against the current URL slug before a new one is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantContext {
    pub org_id: OrgId,
    pub org_slug: String,
    pub org_name: String,
    pub resolved_at: DateTime<Utc>,
}

impl TenantContext {
    pub fn new(org_id: OrgId, org_slug: impl Into<String>, org_name: impl Into<String>) -> Self {
        Self {
            org_id,
            org_slug: org_slug.into(),
            org_name: org_name.into(),
            resolved_at: Utc::now(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.org_id.is_valid()
    }
}
