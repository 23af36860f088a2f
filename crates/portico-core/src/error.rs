//! Error types for Portico Core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Routing failures. All of these surface as a generic 404 so the
    // response never reveals whether a tenant or module exists.
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error("Module '{key}' not enabled for org {org_id}")]
    ModuleNotEnabled { org_id: i64, key: String },

    #[error("No route for path: {0}")]
    RouteNotFound(String),

    // Configuration failure: the directory says the module is enabled but no
    // handler is registered. Also a 404 to the user, logged at error level.
    #[error("Module '{0}' has no registered handler")]
    ModuleEntryMissing(String),

    #[error("Module registration error: {0}")]
    Registration(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Directory error: {0}")]
    Directory(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Routing failures map to 404 with a deliberately generic message.
    pub fn is_routing_failure(&self) -> bool {
        matches!(
            self,
            Error::TenantNotFound(_) | Error::ModuleNotEnabled { .. } | Error::RouteNotFound(_)
        )
    }

    /// Configuration failures map to 404 for the user but are
    /// operationally distinct from routing failures in logs.
    pub fn is_configuration_failure(&self) -> bool {
        matches!(self, Error::ModuleEntryMissing(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_failure_classification() {
        assert!(Error::TenantNotFound("acme".into()).is_routing_failure());
        assert!(
            Error::ModuleNotEnabled {
                org_id: 7,
                key: "pos".into()
            }
            .is_routing_failure()
        );
        assert!(Error::RouteNotFound("/x".into()).is_routing_failure());
        assert!(!Error::Internal("boom".into()).is_routing_failure());
    }

    #[test]
    fn test_configuration_failure_classification() {
        assert!(Error::ModuleEntryMissing("pos".into()).is_configuration_failure());
        assert!(!Error::ModuleEntryMissing("pos".into()).is_routing_failure());
        assert!(!Error::RouteNotFound("/x".into()).is_configuration_failure());
    }
}
