use std::fmt;

use serde::{Deserialize, Serialize};

/// A (tenant, service path) pair under which subscriptions are listed,
/// created and deleted independently.
///
/// An empty tenant or path selects the broker's default scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    /// Tenant, sent as `Fiware-Service`.
    pub tenant: String,
    /// Service path, sent as `Fiware-ServicePath`.
    pub path: String,
}

impl Scope {
    pub fn new(tenant: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            path: path.into(),
        }
    }

    /// Tenant header value, `None` for the default tenant.
    pub fn tenant_header(&self) -> Option<&str> {
        (!self.tenant.is_empty()).then_some(self.tenant.as_str())
    }

    /// Service path header value, `None` for the default path.
    pub fn path_header(&self) -> Option<&str> {
        (!self.path.is_empty()).then_some(self.path.as_str())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tenant {:?}, service path {:?}", self.tenant, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scope_has_no_headers() {
        let scope = Scope::default();
        assert_eq!(scope.tenant_header(), None);
        assert_eq!(scope.path_header(), None);
    }

    #[test]
    fn test_scope_headers() {
        let scope = Scope::new("smartcity", "/parking");
        assert_eq!(scope.tenant_header(), Some("smartcity"));
        assert_eq!(scope.path_header(), Some("/parking"));
        assert_eq!(
            scope.to_string(),
            r#"tenant "smartcity", service path "/parking""#
        );
    }
}
