//! Client identity supplied by the authentication collaborator.
//!
//! The gateway treats both the user id and the permission set as opaque
//! inputs resolved at connection accept time. In this implementation
//! they arrive as query parameters on the upgrade request; swapping in
//! a real authenticator only touches this module.

use std::collections::HashSet;

use serde::Deserialize;

/// Permission required for mutating commands.
pub const PERMISSION_WRITE: &str = "write";

/// Permission required for queries and streaming.
pub const PERMISSION_READ: &str = "read";

/// Raw identity query parameters on the upgrade request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityParams {
    /// Opaque user identifier.
    pub user_id: Option<String>,
    /// Comma-separated capability list (e.g. `"read,write"`).
    pub permissions: Option<String>,
}

/// Resolved identity attached to a connection.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    /// Opaque user identifier, when supplied.
    pub user_id: Option<String>,
    /// Capability strings. `read` and `write` are the ones this system
    /// distinguishes.
    pub permissions: HashSet<String>,
}

impl ClientIdentity {
    /// Resolves an identity from upgrade-request query parameters.
    ///
    /// Connections without an explicit permission list default to
    /// read-only access.
    #[must_use]
    pub fn from_params(params: &IdentityParams) -> Self {
        let permissions: HashSet<String> = match &params.permissions {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
            None => std::iter::once(PERMISSION_READ.to_string()).collect(),
        };
        Self {
            user_id: params.user_id.clone(),
            permissions,
        }
    }

    /// Returns `true` if the connection may run queries and stream.
    #[must_use]
    pub fn can_read(&self) -> bool {
        self.permissions.contains(PERMISSION_READ)
    }

    /// Returns `true` if the connection may run mutating commands.
    #[must_use]
    pub fn can_write(&self) -> bool {
        self.permissions.contains(PERMISSION_WRITE)
    }
}
