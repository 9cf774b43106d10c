/*!
 * # Auth Module
 *
 * Permission gating for the admin routes. Authentication itself happens
 * upstream: whatever authenticates the request places an [`AuthUser`] in the
 * request extensions, and the gate only decides whether that user may
 * proceed.
 */

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::ServiceError;

/// Permission string constants
pub mod consts {
    /// Required by every discount admin action.
    pub const MANAGE_PROMOTIONS: &str = "commerce-managePromotions";
}

pub const ADMIN_ROLE: &str = "admin";

/// The user a request acts on behalf of
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl AuthUser {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            roles: Vec::new(),
            permissions: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    /// Check if the user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Check if the user has a specific permission
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }
}

pub trait PermissionGate: Send + Sync {
    /// Fails with `Unauthorized` without a user and `Forbidden` when the user
    /// lacks `permission`.
    fn require_permission(
        &self,
        user: Option<&AuthUser>,
        permission: &str,
    ) -> Result<(), ServiceError>;
}

/// Grants what the user's own permission list grants. Admins pass every check.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserPermissionGate;

impl PermissionGate for UserPermissionGate {
    fn require_permission(
        &self,
        user: Option<&AuthUser>,
        permission: &str,
    ) -> Result<(), ServiceError> {
        let user = user.ok_or_else(|| {
            ServiceError::Unauthorized("Authentication required".to_string())
        })?;

        if user.is_admin() || user.has_permission(permission) {
            debug!(user_id = %user.user_id, permission, "Permission granted");
            return Ok(());
        }

        warn!(user_id = %user.user_id, permission, "Permission denied");
        Err(ServiceError::Forbidden(format!(
            "User {} lacks permission {}",
            user.user_id, permission
        )))
    }
}

/// State for [`permission_middleware`]: the gate and the permission it enforces.
#[derive(Clone)]
pub struct RequiredPermission {
    pub gate: Arc<dyn PermissionGate>,
    pub permission: &'static str,
}

/// Rejects the request unless the extension user holds the required permission.
pub async fn permission_middleware(
    State(required): State<RequiredPermission>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    required
        .gate
        .require_permission(request.extensions().get::<AuthUser>(), required.permission)?;
    Ok(next.run(request).await)
}

/// Development-only stand-in for the upstream authentication layer: every
/// request acts as a local admin.
pub async fn development_user_middleware(mut request: Request, next: Next) -> Response {
    request
        .extensions_mut()
        .insert(AuthUser::new("local-dev").with_role(ADMIN_ROLE));
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::consts::MANAGE_PROMOTIONS;
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn missing_user_is_unauthorized() {
        assert_matches!(
            UserPermissionGate.require_permission(None, MANAGE_PROMOTIONS),
            Err(ServiceError::Unauthorized(_))
        );
    }

    #[test]
    fn user_without_permission_is_forbidden() {
        let user = AuthUser::new("clerk").with_permission("orders:read");
        assert_matches!(
            UserPermissionGate.require_permission(Some(&user), MANAGE_PROMOTIONS),
            Err(ServiceError::Forbidden(_))
        );
    }

    #[test]
    fn explicit_permission_or_admin_role_passes() {
        let marketer = AuthUser::new("marketer").with_permission(MANAGE_PROMOTIONS);
        let admin = AuthUser::new("root").with_role(ADMIN_ROLE);
        assert!(UserPermissionGate
            .require_permission(Some(&marketer), MANAGE_PROMOTIONS)
            .is_ok());
        assert!(UserPermissionGate
            .require_permission(Some(&admin), MANAGE_PROMOTIONS)
            .is_ok());
    }
}
