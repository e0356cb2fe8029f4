//! Permission gate for privileged operations.

use marquee_types::PermissionSet;

use crate::backend::{AccessToken, EventBackend};
use crate::error::CoreError;

/// Resolve the caller's permission set, or `None` if unauthenticated.
///
/// # Errors
///
/// Returns [`CoreError::Backend`] if the permission lookup fails.
pub async fn caller_permissions<B: EventBackend>(
    backend: &B,
    caller: Option<&AccessToken>,
) -> Result<Option<PermissionSet>, CoreError> {
    match caller {
        Some(token) => Ok(backend.caller_permissions(token).await?),
        None => Ok(None),
    }
}

/// Require `permission` in the caller's permission set.
///
/// A missing token, an unknown token, and a token without the permission
/// all yield [`CoreError::Forbidden`].
///
/// # Errors
///
/// Returns [`CoreError::Forbidden`] as described above, or
/// [`CoreError::Backend`] if the permission lookup fails.
pub async fn require_permission<B: EventBackend>(
    backend: &B,
    caller: Option<&AccessToken>,
    permission: &str,
) -> Result<PermissionSet, CoreError> {
    let perms = caller_permissions(backend, caller).await?;

    match perms {
        Some(perms) if perms.contains(permission) => Ok(perms),
        _ => {
            tracing::warn!(
                permission,
                authenticated = caller.is_some(),
                "permission check failed"
            );
            Err(CoreError::Forbidden)
        }
    }
}
