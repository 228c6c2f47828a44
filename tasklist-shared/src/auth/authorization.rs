/// Ownership checks for tasks
///
/// Every task belongs to exactly one user and only that user may read, change
/// or delete it. There are no roles, no delegation and no admin override.
///
/// Handlers fetch the task first, then call [`require_ownership`]. A denial must
/// be answered exactly like a missing task so that probing ids reveals nothing:
///
/// ```text
/// fetch(id) ── None ───────────────┐
///     │                            ├──▶ 404 Task not found
///     └─ Some(task) ── Denied ─────┘
///                  └── Allowed ──▶ handler continues
/// ```
///
/// # Example
///
/// ```
/// use tasklist_shared::auth::authorization::{authorize, require_ownership, Decision, TaskAction};
/// use tasklist_shared::auth::middleware::AuthContext;
///
/// assert_eq!(authorize(7, 7), Decision::Allowed);
/// assert_eq!(authorize(7, 8), Decision::Denied);
///
/// let caller = AuthContext::new(8);
/// assert!(require_ownership(&caller, 7, TaskAction::Delete).is_err());
/// ```

use std::fmt;

use tracing::warn;

use super::middleware::AuthContext;

/// Outcome of an ownership check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied,
}

/// What the caller is trying to do with the task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Read,
    Update,
    Delete,
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskAction::Read => "read",
            TaskAction::Update => "update",
            TaskAction::Delete => "delete",
        })
    }
}

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Caller doesn't own the resource
    #[error("Not authorized to {action} this resource")]
    NotOwner { action: TaskAction },
}

/// Compares a resource's owner with the caller
pub fn authorize(owner_id: i64, caller_id: i64) -> Decision {
    if owner_id == caller_id {
        Decision::Allowed
    } else {
        Decision::Denied
    }
}

/// Fails unless the authenticated caller owns the resource
///
/// Denials are logged at `warn` with both ids so repeated probing shows up in
/// the logs even though the client only ever sees a 404.
pub fn require_ownership(
    auth: &AuthContext,
    owner_id: i64,
    action: TaskAction,
) -> Result<(), AuthzError> {
    match authorize(owner_id, auth.user_id) {
        Decision::Allowed => Ok(()),
        Decision::Denied => {
            warn!(
                caller_id = auth.user_id,
                owner_id,
                action = %action,
                "Ownership check denied"
            );
            Err(AuthzError::NotOwner { action })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_exact_equality() {
        assert_eq!(authorize(1, 1), Decision::Allowed);
        assert_eq!(authorize(1, 2), Decision::Denied);
        assert_eq!(authorize(2, 1), Decision::Denied);
        assert_eq!(authorize(0, 0), Decision::Allowed);
        assert_eq!(authorize(-1, 1), Decision::Denied);
    }

    #[test]
    fn test_require_ownership() {
        let owner = AuthContext::new(10);
        let stranger = AuthContext::new(11);

        for action in [TaskAction::Read, TaskAction::Update, TaskAction::Delete] {
            assert!(require_ownership(&owner, 10, action).is_ok());
            assert_eq!(
                require_ownership(&stranger, 10, action),
                Err(AuthzError::NotOwner { action })
            );
        }
    }

    #[test]
    fn test_authz_error_display() {
        let err = AuthzError::NotOwner {
            action: TaskAction::Update,
        };
        assert_eq!(err.to_string(), "Not authorized to update this resource");
    }
}
