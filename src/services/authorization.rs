//! Role and wildcard-permission checks.
//!
//! Runs against an already validated authentication session's account.
//! Checks never downgrade scope: an unmet requirement is always a 403.

use std::sync::Arc;

use crate::errors::SecurityError;
use crate::models::Account;
use crate::repository::Repository;

#[derive(Clone)]
pub struct AuthorizationCheck {
    repository: Arc<dyn Repository>,
}

impl AuthorizationCheck {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Require the account to hold a role with the given name.
    pub async fn require_role(&self, account: &Account, name: &str) -> Result<(), SecurityError> {
        let roles = self.repository.roles_for_account(account.id).await?;
        if roles.iter().any(|role| role.name == name) {
            Ok(())
        } else {
            tracing::warn!(account_id = %account.id, role = name, "required role missing");
            Err(SecurityError::insufficient_role())
        }
    }

    /// Require the account to hold a permission whose wildcard satisfies
    /// `required`, e.g. `admin:*` satisfies `admin:update`.
    pub async fn require_permission(
        &self,
        account: &Account,
        required: &str,
    ) -> Result<(), SecurityError> {
        let permissions = self.repository.permissions_for_account(account.id).await?;
        if permissions
            .iter()
            .any(|p| wildcard_matches(&p.wildcard, required))
        {
            Ok(())
        } else {
            tracing::warn!(
                account_id = %account.id,
                permission = required,
                "required permission missing"
            );
            Err(SecurityError::insufficient_permission())
        }
    }
}

/// Whether a held wildcard satisfies a required capability string.
///
/// Segments are colon-separated. A held segment of `*` matches anything at
/// that position, and a trailing `*` matches any remaining suffix. A held
/// segment may list comma-separated alternatives (`printer:query,delete`).
pub fn wildcard_matches(held: &str, required: &str) -> bool {
    let held_segments: Vec<&str> = held.split(':').collect();
    let required_segments: Vec<&str> = required.split(':').collect();

    for (index, held_segment) in held_segments.iter().enumerate() {
        let Some(required_segment) = required_segments.get(index) else {
            return false;
        };
        if *held_segment == "*" {
            if index == held_segments.len() - 1 {
                return true;
            }
            continue;
        }
        if !held_segment.split(',').any(|alt| alt == *required_segment) {
            return false;
        }
    }
    held_segments.len() == required_segments.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_star_matches_any_suffix() {
        assert!(wildcard_matches("admin:*", "admin:update"));
        assert!(wildcard_matches("admin:*", "admin:update:all"));
        assert!(wildcard_matches("*:*", "anything:at-all"));
        assert!(wildcard_matches("*", "admin:update"));
    }

    #[test]
    fn exact_segments_must_match() {
        assert!(wildcard_matches("admin:update", "admin:update"));
        assert!(!wildcard_matches("admin:update", "admin:delete"));
        assert!(!wildcard_matches("printer:*", "admin:update"));
    }

    #[test]
    fn segment_counts_must_line_up_without_a_trailing_star() {
        assert!(!wildcard_matches("admin", "admin:update"));
        assert!(!wildcard_matches("admin:update:all", "admin:update"));
    }

    #[test]
    fn comma_segments_are_alternatives() {
        assert!(wildcard_matches("printer:query,delete", "printer:delete"));
        assert!(!wildcard_matches("printer:query,delete", "printer:update"));
    }
}
