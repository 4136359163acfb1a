//! Narrow storage interface consumed by the engine and flows.
//!
//! Persistence is an external collaborator; the crate only assumes a store
//! that honors soft-deletion and reports uniqueness conflicts. Transient
//! storage failures are opaque to the core and re-raised unchanged.

use std::net::IpAddr;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::errors::SecurityError;
use crate::models::{Account, Permission, Role, Session};

mod memory;

pub use memory::InMemoryRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A unique constraint (email, username, phone) was violated. The store
    /// must not reveal which field collided.
    #[error("unique constraint violated")]
    Conflict,

    /// Transient storage failure, eligible for caller-side retry.
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}

impl From<RepositoryError> for SecurityError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // Deliberately generic so callers cannot enumerate accounts.
            RepositoryError::Conflict => SecurityError::account(
                "An account with these credentials may already exist.",
                http::StatusCode::CONFLICT,
            ),
            RepositoryError::Unavailable(e) => SecurityError::storage(e),
        }
    }
}

/// Soft-delete-aware persistence operations. Lookups never return records
/// flagged as deleted.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn create_account(&self, account: &Account) -> Result<(), RepositoryError>;
    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>, RepositoryError>;
    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError>;
    async fn account_by_username(&self, username: &str)
        -> Result<Option<Account>, RepositoryError>;
    async fn save_account(&self, account: &Account) -> Result<(), RepositoryError>;

    async fn create_session(&self, session: &Session) -> Result<(), RepositoryError>;
    async fn session_by_id(&self, id: Uuid) -> Result<Option<Session>, RepositoryError>;
    async fn save_session(&self, session: &Session) -> Result<(), RepositoryError>;

    /// Whether any authentication session for this account was issued from
    /// this IP. Backs the location-binding check.
    async fn authentication_ip_known(
        &self,
        account_id: Uuid,
        ip: IpAddr,
    ) -> Result<bool, RepositoryError>;

    /// Mark every authentication session of the account inactive. Used as a
    /// password-reset side effect.
    async fn revoke_authentication_sessions(&self, account_id: Uuid)
        -> Result<(), RepositoryError>;

    async fn create_role(&self, role: &Role) -> Result<(), RepositoryError>;
    async fn role_by_name(&self, name: &str) -> Result<Option<Role>, RepositoryError>;
    async fn assign_role(&self, account_id: Uuid, role_id: Uuid) -> Result<(), RepositoryError>;
    async fn roles_for_account(&self, account_id: Uuid) -> Result<Vec<Role>, RepositoryError>;

    async fn create_permission(&self, permission: &Permission) -> Result<(), RepositoryError>;
    async fn assign_permission(
        &self,
        account_id: Uuid,
        permission_id: Uuid,
    ) -> Result<(), RepositoryError>;
    async fn permissions_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<Permission>, RepositoryError>;
}
