//! Account recovery.
//!
//! A recovery attempt issues a two-step challenge proving the requester
//! owns the account; fulfilment stores the new password and bulk-revokes
//! every authentication session so stolen tokens die with the old
//! password.

use std::net::IpAddr;
use std::sync::Arc;

use http::StatusCode;

use crate::errors::SecurityError;
use crate::models::Session;
use crate::repository::Repository;
use crate::services::engine::SessionEngine;
use crate::services::hasher::CredentialHasher;
use crate::services::verification::VerificationFlow;

#[derive(Clone)]
pub struct RecoveryFlow {
    repository: Arc<dyn Repository>,
    hasher: Arc<dyn CredentialHasher>,
    engine: SessionEngine,
    verification: VerificationFlow,
}

impl RecoveryFlow {
    pub fn new(
        repository: Arc<dyn Repository>,
        hasher: Arc<dyn CredentialHasher>,
        engine: SessionEngine,
        verification: VerificationFlow,
    ) -> Self {
        Self {
            repository,
            hasher,
            engine,
            verification,
        }
    }

    /// Begin recovery: validate the account's state and issue a two-step
    /// session for the owner to prove control of their email.
    pub async fn attempt_account_recovery(
        &self,
        email: &str,
        ip: IpAddr,
    ) -> Result<(Session, String), SecurityError> {
        let account = self
            .repository
            .account_by_email(email)
            .await?
            .ok_or_else(|| SecurityError::not_found("Account with this email does not exist."))?;
        account.validate()?;
        self.verification.request_two_step_for(&account, ip).await
    }

    /// Complete recovery with a crosschecked two-step session: hash and
    /// store the new password, then revoke every authentication session of
    /// the account.
    pub async fn fulfill_account_recovery(
        &self,
        session: &Session,
        new_password: &str,
    ) -> Result<(), SecurityError> {
        if !(8..=100).contains(&new_password.len()) {
            return Err(SecurityError::credentials(
                "Password must be more than 8 characters and less than 100 characters.",
                StatusCode::BAD_REQUEST,
            ));
        }
        let account_id = session
            .account_id
            .ok_or_else(|| SecurityError::not_found("Session has no owning account."))?;
        let mut account = self
            .repository
            .account_by_id(account_id)
            .await?
            .ok_or_else(|| SecurityError::not_found("Account could not be found."))?;

        let hasher = Arc::clone(&self.hasher);
        let password = new_password.to_string();
        account.password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| SecurityError::storage(anyhow::anyhow!("hashing task failed: {e}")))??;

        self.repository.save_account(&account).await?;
        self.engine
            .revoke_authentication_sessions(account.id)
            .await?;
        tracing::info!(%account_id, "account recovered and password replaced");
        Ok(())
    }
}
