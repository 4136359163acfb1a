//! Registration, login, and the authenticated-request guard.
//!
//! Composes the credential hasher, session engine, and session factory.
//! Operations leave no partial state behind on failure, with one
//! deliberate exception: an incremented crosscheck attempt counter stands
//! even when the request is later aborted.

use std::net::IpAddr;
use std::sync::Arc;

use http::StatusCode;

use crate::config::GatekeyConfig;
use crate::errors::SecurityError;
use crate::models::{Account, RegisterCredentials, Session, SessionKind};
use crate::repository::Repository;
use crate::services::engine::SessionEngine;
use crate::services::factory::SessionFactory;
use crate::services::hasher::CredentialHasher;
use crate::services::proxy::ProxyDetector;

#[derive(Clone)]
pub struct AuthenticationFlow {
    repository: Arc<dyn Repository>,
    hasher: Arc<dyn CredentialHasher>,
    engine: SessionEngine,
    factory: SessionFactory,
    proxy: Arc<dyn ProxyDetector>,
    config: Arc<GatekeyConfig>,
}

impl AuthenticationFlow {
    pub fn new(
        repository: Arc<dyn Repository>,
        hasher: Arc<dyn CredentialHasher>,
        engine: SessionEngine,
        factory: SessionFactory,
        proxy: Arc<dyn ProxyDetector>,
        config: Arc<GatekeyConfig>,
    ) -> Self {
        Self {
            repository,
            hasher,
            engine,
            factory,
            proxy,
            config,
        }
    }

    /// Register a new account. Input shape is validated before storage is
    /// touched; a uniqueness collision surfaces as a single generic
    /// duplicate-credentials error regardless of which field collided.
    pub async fn register(
        &self,
        credentials: RegisterCredentials,
        verified: bool,
        disabled: bool,
    ) -> Result<Account, SecurityError> {
        credentials.check()?;

        let password_hash = self.hash_offloaded(credentials.password.clone()).await?;
        let account = Account::new(
            credentials.username,
            credentials.email,
            credentials.phone,
            password_hash,
            verified,
            disabled,
        );
        self.repository.create_account(&account).await?;
        tracing::info!(account_id = %account.id, "account registered");
        Ok(account)
    }

    /// Login with email, or with username as a fallback when enabled and
    /// the email lookup reports not-found. Opportunistically rehashes the
    /// stored password when the hash scheme is outdated.
    pub async fn login(
        &self,
        email_or_username: &str,
        password: &str,
        ip: IpAddr,
        two_factor: bool,
    ) -> Result<(Session, String), SecurityError> {
        let mut account = self.resolve_account(email_or_username).await?;

        let verified = self
            .verify_offloaded(account.password_hash.clone(), password.to_string())
            .await?;
        if !verified {
            tracing::warn!(
                account_id = %account.id,
                %ip,
                "login password attempt is incorrect"
            );
            return Err(SecurityError::credentials(
                "The password provided is incorrect.",
                StatusCode::UNAUTHORIZED,
            ));
        }

        if self.hasher.needs_rehash(&account.password_hash) {
            account.password_hash = self.hash_offloaded(password.to_string()).await?;
            self.repository.save_account(&account).await?;
            tracing::info!(account_id = %account.id, "password rehashed with current scheme");
        }

        account.validate()?;

        self.factory
            .issue(
                SessionKind::Authentication {
                    two_factor,
                    active: true,
                },
                ip,
                Some(&account),
            )
            .await
    }

    /// Revoke the presented authentication session and issue a fresh one
    /// for the same account, extending access without re-presenting a
    /// password.
    pub async fn refresh_authentication(
        &self,
        token: &str,
        ip: IpAddr,
        two_factor: bool,
    ) -> Result<(Session, String), SecurityError> {
        let mut session = self.decode_authentication(token).await?;
        self.engine.validate(&session)?;
        let account = self.session_account(&session).await?;
        self.engine.revoke(&mut session).await?;
        self.factory
            .issue(
                SessionKind::Authentication {
                    two_factor,
                    active: true,
                },
                ip,
                Some(&account),
            )
            .await
    }

    /// Clear the second-factor requirement on the presented session. Fails
    /// when no second factor was pending, so a redundant clearance cannot
    /// be mistaken for a completed challenge.
    pub async fn on_second_factor(&self, token: &str) -> Result<Session, SecurityError> {
        let mut session = self.decode_authentication(token).await?;
        if !session.two_factor_pending() {
            return Err(SecurityError::invalid(
                "Second factor requirement already met.",
            ));
        }
        session.clear_two_factor();
        self.repository.save_session(&session).await?;
        tracing::info!(session_id = %session.id, "second factor requirement cleared");
        Ok(session)
    }

    /// Deactivate the session and revoke access, independent of the
    /// one-time `valid` latch.
    pub async fn logout(&self, session: &mut Session) -> Result<(), SecurityError> {
        self.engine.revoke(session).await?;
        tracing::info!(session_id = %session.id, "client logged out");
        Ok(())
    }

    /// Request guard: decode, validate session and account, require the
    /// second factor to be satisfied, bind the request to a known location,
    /// and gate on proxy detection when enabled. Any failure aborts before
    /// the protected action runs.
    pub async fn authenticate(
        &self,
        token: &str,
        request_ip: IpAddr,
    ) -> Result<Session, SecurityError> {
        let session = self.decode_authentication(token).await?;
        self.engine.validate(&session)?;
        self.session_account(&session).await?.validate()?;
        if session.two_factor_pending() {
            return Err(SecurityError::invalid("A second factor is required."));
        }
        self.engine.bind_location(&session, request_ip).await?;
        self.check_proxy(request_ip).await?;
        Ok(session)
    }

    async fn check_proxy(&self, ip: IpAddr) -> Result<(), SecurityError> {
        if !self.config.proxy_detection {
            return Ok(());
        }
        match self.proxy.is_proxy(ip).await {
            Ok(true) => {
                tracing::warn!(%ip, "request rejected as proxy origin");
                Err(SecurityError::prohibited_proxy())
            }
            Ok(false) => Ok(()),
            // Reputation lookup is a collaborator; fail open when degraded.
            Err(e) => {
                tracing::warn!(%ip, error = %e, "proxy detection unavailable");
                Ok(())
            }
        }
    }

    async fn resolve_account(&self, email_or_username: &str) -> Result<Account, SecurityError> {
        match self.repository.account_by_email(email_or_username).await? {
            Some(account) => Ok(account),
            None if self.config.allow_login_with_username => self
                .repository
                .account_by_username(email_or_username)
                .await?
                .ok_or_else(|| {
                    SecurityError::not_found("Account with this username does not exist.")
                }),
            None => Err(SecurityError::not_found(
                "Account with this email does not exist.",
            )),
        }
    }

    async fn decode_authentication(&self, token: &str) -> Result<Session, SecurityError> {
        let session = self.engine.decode(token).await?;
        if !session.is_authentication() {
            // A token of the wrong kind reveals nothing about why.
            return Err(SecurityError::not_found("Session could not be found."));
        }
        Ok(session)
    }

    async fn session_account(&self, session: &Session) -> Result<Account, SecurityError> {
        let account_id = session
            .account_id
            .ok_or_else(|| SecurityError::not_found("Session has no owning account."))?;
        self.repository
            .account_by_id(account_id)
            .await?
            .ok_or_else(|| SecurityError::not_found("Account could not be found."))
    }

    async fn hash_offloaded(&self, password: String) -> Result<String, SecurityError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| SecurityError::storage(anyhow::anyhow!("hashing task failed: {e}")))?
    }

    async fn verify_offloaded(
        &self,
        stored: String,
        password: String,
    ) -> Result<bool, SecurityError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.verify(&stored, &password))
            .await
            .map_err(|e| SecurityError::storage(anyhow::anyhow!("verification task failed: {e}")))?
    }
}
