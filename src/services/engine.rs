//! Session state machine.
//!
//! Operates on persisted session records: decoding a presented token back
//! into a live record, enforcing validity/expiry, crosschecking one-time
//! codes with a bounded attempt counter, binding requests to known
//! locations, and revoking sessions.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::GatekeyConfig;
use crate::errors::{ErrorKind, SecurityError};
use crate::models::Session;
use crate::repository::Repository;
use crate::services::token::TokenCodec;

#[derive(Clone)]
pub struct SessionEngine {
    repository: Arc<dyn Repository>,
    codec: TokenCodec,
    config: Arc<GatekeyConfig>,
    /// Per-session serialization of crosscheck attempts, so two parallel
    /// guesses cannot both observe `attempts` below the limit.
    crosscheck_locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SessionEngine {
    pub fn new(
        repository: Arc<dyn Repository>,
        codec: TokenCodec,
        config: Arc<GatekeyConfig>,
    ) -> Self {
        Self {
            repository,
            codec,
            config,
            crosscheck_locks: Arc::new(DashMap::new()),
        }
    }

    /// Decode a presented token into its session record. Does not check
    /// validity or expiry; callers must follow up with [`validate`].
    ///
    /// [`validate`]: SessionEngine::validate
    pub async fn decode(&self, token: &str) -> Result<Session, SecurityError> {
        let claims = self.codec.decode(token)?;
        self.repository
            .session_by_id(claims.jti)
            .await?
            .ok_or_else(|| SecurityError::not_found("Session could not be found."))
    }

    /// Raises an error with respect to session state. Check order is
    /// existence, deletion, explicit invalidity (the one-time latch, then
    /// the authentication activity flag), and finally expiry. Expiry is
    /// derived at read time and never mutates storage.
    pub fn validate(&self, session: &Session) -> Result<(), SecurityError> {
        if session.deleted {
            Err(SecurityError::not_found("Session could not be found."))
        } else if !session.valid {
            Err(SecurityError::invalid("Session is invalid."))
        } else if !session.is_active() {
            Err(SecurityError::invalid("Session has been deactivated."))
        } else if session.is_expired(Utc::now()) {
            Err(SecurityError::expired())
        } else {
            Ok(())
        }
    }

    /// Compare a presented code against the session's stored code.
    ///
    /// The spent-latch and attempts-exhausted checks run before the
    /// comparison, so a consumed session can never succeed twice and once
    /// the limit is reached the session fails closed even for a correct
    /// code. A mismatch increments the persisted counter; a match spends
    /// the one-time `valid` latch. Concurrent calls against the same
    /// session are serialized and re-read the record under the lock.
    pub async fn crosscheck(
        &self,
        session: &mut Session,
        presented_code: &str,
    ) -> Result<(), SecurityError> {
        let lock = self
            .crosscheck_locks
            .entry(session.id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock().await;
        let outcome = self.crosscheck_under_lock(session, presented_code).await;
        drop(guard);

        // Evict the lock entry once the session can never be crosschecked
        // again; a wrong guess below the limit keeps it alive. Eviction
        // while a waiter still holds the old mutex is harmless: terminal
        // states are latched in storage and re-read on entry.
        let terminal = match &outcome {
            Ok(()) => true,
            Err(e) => matches!(
                e.kind,
                ErrorKind::Invalid
                    | ErrorKind::Expired
                    | ErrorKind::MaximumAttempts
                    | ErrorKind::NotFound
            ),
        };
        if terminal {
            self.crosscheck_locks.remove(&session.id);
        }
        outcome
    }

    async fn crosscheck_under_lock(
        &self,
        session: &mut Session,
        presented_code: &str,
    ) -> Result<(), SecurityError> {
        let mut current = self
            .repository
            .session_by_id(session.id)
            .await?
            .ok_or_else(|| SecurityError::not_found("Session could not be found."))?;

        if !current.valid {
            *session = current;
            return Err(SecurityError::invalid("Session is invalid."));
        }

        if current.is_expired(Utc::now()) {
            *session = current;
            return Err(SecurityError::expired());
        }

        if current.attempts >= self.config.max_crosscheck_attempts {
            tracing::warn!(
                session_id = %current.id,
                "session crosscheck attempts are exhausted"
            );
            *session = current;
            return Err(SecurityError::maximum_attempts());
        }

        let stored_code = current
            .code
            .as_deref()
            .ok_or_else(|| SecurityError::invalid("Session does not hold a code."))?;

        if !codes_match(stored_code, presented_code) {
            current.attempts += 1;
            self.repository.save_session(&current).await?;
            *session = current;
            return Err(SecurityError::crosscheck());
        }

        current.valid = false;
        self.repository.save_session(&current).await?;
        tracing::debug!(session_id = %current.id, "session code crosschecked");
        *session = current;
        Ok(())
    }

    /// Require the request IP to match at least one IP previously used to
    /// establish an authentication session for the owning account. Defends
    /// against stolen tokens replayed from a new network origin.
    pub async fn bind_location(
        &self,
        session: &Session,
        request_ip: IpAddr,
    ) -> Result<(), SecurityError> {
        let account_id = session
            .account_id
            .ok_or_else(|| SecurityError::not_found("Session has no owning account."))?;
        if self
            .repository
            .authentication_ip_known(account_id, request_ip)
            .await?
        {
            Ok(())
        } else {
            tracing::warn!(
                session_id = %session.id,
                ip = %request_ip,
                "client ip address is unrecognised"
            );
            Err(SecurityError::unknown_location())
        }
    }

    /// Explicitly revoke a session. Authentication sessions are marked
    /// inactive; code-bearing sessions spend their `valid` latch.
    pub async fn revoke(&self, session: &mut Session) -> Result<(), SecurityError> {
        if session.is_authentication() {
            session.set_active(false);
        } else {
            session.valid = false;
        }
        self.repository.save_session(session).await?;
        tracing::debug!(session_id = %session.id, "session revoked");
        Ok(())
    }

    /// Bulk-revoke every authentication session of an account, e.g. as a
    /// password-reset side effect.
    pub async fn revoke_authentication_sessions(
        &self,
        account_id: Uuid,
    ) -> Result<(), SecurityError> {
        self.repository
            .revoke_authentication_sessions(account_id)
            .await?;
        tracing::info!(%account_id, "all authentication sessions revoked");
        Ok(())
    }
}

/// Constant-time code comparison.
fn codes_match(stored: &str, presented: &str) -> bool {
    stored.len() == presented.len()
        && bool::from(stored.as_bytes().ct_eq(presented.as_bytes()))
}
