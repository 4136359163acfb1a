//! Session issuance policy.
//!
//! The factory chooses the expiry window and code length for each session
//! kind, binds the caller's IP, persists the record, and returns it with
//! its encoded token for the boundary layer to attach to the response.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{Duration, Utc};
use http::StatusCode;

use crate::config::GatekeyConfig;
use crate::errors::SecurityError;
use crate::models::{Account, Session, SessionKind};
use crate::repository::Repository;
use crate::services::code_pool::CodePool;
use crate::services::token::{SessionClaims, TokenCodec};

/// Captcha challenges use a shortened code.
const CAPTCHA_CODE_LENGTH: usize = 6;

#[derive(Clone)]
pub struct SessionFactory {
    repository: Arc<dyn Repository>,
    codec: TokenCodec,
    pool: Arc<CodePool>,
    config: Arc<GatekeyConfig>,
}

impl SessionFactory {
    pub fn new(
        repository: Arc<dyn Repository>,
        codec: TokenCodec,
        pool: Arc<CodePool>,
        config: Arc<GatekeyConfig>,
    ) -> Self {
        Self {
            repository,
            codec,
            pool,
            config,
        }
    }

    /// Create and persist a session of the given kind, returning the record
    /// together with its encoded token.
    ///
    /// Policy table:
    ///
    /// | kind           | expiry  | code    | account  |
    /// |----------------|---------|---------|----------|
    /// | captcha        | 1 min   | 6 chars | optional |
    /// | two-step       | 1 min   | full    | required |
    /// | authentication | 30 days | none    | required |
    ///
    /// Expiry windows are overridable through configuration.
    pub async fn issue(
        &self,
        kind: SessionKind,
        ip: IpAddr,
        account: Option<&Account>,
    ) -> Result<(Session, String), SecurityError> {
        let (expiry_seconds, code) = match kind {
            SessionKind::Captcha => {
                let mut code = self.pool.draw();
                code.truncate(CAPTCHA_CODE_LENGTH);
                (self.config.captcha_session_expiry_seconds, Some(code))
            }
            SessionKind::TwoStep => (
                self.config.two_step_session_expiry_seconds,
                Some(self.pool.draw()),
            ),
            SessionKind::Authentication { .. } => {
                (self.config.authentication_session_expiry_seconds, None)
            }
        };

        let account_id = match (&kind, account) {
            (SessionKind::Captcha, account) => account.map(|a| a.id),
            (_, Some(account)) => Some(account.id),
            (_, None) => {
                return Err(SecurityError::credentials(
                    "An account is required for this session type.",
                    StatusCode::BAD_REQUEST,
                ))
            }
        };

        let expiration = Utc::now() + Duration::seconds(expiry_seconds);
        let session = Session::new(kind, account_id, ip, expiration, code);
        self.repository.create_session(&session).await?;

        let token = self.codec.encode(&SessionClaims {
            iat: session.date_created.timestamp(),
            jti: session.id,
            ip,
        })?;

        tracing::debug!(
            session_id = %session.id,
            kind = session.kind.label(),
            %ip,
            "session issued"
        );
        Ok((session, token))
    }
}
