//! Two-step and captcha verification flows.
//!
//! Issues short-lived code-bearing sessions, delivers their codes, and
//! crosschecks attempts. Code delivery is fire-and-forget: failures are
//! logged and never abort the request that triggered them.

use std::net::IpAddr;
use std::sync::Arc;

use http::StatusCode;

use crate::errors::SecurityError;
use crate::models::{Account, Session, SessionKind};
use crate::repository::Repository;
use crate::services::delivery::{EmailProvider, SmsProvider};
use crate::services::engine::SessionEngine;
use crate::services::factory::SessionFactory;

#[derive(Clone)]
pub struct VerificationFlow {
    repository: Arc<dyn Repository>,
    engine: SessionEngine,
    factory: SessionFactory,
    email: Arc<dyn EmailProvider>,
    sms: Arc<dyn SmsProvider>,
}

impl VerificationFlow {
    pub fn new(
        repository: Arc<dyn Repository>,
        engine: SessionEngine,
        factory: SessionFactory,
        email: Arc<dyn EmailProvider>,
        sms: Arc<dyn SmsProvider>,
    ) -> Self {
        Self {
            repository,
            engine,
            factory,
            email,
            sms,
        }
    }

    /// Create a two-step session for the account behind `email`. When the
    /// client presents a previously issued two-step token, that session is
    /// revoked first so only one challenge is outstanding.
    pub async fn request_two_step(
        &self,
        email: &str,
        ip: IpAddr,
        previous_token: Option<&str>,
    ) -> Result<(Session, String), SecurityError> {
        if let Some(token) = previous_token {
            // Best effort; an undecodable or missing previous session is
            // not the client's problem.
            if let Ok(mut previous) = self.engine.decode(token).await {
                if previous.kind == SessionKind::TwoStep {
                    self.engine.revoke(&mut previous).await?;
                }
            }
        }
        let account = self
            .repository
            .account_by_email(email)
            .await?
            .ok_or_else(|| SecurityError::not_found("Account with this email does not exist."))?;
        self.request_two_step_for(&account, ip).await
    }

    /// Create a two-step session for an already resolved account.
    pub async fn request_two_step_for(
        &self,
        account: &Account,
        ip: IpAddr,
    ) -> Result<(Session, String), SecurityError> {
        self.factory
            .issue(SessionKind::TwoStep, ip, Some(account))
            .await
    }

    /// Validate a two-step verification attempt: decode, validate session
    /// and bound account, then crosscheck the presented code.
    pub async fn two_step_verification(
        &self,
        token: &str,
        code: &str,
    ) -> Result<Session, SecurityError> {
        let mut session = self.decode_kind(token, SessionKind::TwoStep).await?;
        self.engine.validate(&session)?;
        self.session_account(&session).await?.validate()?;
        self.engine.crosscheck(&mut session, code).await?;
        Ok(session)
    }

    /// Verify the account bound to a two-step session. Fails when the
    /// account is already verified, so stray codes cannot be laundered
    /// into a no-op success.
    pub async fn verify_account(&self, token: &str, code: &str) -> Result<Session, SecurityError> {
        let mut session = self.decode_kind(token, SessionKind::TwoStep).await?;
        let mut account = self.session_account(&session).await?;
        if account.verified {
            return Err(SecurityError::account(
                "Account already verified.",
                StatusCode::FORBIDDEN,
            ));
        }
        self.engine.validate(&session)?;
        self.engine.crosscheck(&mut session, code).await?;
        account.verified = true;
        self.repository.save_account(&account).await?;
        tracing::info!(account_id = %account.id, "account verified");
        Ok(session)
    }

    /// Create a captcha session. No account binding is required.
    pub async fn request_captcha(&self, ip: IpAddr) -> Result<(Session, String), SecurityError> {
        self.factory.issue(SessionKind::Captcha, ip, None).await
    }

    /// Validate a captcha attempt.
    pub async fn captcha_verification(
        &self,
        token: &str,
        code: &str,
    ) -> Result<Session, SecurityError> {
        let mut session = self.decode_kind(token, SessionKind::Captcha).await?;
        self.engine.validate(&session)?;
        self.engine.crosscheck(&mut session, code).await?;
        Ok(session)
    }

    /// Email the session code to the bound account. Fire-and-forget.
    pub async fn email_code(&self, session: &Session) -> Result<(), SecurityError> {
        let account = self.session_account(session).await?;
        let code = self.session_code(session)?;
        let email = Arc::clone(&self.email);
        let session_id = session.id;
        tokio::spawn(async move {
            if let Err(e) = email
                .send_email(&account.email, "Session Code", &format!("Your code is: {code}"))
                .await
            {
                tracing::warn!(%session_id, error = %e, "session code email failed");
            }
        });
        Ok(())
    }

    /// Text the session code to the bound account's phone. Fire-and-forget.
    pub async fn text_code(&self, session: &Session) -> Result<(), SecurityError> {
        let account = self.session_account(session).await?;
        let phone = account.phone.ok_or_else(|| {
            SecurityError::account(
                "Account has no phone number on record.",
                StatusCode::BAD_REQUEST,
            )
        })?;
        let code = self.session_code(session)?;
        let sms = Arc::clone(&self.sms);
        let session_id = session.id;
        tokio::spawn(async move {
            if let Err(e) = sms.send_sms(&phone, &format!("Your code is: {code}")).await {
                tracing::warn!(%session_id, error = %e, "session code text failed");
            }
        });
        Ok(())
    }

    fn session_code(&self, session: &Session) -> Result<String, SecurityError> {
        session
            .code
            .clone()
            .ok_or_else(|| SecurityError::invalid("Session does not hold a code."))
    }

    async fn decode_kind(
        &self,
        token: &str,
        expected: SessionKind,
    ) -> Result<Session, SecurityError> {
        let session = self.engine.decode(token).await?;
        if session.kind != expected {
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
}
