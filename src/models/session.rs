//! Session record and its kind-specific payload.
//!
//! The three session variants share one concrete record with a tagged
//! [`SessionKind`], so the engine operates over a single type with
//! exhaustive kind-matching instead of a subclass hierarchy.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind-specific session payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionKind {
    /// Human-challenge session; needs no account binding.
    Captcha,
    /// Short-lived code session delivered via email or SMS.
    TwoStep,
    /// Long-lived bearer session.
    Authentication {
        /// Set when the login demanded a second factor; cleared once the
        /// factor is satisfied.
        two_factor: bool,
        /// Explicit logout state, independent of the one-time `valid` latch.
        active: bool,
    },
}

impl SessionKind {
    pub fn label(&self) -> &'static str {
        match self {
            SessionKind::Captcha => "captcha",
            SessionKind::TwoStep => "two-step",
            SessionKind::Authentication { .. } => "authentication",
        }
    }
}

/// Server-persisted credential proving prior completion of some challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    /// Owning account; absent for pre-authentication captcha sessions.
    pub account_id: Option<Uuid>,
    pub expiration_date: DateTime<Utc>,
    /// Single-use latch. Once false it can never become true again.
    pub valid: bool,
    /// Client IP at issuance.
    pub ip: IpAddr,
    /// Failed crosscheck counter, bounded by the configured maximum.
    pub attempts: u8,
    /// One-time code held by code-bearing kinds.
    pub code: Option<String>,
    pub deleted: bool,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
    pub kind: SessionKind,
}

impl Session {
    pub fn new(
        kind: SessionKind,
        account_id: Option<Uuid>,
        ip: IpAddr,
        expiration_date: DateTime<Utc>,
        code: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            account_id,
            expiration_date,
            valid: true,
            ip,
            attempts: 0,
            code,
            deleted: false,
            date_created: now,
            date_updated: now,
            kind,
        }
    }

    /// Expiry is a derived truth; nothing in storage changes when a session
    /// passes its expiration date.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration_date
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self.kind, SessionKind::Authentication { .. })
    }

    /// Whether a second factor is still pending. Always false for
    /// non-authentication kinds.
    pub fn two_factor_pending(&self) -> bool {
        matches!(
            self.kind,
            SessionKind::Authentication {
                two_factor: true,
                ..
            }
        )
    }

    /// Logout state. Non-authentication kinds are always considered active;
    /// their lifecycle ends through the `valid` latch instead.
    pub fn is_active(&self) -> bool {
        match self.kind {
            SessionKind::Authentication { active, .. } => active,
            _ => true,
        }
    }

    pub fn set_active(&mut self, value: bool) {
        if let SessionKind::Authentication { active, .. } = &mut self.kind {
            *active = value;
        }
    }

    pub fn clear_two_factor(&mut self) {
        if let SessionKind::Authentication { two_factor, .. } = &mut self.kind {
            *two_factor = false;
        }
    }
}
