//! Account entity and registration input validation.

use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::errors::SecurityError;

/// Identity record. Never hard-deleted; the `deleted` flag renders it
/// filterable without removing it from storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    /// Opaque hash produced by the configured credential hasher.
    pub password_hash: String,
    pub disabled: bool,
    pub verified: bool,
    pub deleted: bool,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

impl Account {
    pub fn new(
        username: String,
        email: String,
        phone: Option<String>,
        password_hash: String,
        verified: bool,
        disabled: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            email: email.to_lowercase(),
            phone,
            password_hash,
            disabled,
            verified,
            deleted: false,
            date_created: now,
            date_updated: now,
        }
    }

    /// Raises an error with respect to account state. Check order is
    /// deletion, then disablement, then verification; no session may act on
    /// behalf of an account failing any of these.
    pub fn validate(&self) -> Result<(), SecurityError> {
        if self.deleted {
            Err(SecurityError::account(
                "This account has been permanently deleted.",
                StatusCode::NOT_FOUND,
            ))
        } else if self.disabled {
            Err(SecurityError::account(
                "This account has been disabled.",
                StatusCode::UNAUTHORIZED,
            ))
        } else if !self.verified {
            Err(SecurityError::account(
                "Account requires verification.",
                StatusCode::UNAUTHORIZED,
            ))
        } else {
            Ok(())
        }
    }
}

/// Registration input, validated before storage is touched.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterCredentials {
    #[validate(email(message = "Please use a valid email such as you@mail.com."))]
    pub email: String,

    #[validate(
        length(
            min = 3,
            max = 32,
            message = "Username must be between 3-32 characters."
        ),
        custom(
            function = "username_charset",
            message = "Username must not contain any special characters other than _ or -."
        )
    )]
    pub username: String,

    #[validate(length(
        min = 8,
        max = 100,
        message = "Password must be more than 8 characters and less than 100 characters."
    ))]
    pub password: String,

    #[validate(custom(
        function = "phone_digits",
        message = "Please use a valid phone format such as 15621435489 or 19498963648018."
    ))]
    pub phone: Option<String>,
}

impl RegisterCredentials {
    /// Validate input shape, surfacing the first violation as a 400.
    pub fn check(&self) -> Result<(), SecurityError> {
        self.validate().map_err(|errors| {
            let message = errors
                .field_errors()
                .into_values()
                .flatten()
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .next()
                .unwrap_or_else(|| "Invalid registration credentials.".to_string());
            SecurityError::credentials(message, StatusCode::BAD_REQUEST)
        })
    }
}

fn username_charset(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        Ok(())
    } else {
        Err(ValidationError::new("username_charset"))
    }
}

fn phone_digits(phone: &str) -> Result<(), ValidationError> {
    if (11..=14).contains(&phone.len()) && phone.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("phone_digits"))
    }
}
