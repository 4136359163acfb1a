//! Signed session-token codec.
//!
//! A pure transform between [`SessionClaims`] and a compact signed token,
//! keyed by the process-wide symmetric secret. The codec never consults
//! storage and never judges expiry; a well-formed token for an expired
//! session must still decode, because expiry enforcement belongs to the
//! session engine.

use std::net::IpAddr;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::SecurityError;

/// Claims carried by a session token: issue time, session id, and the
/// client IP the session was issued to. Nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Id of the referenced session record.
    pub jti: Uuid,
    /// Client IP at issuance.
    pub ip: IpAddr,
}

#[derive(Clone)]
pub struct TokenCodec {
    header: Header,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is the engine's job, and the claims set carries no exp.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        Self {
            header: Header::new(Algorithm::HS256),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn encode(&self, claims: &SessionClaims) -> Result<String, SecurityError> {
        jsonwebtoken::encode(&self.header, claims, &self.encoding_key)
            .map_err(SecurityError::storage)
    }

    /// Fails on malformed, unsigned, or wrongly signed tokens with a status
    /// indistinguishable from a missing session.
    pub fn decode(&self, token: &str) -> Result<SessionClaims, SecurityError> {
        jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| SecurityError::decode("Session is not available."))
    }
}
