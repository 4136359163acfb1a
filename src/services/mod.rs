//! Services layer: the session state machine and the flows built on it.

mod authentication;
mod authorization;
mod code_pool;
mod delivery;
mod engine;
mod factory;
mod hasher;
mod proxy;
mod recovery;
mod token;
mod verification;

pub use authentication::AuthenticationFlow;
pub use authorization::{wildcard_matches, AuthorizationCheck};
pub use code_pool::{CodePool, CODE_LENGTH};
pub use delivery::{
    EmailProvider, MockEmailService, MockSmsService, SmsProvider, SmtpEmailService,
};
pub use engine::SessionEngine;
pub use factory::SessionFactory;
pub use hasher::{Argon2Hasher, CredentialHasher};
pub use proxy::{DenylistProxyDetector, PermissiveProxyDetector, ProxyDetector};
pub use recovery::RecoveryFlow;
pub use token::{SessionClaims, TokenCodec};
pub use verification::VerificationFlow;
