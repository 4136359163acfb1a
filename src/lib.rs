//! gatekey: session-centric authentication and authorization engine.
//!
//! Issues, encodes, validates, and revokes three kinds of client-held
//! session tokens (authentication, two-step verification, captcha) and
//! layers role/permission checks and location/proxy anomaly detection on
//! top of them. Storage, delivery, transport, and proxy reputation are
//! external collaborators behind narrow traits; this crate is the logical
//! state machine they build on.

pub mod config;
pub mod errors;
pub mod models;
pub mod repository;
pub mod services;
pub mod utils;

use std::sync::Arc;

use config::GatekeyConfig;
use errors::SecurityError;
use models::{Account, Permission, RegisterCredentials, Role};
use repository::Repository;
use services::{
    Argon2Hasher, AuthenticationFlow, AuthorizationCheck, CodePool, CredentialHasher,
    EmailProvider, PermissiveProxyDetector, ProxyDetector, RecoveryFlow, SessionEngine,
    SessionFactory, SmsProvider, TokenCodec, VerificationFlow,
};

/// Composition root wiring the engine and flows over shared collaborators.
///
/// Construct once at startup and share; every component is cheap to clone
/// and request-scoped in operation.
#[derive(Clone)]
pub struct Gatekey {
    pub config: Arc<GatekeyConfig>,
    pub repository: Arc<dyn Repository>,
    pub engine: SessionEngine,
    pub factory: SessionFactory,
    pub authentication: AuthenticationFlow,
    pub verification: VerificationFlow,
    pub recovery: RecoveryFlow,
    pub authorization: AuthorizationCheck,
}

/// Collaborators injected into [`Gatekey::new`]. Defaults cover the
/// hasher and proxy detector; storage and delivery have no sensible
/// defaults and must be provided.
pub struct Collaborators {
    pub repository: Arc<dyn Repository>,
    pub hasher: Arc<dyn CredentialHasher>,
    pub email: Arc<dyn EmailProvider>,
    pub sms: Arc<dyn SmsProvider>,
    pub proxy: Arc<dyn ProxyDetector>,
}

impl Collaborators {
    pub fn new(
        repository: Arc<dyn Repository>,
        email: Arc<dyn EmailProvider>,
        sms: Arc<dyn SmsProvider>,
    ) -> Self {
        Self {
            repository,
            hasher: Arc::new(Argon2Hasher),
            email,
            sms,
            proxy: Arc::new(PermissiveProxyDetector),
        }
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn CredentialHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_proxy_detector(mut self, proxy: Arc<dyn ProxyDetector>) -> Self {
        self.proxy = proxy;
        self
    }
}

impl Gatekey {
    pub fn new(config: GatekeyConfig, collaborators: Collaborators) -> Self {
        let config = Arc::new(config);
        let codec = TokenCodec::new(&config.secret);
        let pool = Arc::new(CodePool::new());

        let repository = collaborators.repository;
        let engine = SessionEngine::new(Arc::clone(&repository), codec.clone(), Arc::clone(&config));
        let factory = SessionFactory::new(
            Arc::clone(&repository),
            codec,
            pool,
            Arc::clone(&config),
        );
        let authentication = AuthenticationFlow::new(
            Arc::clone(&repository),
            Arc::clone(&collaborators.hasher),
            engine.clone(),
            factory.clone(),
            collaborators.proxy,
            Arc::clone(&config),
        );
        let verification = VerificationFlow::new(
            Arc::clone(&repository),
            engine.clone(),
            factory.clone(),
            collaborators.email,
            collaborators.sms,
        );
        let recovery = RecoveryFlow::new(
            Arc::clone(&repository),
            collaborators.hasher,
            engine.clone(),
            verification.clone(),
        );
        let authorization = AuthorizationCheck::new(Arc::clone(&repository));

        Self {
            config,
            repository,
            engine,
            factory,
            authentication,
            verification,
            recovery,
            authorization,
        }
    }

    /// Create the initial admin account with complete authoritative access,
    /// unless one already exists. Intended for first-boot provisioning.
    pub async fn bootstrap_admin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Account, SecurityError> {
        if let Some(existing) = self.repository.account_by_username("head-admin").await? {
            return Ok(existing);
        }
        let role = match self.repository.role_by_name("Head Admin").await? {
            Some(role) => role,
            None => {
                let role = Role::new(
                    "Head Admin",
                    "Has the ability to control any aspect of the API. Assign sparingly.",
                );
                self.repository.create_role(&role).await?;
                role
            }
        };
        let permission = Permission::new("*:*");
        self.repository.create_permission(&permission).await?;

        let account = self
            .authentication
            .register(
                RegisterCredentials {
                    email: email.to_string(),
                    username: "head-admin".to_string(),
                    password: password.to_string(),
                    phone: None,
                },
                true,
                false,
            )
            .await?;
        self.repository.assign_role(account.id, role.id).await?;
        self.repository
            .assign_permission(account.id, permission.id)
            .await?;
        tracing::info!(account_id = %account.id, "initial admin account generated");
        Ok(account)
    }
}

/// Install a global tracing subscriber honoring `RUST_LOG` with the given
/// fallback level. Safe to call more than once; later calls are no-ops.
pub fn init_tracing(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
