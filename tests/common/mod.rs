//! Shared harness for integration tests.
//!
//! Builds the full engine over the in-memory repository and mock delivery
//! providers, with helpers for the register/login preamble most tests need.

#![allow(dead_code)]

use std::net::IpAddr;
use std::sync::Arc;

use gatekey::config::GatekeyConfig;
use gatekey::models::{Account, RegisterCredentials, Session};
use gatekey::repository::{InMemoryRepository, Repository};
use gatekey::services::{
    EmailProvider, MockEmailService, MockSmsService, PermissiveProxyDetector, SmsProvider,
};
use gatekey::{Collaborators, Gatekey};

pub const PASSWORD: &str = "correct-horse-battery";
pub const CLIENT_IP: &str = "1.2.3.4";

pub struct TestApp {
    pub gatekey: Gatekey,
    pub repository: Arc<InMemoryRepository>,
    pub email: Arc<MockEmailService>,
    pub sms: Arc<MockSmsService>,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::spawn_with(GatekeyConfig::default())
    }

    pub fn spawn_with(config: GatekeyConfig) -> Self {
        let repository = Arc::new(InMemoryRepository::new());
        let email = Arc::new(MockEmailService::new());
        let sms = Arc::new(MockSmsService::new());
        let collaborators = Collaborators::new(
            Arc::clone(&repository) as Arc<dyn Repository>,
            Arc::clone(&email) as Arc<dyn EmailProvider>,
            Arc::clone(&sms) as Arc<dyn SmsProvider>,
        )
        .with_proxy_detector(Arc::new(PermissiveProxyDetector));
        let gatekey = Gatekey::new(config, collaborators);
        Self {
            gatekey,
            repository,
            email,
            sms,
        }
    }

    pub async fn register_verified(&self, email: &str, username: &str) -> Account {
        self.gatekey
            .authentication
            .register(credentials(email, username), true, false)
            .await
            .expect("registration failed")
    }

    pub async fn register_unverified(&self, email: &str, username: &str) -> Account {
        self.gatekey
            .authentication
            .register(credentials(email, username), false, false)
            .await
            .expect("registration failed")
    }

    /// Register a verified account and log it in from [`CLIENT_IP`].
    pub async fn login(&self, email: &str, username: &str) -> (Session, String) {
        self.register_verified(email, username).await;
        self.gatekey
            .authentication
            .login(email, PASSWORD, client_ip(), false)
            .await
            .expect("login failed")
    }
}

pub fn credentials(email: &str, username: &str) -> RegisterCredentials {
    RegisterCredentials {
        email: email.to_string(),
        username: username.to_string(),
        password: PASSWORD.to_string(),
        phone: None,
    }
}

pub fn client_ip() -> IpAddr {
    CLIENT_IP.parse().unwrap()
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}
