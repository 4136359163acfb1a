//! Environment-driven configuration.
//!
//! Values are required in prod and defaulted in dev, so a misconfigured
//! deployment fails fast at startup instead of at the first login.

use std::env;
use std::net::IpAddr;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            other => Err(format!("unknown environment '{other}', expected dev or prod")),
        }
    }
}

/// Process-wide configuration consumed by the session engine and flows.
#[derive(Debug, Clone, Deserialize)]
pub struct GatekeyConfig {
    pub environment: Environment,
    pub log_level: String,
    /// Symmetric secret used to sign session tokens. Rotating it renders
    /// every outstanding token undecodable.
    pub secret: String,
    /// Permit login by username when email lookup reports not-found.
    pub allow_login_with_username: bool,
    pub captcha_session_expiry_seconds: i64,
    pub two_step_session_expiry_seconds: i64,
    pub authentication_session_expiry_seconds: i64,
    /// Crosscheck attempts after which a code-bearing session fails closed.
    pub max_crosscheck_attempts: u8,
    /// Proxies whose addresses are skipped when resolving the client IP
    /// from a forwarded-for chain.
    pub trusted_proxies: Vec<IpAddr>,
    /// Gate authenticated requests through the configured proxy detector.
    pub proxy_detection: bool,
}

impl Default for GatekeyConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Dev,
            log_level: "info".to_string(),
            secret: "gatekey-dev-secret".to_string(),
            allow_login_with_username: false,
            captcha_session_expiry_seconds: 60,
            two_step_session_expiry_seconds: 60,
            authentication_session_expiry_seconds: 30 * 24 * 60 * 60,
            max_crosscheck_attempts: 5,
            trusted_proxies: Vec::new(),
            proxy_detection: false,
        }
    }
}

impl GatekeyConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        let is_prod = environment == Environment::Prod;

        let defaults = GatekeyConfig::default();
        let trusted_proxies = get_env("TRUSTED_PROXIES", Some(""), is_prod)?
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse::<IpAddr>()
                    .map_err(|e| anyhow::anyhow!("invalid trusted proxy '{s}': {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            environment,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            secret: get_env("GATEKEY_SECRET", Some(&defaults.secret), is_prod)?,
            allow_login_with_username: get_env("ALLOW_LOGIN_WITH_USERNAME", Some("false"), is_prod)?
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid ALLOW_LOGIN_WITH_USERNAME: {e}"))?,
            captcha_session_expiry_seconds: parse_env(
                "CAPTCHA_SESSION_EXPIRY_SECONDS",
                defaults.captcha_session_expiry_seconds,
                is_prod,
            )?,
            two_step_session_expiry_seconds: parse_env(
                "TWO_STEP_SESSION_EXPIRY_SECONDS",
                defaults.two_step_session_expiry_seconds,
                is_prod,
            )?,
            authentication_session_expiry_seconds: parse_env(
                "AUTHENTICATION_SESSION_EXPIRY_SECONDS",
                defaults.authentication_session_expiry_seconds,
                is_prod,
            )?,
            max_crosscheck_attempts: parse_env(
                "MAX_CROSSCHECK_ATTEMPTS",
                defaults.max_crosscheck_attempts,
                is_prod,
            )?,
            trusted_proxies,
            proxy_detection: get_env("PROXY_DETECTION", Some("false"), is_prod)?
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid PROXY_DETECTION: {e}"))?,
        })
    }
}

/// Fetch an environment variable. In prod a missing variable is an error;
/// in dev the default is used.
fn get_env(name: &str, default: Option<&str>, is_prod: bool) -> Result<String, anyhow::Error> {
    match env::var(name) {
        Ok(value) => Ok(value),
        Err(_) => match default {
            Some(value) if !is_prod => Ok(value.to_string()),
            _ => Err(anyhow::anyhow!(
                "required environment variable {name} is not set"
            )),
        },
    }
}

fn parse_env<T>(name: &str, default: T, is_prod: bool) -> Result<T, anyhow::Error>
where
    T: std::str::FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {name}: {e}")),
        Err(_) if !is_prod => Ok(default),
        Err(_) => Err(anyhow::anyhow!(
            "required environment variable {name} is not set"
        )),
    }
}
