//! Proxy/VPN origin detection seam.
//!
//! The actual reputation database and its refresh schedule live outside
//! this crate; the engine only consumes a yes/no lookup. Lookup failures
//! fail open with a warning at the call site, since blocking every login
//! on a degraded collaborator would be worse than missing a proxy.

use std::collections::HashSet;
use std::net::IpAddr;

use async_trait::async_trait;

#[async_trait]
pub trait ProxyDetector: Send + Sync {
    async fn is_proxy(&self, ip: IpAddr) -> Result<bool, anyhow::Error>;
}

/// Detector that never flags anything. Default when detection is disabled.
#[derive(Debug, Clone, Default)]
pub struct PermissiveProxyDetector;

#[async_trait]
impl ProxyDetector for PermissiveProxyDetector {
    async fn is_proxy(&self, _ip: IpAddr) -> Result<bool, anyhow::Error> {
        Ok(false)
    }
}

/// Detector backed by a fixed denylist. Useful for tests and small
/// self-managed deployments.
#[derive(Debug, Clone, Default)]
pub struct DenylistProxyDetector {
    denied: HashSet<IpAddr>,
}

impl DenylistProxyDetector {
    pub fn new(denied: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            denied: denied.into_iter().collect(),
        }
    }
}

#[async_trait]
impl ProxyDetector for DenylistProxyDetector {
    async fn is_proxy(&self, ip: IpAddr) -> Result<bool, anyhow::Error> {
        Ok(self.denied.contains(&ip))
    }
}
