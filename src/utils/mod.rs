//! Request-context helpers.

use std::net::IpAddr;

/// Resolve the client IP from a peer address and a forwarded-for chain.
///
/// When the peer is a trusted proxy, the chain is walked right to left and
/// the first untrusted hop is taken as the client; otherwise the peer
/// address itself is the client. Entries appended by untrusted parties are
/// ignored by construction.
pub fn resolve_client_ip(peer: IpAddr, forwarded_for: &[IpAddr], trusted: &[IpAddr]) -> IpAddr {
    if !trusted.contains(&peer) {
        return peer;
    }
    for hop in forwarded_for.iter().rev() {
        if !trusted.contains(hop) {
            return *hop;
        }
    }
    peer
}
