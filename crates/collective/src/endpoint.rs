//! Rendezvous endpoint rendering
//!
//! IPv6 literals must be bracketed when joined with a port; hostnames and
//! IPv4 addresses must not be.

use std::net::Ipv6Addr;

/// Returns true if `addr` is an IPv6 address literal
pub fn is_ipv6(addr: &str) -> bool {
    addr.parse::<Ipv6Addr>().is_ok()
}

/// Render a connectable `host:port` endpoint for the rendezvous master
pub fn rendezvous_endpoint(addr: &str, port: u16) -> String {
    if is_ipv6(addr) {
        format!("[{}]:{}", addr, port)
    } else {
        format!("{}:{}", addr, port)
    }
}
