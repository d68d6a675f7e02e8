//! Port availability check.
//!
//! The check binds and immediately releases the port, so it races with
//! whatever binds next. It only avoids pointless spawns; the child's own
//! stderr (`EADDRINUSE`) remains the authoritative signal.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, TcpListener};

use tracing::debug;

/// Check if a port is free on both loopback addresses.
///
/// Dev servers often bind `::1` only, so a free IPv4 port alone is not
/// enough. A host without IPv6 (`AddrNotAvailable`) is judged on IPv4.
pub fn is_port_available(port: u16) -> bool {
    if let Err(e) = TcpListener::bind((Ipv4Addr::LOCALHOST, port)) {
        debug!(port = %port, address = "127.0.0.1", error = %e, "Port unavailable");
        return false;
    }
    match TcpListener::bind((Ipv6Addr::LOCALHOST, port)) {
        Ok(_) => true,
        Err(e) if e.kind() == io::ErrorKind::AddrNotAvailable => {
            debug!(port = %port, "IPv6 loopback unavailable, skipping");
            true
        }
        Err(e) => {
            debug!(port = %port, address = "::1", error = %e, "Port unavailable");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_port_is_unavailable() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(!is_port_available(port));

        drop(listener);
        assert!(is_port_available(port));
    }

    #[test]
    fn port_held_on_ipv6_loopback_is_unavailable() {
        // Hosts without IPv6 cannot hold the port there at all.
        let Ok(listener) = TcpListener::bind((Ipv6Addr::LOCALHOST, 0)) else {
            return;
        };
        let port = listener.local_addr().unwrap().port();
        assert!(!is_port_available(port));
    }
}
