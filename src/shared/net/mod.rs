//! Loopback port allocation.

use std::io;
use std::net::{Ipv4Addr, TcpListener};

/// Asks the OS for a free TCP port on 127.0.0.1 and releases it right away.
/// Another process may grab the port before the caller binds it.
pub fn random_port() -> io::Result<u16> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    Ok(listener.local_addr()?.port())
}
