//! Peer address carried by datagram PDUs

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// Alamat peer: sumber untuk PDU masuk, tujuan untuk PDU keluar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    /// Resolved socket address (as reported by the transport)
    Socket(SocketAddr),
    /// Host name or textual IP plus port, resolved by the transport on send
    Host(String, u16),
}

impl Address {
    pub fn host(host: impl Into<String>, port: u16) -> Self {
        Address::Host(host.into(), port)
    }

    pub fn port(&self) -> u16 {
        match self {
            Address::Socket(addr) => addr.port(),
            Address::Host(_, port) => *port,
        }
    }

    /// Decompose into `(host, port)`.
    ///
    /// Fails with `InvalidAddress` if the host is empty or the port is 0;
    /// neither can name a peer to send to.
    pub fn host_port(&self) -> Result<(String, u16)> {
        let (host, port) = match self {
            Address::Socket(addr) => (addr.ip().to_string(), addr.port()),
            Address::Host(host, port) => (host.clone(), *port),
        };

        if host.is_empty() {
            return Err(BridgeError::InvalidAddress("empty host".into()));
        }
        if port == 0 {
            return Err(BridgeError::InvalidAddress(format!(
                "port 0 is not a valid destination for {}",
                host
            )));
        }

        Ok((host, port))
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Address::Socket(addr)
    }
}

impl From<(&str, u16)> for Address {
    fn from((host, port): (&str, u16)) -> Self {
        Address::Host(host.to_string(), port)
    }
}

impl From<(String, u16)> for Address {
    fn from((host, port): (String, u16)) -> Self {
        Address::Host(host, port)
    }
}

impl FromStr for Address {
    type Err = BridgeError;

    /// Parse `host:port`, `ip:port` or `[v6]:port`.
    fn from_str(s: &str) -> Result<Self> {
        if let Ok(addr) = s.parse::<SocketAddr>() {
            return Ok(Address::Socket(addr));
        }

        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| BridgeError::InvalidAddress(format!("missing port in {:?}", s)))?;
        let port: u16 = port
            .parse()
            .map_err(|_| BridgeError::InvalidAddress(format!("bad port in {:?}", s)))?;
        if host.is_empty() || host.contains(':') {
            return Err(BridgeError::InvalidAddress(format!("bad host in {:?}", s)));
        }

        Ok(Address::Host(host.to_string(), port))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Socket(addr) => write!(f, "({}, {})", addr.ip(), addr.port()),
            Address::Host(host, port) => write!(f, "({}, {})", host, port),
        }
    }
}
