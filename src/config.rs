//! Server configuration and logging setup
//!
//! Both servers take `[host] [port]` positionally, falling back to the
//! `SERVER_HOST` / `SERVER_PORT` environment variables. `any` binds every
//! interface.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::time::Duration;

use clap::Args;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::error::{BridgeError, Result};

pub const DEFAULT_PORT: u16 = 9000;

/// Listening address shared by the TCP and UDP servers
#[derive(Args, Debug, Clone)]
pub struct ListenArgs {
    /// Listening address of server or 'any'
    #[arg(env = "SERVER_HOST", default_value = "any")]
    pub host: String,

    /// Server port
    #[arg(env = "SERVER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Debug logging (overrides RUST_LOG)
    #[arg(short, long)]
    pub verbose: bool,
}

impl ListenArgs {
    /// Resolve host + port; `any` (atau kosong) berarti 0.0.0.0
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let host = self.host.trim();
        if host.is_empty() || host.eq_ignore_ascii_case("any") {
            return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port));
        }
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.port));
        }

        (host, self.port)
            .to_socket_addrs()
            .map_err(|e| BridgeError::Config(format!("cannot resolve {}: {}", host, e)))?
            .next()
            .ok_or_else(|| BridgeError::Config(format!("no address for {}", host)))
    }
}

/// Stream-only options
#[derive(Args, Debug, Clone)]
pub struct StreamArgs {
    /// Idle connection timeout in seconds (0 = never)
    #[arg(long, env = "IDLE_TIMEOUT", default_value_t = 0, value_name = "SECS")]
    pub idle_timeout: u64,

    /// Send a hello message to a client when it connects
    #[arg(long)]
    pub hello: bool,
}

impl StreamArgs {
    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Install the global fmt subscriber.
///
/// Level comes from `RUST_LOG` (INFO if unset or unparsable); `verbose`
/// forces DEBUG.
pub fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose {
        Level::DEBUG
    } else {
        std::env::var("RUST_LOG")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| BridgeError::Config(format!("cannot install subscriber: {}", e)))
}
