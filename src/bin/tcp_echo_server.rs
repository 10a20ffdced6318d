//! TCP Echo Server
//!
//! Listens for one or more client connections and echoes every chunk back
//! to the client that sent it. No attempt is made to split the stream into
//! lines or any other higher-layer notion of a packet.
//!
//! Usage:
//!   cargo run --release --bin tcp_echo_server -- [HOST] [PORT] [--idle-timeout SECS] [--hello]

use std::net::SocketAddr;

use clap::Parser;
use tracing::{error, info};

use pdubridge::config::{init_logging, ListenArgs, StreamArgs};
use pdubridge::network::{StreamDirector, StreamOptions};
use pdubridge::{Echo, Result};

/// TCP echo server built on the stream bridge
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(flatten)]
    listen: ListenArgs,

    #[command(flatten)]
    stream: StreamArgs,
}

fn run(cli: Cli) -> Result<()> {
    let addr = cli.listen.bind_addr()?;
    let options = StreamOptions {
        idle_timeout: cli.stream.idle_timeout(),
        hello: cli.stream.hello,
    };

    let mut director = StreamDirector::bind(addr, options, |_peer: SocketAddr| Echo)?;
    info!("running");
    director.run()
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.listen.verbose) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli) {
        error!(error = %e, "server error");
        std::process::exit(1);
    }
}
