//! UDP Echo Server
//!
//! Sends every datagram back to the address it came from.
//!
//! Usage:
//!   cargo run --release --bin udp_echo_server -- [HOST] [PORT]

use clap::Parser;
use tracing::{error, info};

use pdubridge::config::{init_logging, ListenArgs};
use pdubridge::network::DatagramDirector;
use pdubridge::{Echo, Result};

/// UDP echo server built on the datagram bridge
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(flatten)]
    listen: ListenArgs,
}

fn run(cli: Cli) -> Result<()> {
    let addr = cli.listen.bind_addr()?;

    let mut director = DatagramDirector::bind(addr, Echo)?;
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
