//! Network Layer: concrete transports under the bridges
//!
//! Menggunakan mio untuk cross-platform non-blocking I/O.
//!
//! - `StreamDirector`: TCP listener, one `StreamBridge` actor per connection
//! - `DatagramDirector`: UDP socket feeding a single `DatagramBridge`

mod connection;
mod server;
mod udp;

pub use connection::Connection;
pub use server::{StreamDirector, StreamOptions, HELLO};
pub use udp::{DatagramDirector, UdpTransport};
