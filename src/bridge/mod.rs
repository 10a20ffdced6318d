//! Bridge Layer: raw transport buffers <-> PDUs
//!
//! Dua varian, struktur sama:
//!
//! | transport  | upward (ke upper layer) | downward (ke transport) |
//! |------------|-------------------------|-------------------------|
//! | stream     | `Response`              | `Indication`            |
//! | datagram   | `Confirmation`          | `Request`               |
//!
//! The bridges hold no state besides the injected transport. Every crossing
//! is a plain synchronous call; an upper layer that wants to send while
//! handling an upward PDU does so through the downstream handle it is given,
//! before its upward call returns.

use std::io;

use crate::error::Result;
use crate::protocol::Pdu;

mod datagram;
mod policy;
mod stream;

pub use datagram::DatagramBridge;
pub use policy::{Discard, Echo};
pub use stream::StreamBridge;

/// Downward entry point of a stream bridge.
pub trait Indication {
    fn indication(&mut self, pdu: Pdu) -> Result<()>;
}

/// Upward entry point an upper layer exposes to a stream bridge.
pub trait Response {
    /// Called once per chunk received on the connection.
    fn response(&mut self, pdu: Pdu, downstream: &mut dyn Indication) -> Result<()>;
}

/// Downward entry point of a datagram bridge.
pub trait Request {
    fn request(&mut self, pdu: Pdu) -> Result<()>;
}

/// Upward entry point an upper layer exposes to a datagram bridge.
pub trait Confirmation {
    /// Called once per datagram; `pdu.address()` is the sender.
    fn confirmation(&mut self, pdu: Pdu, downstream: &mut dyn Request) -> Result<()>;
}

/// Write primitive of a connection-oriented transport.
///
/// Partial writes are the transport's problem: `write` either accepts the
/// whole buffer or fails.
pub trait StreamTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<()>;
}

/// Send-to primitive of a connectionless transport.
pub trait DatagramTransport {
    fn send_to(&mut self, buf: &[u8], host: &str, port: u16) -> io::Result<()>;
}

impl<T: StreamTransport + ?Sized> StreamTransport for &mut T {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        (**self).write(buf)
    }
}

impl<T: DatagramTransport + ?Sized> DatagramTransport for &mut T {
    fn send_to(&mut self, buf: &[u8], host: &str, port: u16) -> io::Result<()> {
        (**self).send_to(buf, host, port)
    }
}
