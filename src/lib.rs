//! pdubridge - Transport/Protocol Bridge
//!
//! Arsitektur:
//! - Protocol: PDU = immutable payload + optional peer address
//! - Bridge: stateless upward/downward dispatch per transport kind
//!   (stream: response/indication, datagram: confirmation/request)
//! - Network: mio-driven TCP and UDP directors feeding the bridges

pub mod bridge;
pub mod config;
pub mod error;
pub mod network;
pub mod protocol;

pub use bridge::{
    Confirmation, DatagramBridge, DatagramTransport, Discard, Echo, Indication, Request, Response,
    StreamBridge, StreamTransport,
};
pub use error::{BridgeError, Result};
pub use protocol::{Address, Pdu, PduData};
