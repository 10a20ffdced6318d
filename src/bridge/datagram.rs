//! Datagram bridge: connectionless transport, one peer address per PDU

use bytes::Bytes;
use tracing::debug;

use super::{Confirmation, DatagramTransport, Request};
use crate::error::{BridgeError, Result};
use crate::protocol::{Address, Pdu};

/// Adapts a datagram transport to a PDU-speaking upper layer.
///
/// Inbound PDUs carry the sender as their address; outbound PDUs must carry
/// the recipient.
pub struct DatagramBridge<T> {
    transport: T,
}

impl<T: DatagramTransport> DatagramBridge<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Deliver one received datagram from `(host, port)` to `upper`.
    pub fn upward<U: Confirmation + ?Sized>(
        &mut self,
        raw: &[u8],
        host: &str,
        port: u16,
        upper: &mut U,
    ) -> Result<()> {
        debug!(
            len = raw.len(),
            %host,
            port,
            "confirmation got the buffer"
        );

        let pdu = Pdu::with_address(Bytes::copy_from_slice(raw), Address::host(host, port));
        upper.confirmation(pdu, self)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}

impl<T: DatagramTransport> Request for DatagramBridge<T> {
    fn request(&mut self, pdu: Pdu) -> Result<()> {
        // Address dicek dulu, baru payload
        let (host, port) = pdu
            .address()
            .ok_or_else(|| BridgeError::InvalidAddress("PDU has no destination".into()))?
            .host_port()?;
        let payload = pdu.octets()?;

        debug!(len = payload.len(), %host, port, "request");

        self.transport
            .send_to(payload, &host, port)
            .map_err(BridgeError::TransportWriteFailure)
    }
}
