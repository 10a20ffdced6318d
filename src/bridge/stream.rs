//! Stream bridge: connection-oriented transport, no addressing

use tracing::debug;

use super::{Indication, Response, StreamTransport};
use crate::error::{BridgeError, Result};
use crate::protocol::Pdu;

/// Adapts a byte-stream transport to a PDU-speaking upper layer.
///
/// The connection already fixes the peer, so stream PDUs carry no address.
pub struct StreamBridge<T> {
    transport: T,
}

impl<T: StreamTransport> StreamBridge<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Deliver one received chunk to `upper` as a PDU.
    ///
    /// `raw` is copied before `upper` runs, so the transport may reuse its
    /// read buffer once this returns. Errors from `upper` (including those
    /// from any downward call it made) come back unchanged.
    pub fn upward<U: Response + ?Sized>(&mut self, raw: &[u8], upper: &mut U) -> Result<()> {
        debug!(len = raw.len(), "response got the buffer");

        let pdu = Pdu::from_slice(raw);
        upper.response(pdu, self)
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

impl<T: StreamTransport> Indication for StreamBridge<T> {
    fn indication(&mut self, pdu: Pdu) -> Result<()> {
        let payload = pdu.octets()?;
        debug!(len = payload.len(), "indication");

        self.transport
            .write(payload)
            .map_err(BridgeError::TransportWriteFailure)
    }
}
