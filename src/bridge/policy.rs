//! Stock upper-layer policies

use tracing::trace;

use super::{Confirmation, Indication, Request, Response};
use crate::error::Result;
use crate::protocol::Pdu;

/// Sends every PDU straight back where it came from.
///
/// On a stream that is the same connection; for datagrams the inbound
/// source address becomes the outbound destination unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Echo;

impl Response for Echo {
    fn response(&mut self, pdu: Pdu, downstream: &mut dyn Indication) -> Result<()> {
        trace!(len = pdu.len(), "echo");
        downstream.indication(pdu)
    }
}

impl Confirmation for Echo {
    fn confirmation(&mut self, pdu: Pdu, downstream: &mut dyn Request) -> Result<()> {
        trace!(len = pdu.len(), "echo");
        downstream.request(pdu)
    }
}

/// Accepts and drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl Response for Discard {
    fn response(&mut self, _pdu: Pdu, _downstream: &mut dyn Indication) -> Result<()> {
        Ok(())
    }
}

impl Confirmation for Discard {
    fn confirmation(&mut self, _pdu: Pdu, _downstream: &mut dyn Request) -> Result<()> {
        Ok(())
    }
}
