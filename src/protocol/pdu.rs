//! Protocol Data Unit
//!
//! Layout:
//! ┌─────────────────────────────────────────────────────┐
//! │ data: PduData (Octets payload, immutable Bytes)     │
//! ├─────────────────────────────────────────────────────┤
//! │ address: Option<Address> (datagram only)            │
//! └─────────────────────────────────────────────────────┘
//!
//! Payload tidak pernah dimutasi setelah dibuat. Slicing dan clone
//! hanya menaikkan refcount, tidak ada copy.

use bytes::Bytes;

use super::Address;
use crate::error::{BridgeError, Result};

/// Isi PDU seperti yang diisi oleh upper layer.
///
/// Only `Octets` is a byte sequence the transport can carry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PduData {
    /// Raw octets
    Octets(Bytes),
    /// Text an upper layer has not encoded yet
    Text(String),
    /// Never set
    #[default]
    Absent,
}

impl PduData {
    /// Name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            PduData::Octets(_) => "octets",
            PduData::Text(_) => "text",
            PduData::Absent => "nothing",
        }
    }
}

impl From<Bytes> for PduData {
    fn from(b: Bytes) -> Self {
        PduData::Octets(b)
    }
}

impl From<Vec<u8>> for PduData {
    fn from(v: Vec<u8>) -> Self {
        PduData::Octets(Bytes::from(v))
    }
}

impl From<&'static [u8]> for PduData {
    fn from(s: &'static [u8]) -> Self {
        PduData::Octets(Bytes::from_static(s))
    }
}

impl<const N: usize> From<&'static [u8; N]> for PduData {
    fn from(s: &'static [u8; N]) -> Self {
        PduData::Octets(Bytes::from_static(s))
    }
}

/// A payload plus optional addressing metadata.
///
/// For inbound datagram PDUs `address` is the sender; for outbound ones it is
/// the intended recipient. Stream PDUs leave it empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pdu {
    data: PduData,
    address: Option<Address>,
}

impl Pdu {
    pub fn new(data: impl Into<PduData>) -> Self {
        Self {
            data: data.into(),
            address: None,
        }
    }

    pub fn with_address(data: impl Into<PduData>, address: impl Into<Address>) -> Self {
        Self {
            data: data.into(),
            address: Some(address.into()),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(PduData::Text(text.into()))
    }

    /// Copy a borrowed transport buffer into a new PDU.
    ///
    /// The transport is free to reuse `raw` as soon as this returns.
    pub fn from_slice(raw: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(raw))
    }

    pub fn data(&self) -> &PduData {
        &self.data
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    /// Return a new PDU with the same payload addressed to `address`.
    pub fn addressed(self, address: impl Into<Address>) -> Self {
        Self {
            data: self.data,
            address: Some(address.into()),
        }
    }

    /// The payload as octets, or `InvalidPayloadType`.
    pub fn octets(&self) -> Result<&Bytes> {
        match &self.data {
            PduData::Octets(b) => Ok(b),
            other => Err(BridgeError::InvalidPayloadType(other.kind())),
        }
    }

    /// Payload length in bytes (0 if the payload is not octets).
    pub fn len(&self) -> usize {
        match &self.data {
            PduData::Octets(b) => b.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_parts(self) -> (PduData, Option<Address>) {
        (self.data, self.address)
    }
}
