//! Protocol Layer: PDU shape shared by every layer boundary
//!
//! Prinsip desain:
//! - Immutable payload: `Bytes`, tidak ada mutasi in-place
//! - Addressing is metadata, never part of the payload
//! - No serialization: PDU adalah handoff in-process

mod address;
mod pdu;

pub use address::Address;
pub use pdu::{Pdu, PduData};
