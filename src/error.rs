//! Error types for the bridge and its server plumbing

use std::io;

use thiserror::Error;

/// Errors raised while moving PDUs across a layer boundary.
///
/// `InvalidPayloadType` and `InvalidAddress` are raised by local shape
/// validation before the transport is touched. `TransportWriteFailure`
/// carries the transport's own error untouched.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("PDU payload is not a byte sequence (found {0})")]
    InvalidPayloadType(&'static str),

    #[error("invalid PDU address: {0}")]
    InvalidAddress(String),

    #[error("transport write failed: {0}")]
    TransportWriteFailure(#[source] io::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    /// True for errors raised by shape validation rather than I/O.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BridgeError::InvalidPayloadType(_) | BridgeError::InvalidAddress(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
