//! Validation errors for protocol data.

use thiserror::Error;

/// Result alias for protocol validation.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Structural validation failures.
///
/// These never depend on stored state: they describe data that is malformed
/// on its own, before any channel or counter lookup takes place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Identifier is empty or whitespace only
    #[error("{kind} identifier cannot be blank")]
    BlankIdentifier {
        /// Identifier kind (port, channel, ...)
        kind: &'static str,
    },

    /// Identifier length outside the allowed bounds
    #[error("{kind} identifier {id:?} has length {len}, must be between {min} and {max}")]
    IdentifierLength {
        /// Identifier kind
        kind: &'static str,
        /// Offending identifier
        id: String,
        /// Actual length
        len: usize,
        /// Minimum length
        min: usize,
        /// Maximum length
        max: usize,
    },

    /// Identifier contains a character outside the grammar
    #[error("{kind} identifier {id:?} contains invalid character {ch:?}")]
    IdentifierCharacter {
        /// Identifier kind
        kind: &'static str,
        /// Offending identifier
        id: String,
        /// First invalid character
        ch: char,
    },

    /// Channel record is malformed
    #[error("invalid channel: {0}")]
    InvalidChannel(String),

    /// Counterparty endpoint is malformed
    #[error("invalid counterparty: {0}")]
    InvalidCounterparty(String),

    /// Packet is malformed
    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    /// Packet data failed its own validation
    #[error("invalid packet data: {0}")]
    InvalidPacketData(String),

    /// CBOR encoding or decoding failed
    #[error("cbor error: {0}")]
    Cbor(String),
}
