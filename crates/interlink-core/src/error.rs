//! Packet lifecycle errors.
//!
//! Two classes of failure are kept apart:
//!
//! - [`PacketError`]: the caller's transaction is invalid. The host aborts
//!   the enclosing state transition and nothing was written.
//! - [`InvariantViolation`]: a stored record holds a value outside its
//!   defined range. This is data corruption, never a caller mistake, and
//!   hosts must treat it as unrecoverable.
//!
//! [`Error`] carries either class for the operations that can hit both.

use interlink_proto::{
    ChannelId, ClientId, ConnectionId, ConnectionState, Height, Order, PortId, State,
    ValidationError,
};
use thiserror::Error;

use crate::keeper::VerificationError;

/// Recoverable packet lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    /// No channel stored at the given end
    #[error("channel not found: {port_id}/{channel_id}")]
    ChannelNotFound {
        /// Port identifier
        port_id: PortId,
        /// Channel identifier
        channel_id: ChannelId,
    },

    /// Channel is in a state that forbids the operation
    #[error("invalid channel state: {reason} (got {state})")]
    InvalidChannelState {
        /// Stored state
        state: State,
        /// What was required
        reason: &'static str,
    },

    /// Channel record failed validation
    #[error("invalid channel: {0}")]
    InvalidChannel(#[source] ValidationError),

    /// Packet is malformed, misrouted, out of sequence or not committed
    #[error("invalid packet: {reason}")]
    InvalidPacket {
        /// Human-readable cause
        reason: String,
    },

    /// Packet timeout height has already been reached
    #[error("packet timeout: height {height} has reached timeout height {timeout_height}")]
    PacketTimeout {
        /// Height the packet was checked against
        height: Height,
        /// Packet timeout height
        timeout_height: Height,
    },

    /// No next-send counter for the channel
    #[error("next send sequence not found for {port_id}/{channel_id}")]
    SequenceSendNotFound {
        /// Port identifier
        port_id: PortId,
        /// Channel identifier
        channel_id: ChannelId,
    },

    /// No next-receive counter for the channel
    #[error("next receive sequence not found for {port_id}/{channel_id}")]
    SequenceReceiveNotFound {
        /// Port identifier
        port_id: PortId,
        /// Channel identifier
        channel_id: ChannelId,
    },

    /// Channel's connection hop does not resolve
    #[error("connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    /// Connection is in a state that forbids the operation
    #[error("invalid connection state: {reason} (got {state})")]
    InvalidConnectionState {
        /// Connection state
        state: ConnectionState,
        /// What was required
        reason: &'static str,
    },

    /// No client state for the connection's client
    #[error("client state not found: {0}")]
    ClientStateNotFound(ClientId),

    /// Counterparty proof did not verify
    #[error("{context}: {source}")]
    VerificationFailed {
        /// Which claim was being verified
        context: &'static str,
        /// Collaborator failure
        source: VerificationError,
    },
}

impl PacketError {
    pub(crate) fn invalid_packet(reason: impl Into<String>) -> Self {
        Self::InvalidPacket { reason: reason.into() }
    }
}

impl From<ValidationError> for PacketError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidPacket { reason: err.to_string() }
    }
}

/// Stored state violates a protocol invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// Channel ordering is outside the defined enum values
    #[error("invalid channel ordering {ordering} on {port_id}/{channel_id}")]
    InvalidChannelOrdering {
        /// Port identifier
        port_id: PortId,
        /// Channel identifier
        channel_id: ChannelId,
        /// Stored ordering
        ordering: Order,
    },
}

/// Either a recoverable packet error or a fatal invariant violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Recoverable, the transaction is rejected
    #[error(transparent)]
    Packet(#[from] PacketError),

    /// Fatal, the host must halt
    #[error("invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

impl Error {
    /// True if the host must treat this as unrecoverable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }

    /// The recoverable error, if this is one.
    pub fn as_packet_error(&self) -> Option<&PacketError> {
        match self {
            Self::Packet(err) => Some(err),
            Self::Invariant(_) => None,
        }
    }
}
