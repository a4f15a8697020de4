//! Channel records.
//!
//! A channel end is identified by `(port id, channel id)` on the local ledger
//! and carries the state, ordering, counterparty endpoint, connection hop and
//! negotiated version. Records are produced by the handshake protocol; this
//! crate only models and validates them.
//!
//! # States
//!
//! ```text
//! ┌──────┐      ┌─────────┐      ┌──────┐      ┌────────┐
//! │ Init │─────>│ TryOpen │─────>│ Open │─────>│ Closed │
//! └──────┘      └─────────┘      └──────┘      └────────┘
//! ```
//!
//! `Uninitialized` is the wire zero value. It never appears in a stored
//! record that passed [`Channel::validate_basic`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::{
    errors::{Result, ValidationError},
    identifier::{ChannelId, ConnectionId, PortId},
};

/// Channel end state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum State {
    /// Wire zero value, never valid in a stored record
    #[default]
    Uninitialized = 0,
    /// Handshake started locally
    Init = 1,
    /// Handshake acknowledged by the counterparty
    TryOpen = 2,
    /// Handshake complete, packets may flow
    Open = 3,
    /// Channel closed, no further sends
    Closed = 4,
}

impl State {
    /// Canonical upper-case name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Init => "INIT",
            Self::TryOpen => "TRYOPEN",
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Packet ordering guarantee, fixed at channel creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Order {
    /// Wire zero value, never valid in a stored record
    #[default]
    None = 0,
    /// Packets may be delivered in any order
    Unordered = 1,
    /// Packets are delivered in strict sequence order
    Ordered = 2,
}

impl Order {
    /// Canonical upper-case name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Unordered => "UNORDERED",
            Self::Ordered => "ORDERED",
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The remote end of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Counterparty {
    /// Port on the counterparty ledger
    pub port_id: PortId,
    /// Channel on the counterparty ledger
    pub channel_id: ChannelId,
}

impl Counterparty {
    /// Create a counterparty endpoint.
    pub fn new(port_id: PortId, channel_id: ChannelId) -> Self {
        Self { port_id, channel_id }
    }

    /// Re-check both identifiers against the host grammar.
    ///
    /// Identifiers are validated on construction, but a record decoded from
    /// a foreign store may bypass that path.
    pub fn validate_basic(&self) -> Result<()> {
        PortId::new(self.port_id.as_str())
            .map_err(|e| ValidationError::InvalidCounterparty(format!("invalid port id: {e}")))?;
        ChannelId::new(self.channel_id.as_str()).map_err(|e| {
            ValidationError::InvalidCounterparty(format!("invalid channel id: {e}"))
        })?;
        Ok(())
    }
}

/// A channel end record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Current state
    pub state: State,
    /// Ordering guarantee
    pub ordering: Order,
    /// Remote endpoint
    pub counterparty: Counterparty,
    /// Connection identifiers the channel is routed over
    pub connection_hops: Vec<ConnectionId>,
    /// Negotiated application version
    pub version: String,
}

impl Channel {
    /// Only single-hop channels are supported by this protocol version.
    pub const MAX_CONNECTION_HOPS: usize = 1;

    /// Create a channel record.
    pub fn new(
        state: State,
        ordering: Order,
        counterparty: Counterparty,
        connection_hops: Vec<ConnectionId>,
        version: impl Into<String>,
    ) -> Self {
        Self { state, ordering, counterparty, connection_hops, version: version.into() }
    }

    /// Check the record is well-formed.
    ///
    /// # Errors
    ///
    /// - `InvalidChannel` if state or ordering is the zero value, the hop
    ///   count is not exactly one, the hop is not a valid connection id, or
    ///   the version is blank
    /// - `InvalidCounterparty` if the counterparty identifiers are invalid
    pub fn validate_basic(&self) -> Result<()> {
        if self.state == State::Uninitialized {
            return Err(ValidationError::InvalidChannel("channel state is unset".to_string()));
        }
        if self.ordering == Order::None {
            return Err(ValidationError::InvalidChannel("channel ordering is unset".to_string()));
        }
        if self.connection_hops.len() != Self::MAX_CONNECTION_HOPS {
            return Err(ValidationError::InvalidChannel(format!(
                "only one connection hop is supported, got {}",
                self.connection_hops.len()
            )));
        }
        ConnectionId::new(self.connection_hops[0].as_str()).map_err(|e| {
            ValidationError::InvalidChannel(format!("invalid connection hop id: {e}"))
        })?;
        if self.version.trim().is_empty() {
            return Err(ValidationError::InvalidChannel(
                "channel version can't be blank".to_string(),
            ));
        }
        self.counterparty.validate_basic()
    }

    /// The single connection hop, if present.
    pub fn connection_hop(&self) -> Option<&ConnectionId> {
        self.connection_hops.first()
    }

    /// True if the channel is open.
    pub fn is_open(&self) -> bool {
        self.state == State::Open
    }
}
