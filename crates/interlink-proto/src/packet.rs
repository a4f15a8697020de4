//! Packets and acknowledgements.
//!
//! A [`Packet`] is transient: it is built by the sending application, passed
//! by value through the lifecycle engine and never stored. Only its
//! [`Commitment`] is persisted.
//!
//! Packet payloads are abstracted behind [`PacketData`] so the engine can
//! work with any application payload without knowing its shape. The engine
//! needs exactly three things from a payload: canonical bytes, a timeout
//! height, and a structural self-check.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{
    commitment::Commitment,
    errors::{Result, ValidationError},
    height::Height,
    identifier::{ChannelId, PortId},
};

/// Accessor contract for application packet payloads.
pub trait PacketData: fmt::Debug {
    /// Canonical encoding committed to and carried to the counterparty.
    fn to_bytes(&self) -> Bytes;

    /// Height on the receiving ledger at which the packet times out.
    fn timeout_height(&self) -> Height;

    /// Structural validation of the payload itself.
    fn validate_basic(&self) -> Result<()>;
}

/// Accessor contract for acknowledgement payloads.
pub trait Acknowledgement: fmt::Debug {
    /// Canonical acknowledgement bytes.
    fn to_bytes(&self) -> Bytes;

    /// Commitment stored for this acknowledgement.
    fn commitment(&self) -> Commitment {
        Commitment::acknowledgement(&self.to_bytes())
    }
}

impl Acknowledgement for Bytes {
    fn to_bytes(&self) -> Bytes {
        self.clone()
    }
}

impl Acknowledgement for Vec<u8> {
    fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

/// Payload with no application structure: raw bytes and a timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaquePacketData {
    /// Application bytes
    pub data: Bytes,
    /// Timeout height on the receiving ledger
    pub timeout_height: Height,
}

impl OpaquePacketData {
    /// Create an opaque payload.
    pub fn new(data: impl Into<Bytes>, timeout_height: Height) -> Self {
        Self { data: data.into(), timeout_height }
    }
}

impl PacketData for OpaquePacketData {
    fn to_bytes(&self) -> Bytes {
        self.data.clone()
    }

    fn timeout_height(&self) -> Height {
        self.timeout_height
    }

    fn validate_basic(&self) -> Result<()> {
        if self.data.is_empty() {
            return Err(ValidationError::InvalidPacketData("packet data is empty".to_string()));
        }
        Ok(())
    }
}

/// A packet travelling over a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet<D> {
    /// Sequence number on the sending channel end
    pub sequence: u64,
    /// Sending port
    pub source_port: PortId,
    /// Sending channel
    pub source_channel: ChannelId,
    /// Receiving port
    pub destination_port: PortId,
    /// Receiving channel
    pub destination_channel: ChannelId,
    /// Application payload
    pub data: D,
}

impl<D: PacketData> Packet<D> {
    /// Create a packet.
    pub fn new(
        data: D,
        sequence: u64,
        source_port: PortId,
        source_channel: ChannelId,
        destination_port: PortId,
        destination_channel: ChannelId,
    ) -> Self {
        Self { sequence, source_port, source_channel, destination_port, destination_channel, data }
    }

    /// Timeout height of the payload.
    pub fn timeout_height(&self) -> Height {
        self.data.timeout_height()
    }

    /// Canonical payload bytes.
    pub fn data_bytes(&self) -> Bytes {
        self.data.to_bytes()
    }

    /// Commitment the sending ledger stores for this packet.
    pub fn commitment(&self) -> Commitment {
        Commitment::packet(self.timeout_height(), &self.data_bytes())
    }

    /// Structural validation.
    ///
    /// Identifiers are validated when they are constructed or decoded, so
    /// this checks the remaining fields: sequence, timeout and payload.
    pub fn validate_basic(&self) -> Result<()> {
        if self.sequence == 0 {
            return Err(ValidationError::InvalidPacket("packet sequence cannot be 0".to_string()));
        }
        if self.timeout_height().is_zero() {
            return Err(ValidationError::InvalidPacket(
                "packet timeout height cannot be 0".to_string(),
            ));
        }
        self.data.validate_basic()
    }
}

impl<D: PacketData> fmt::Display for Packet<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "packet #{} {}/{} -> {}/{} (timeout {})",
            self.sequence,
            self.source_port,
            self.source_channel,
            self.destination_port,
            self.destination_channel,
            self.timeout_height()
        )
    }
}
