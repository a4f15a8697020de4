//! Data model for the Interlink packet-relay protocol.
//!
//! Interlink moves opaque application packets between two ledgers over a
//! verified channel. This crate holds everything both ledgers must agree on
//! bit for bit: identifiers, channel records, packets, commitments and the
//! store key paths that proofs are made against.
//!
//! Nothing here touches storage or performs verification. The lifecycle
//! engine lives in `interlink-core`.
//!
//! # Security
//!
//! Commitments are SHA-256 digests. Identifiers are validated on
//! construction and on deserialization, so a malformed identifier can never
//! be spliced into a key path.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod channel;
pub mod commitment;
pub mod connection;
pub mod errors;
pub mod height;
pub mod identifier;
pub mod packet;
pub mod path;
pub mod payloads;

pub use channel::{Channel, Counterparty, Order, State};
pub use commitment::Commitment;
pub use connection::{ClientState, ConnectionEnd, ConnectionState};
pub use errors::{Result, ValidationError};
pub use height::Height;
pub use identifier::{ChannelId, ClientId, ConnectionId, PortId};
pub use packet::{Acknowledgement, OpaquePacketData, Packet, PacketData};
pub use payloads::{Coin, FungibleTokenPacketData};
