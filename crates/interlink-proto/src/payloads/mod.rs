//! Application payloads carried by packets.
//!
//! The lifecycle engine treats payloads through the
//! [`PacketData`](crate::packet::PacketData) trait only; concrete payload
//! kinds live here.

pub mod transfer;

pub use transfer::{Coin, FungibleTokenPacketData, denom_prefix};
