//! Receiving application.
//!
//! The simulated destination ledger runs a token transfer application: it
//! decodes each packet as [`FungibleTokenPacketData`] and acknowledges with
//! a success or error result. The engine never looks at the acknowledgement
//! content; it only commits to it.

use bytes::Bytes;
use interlink_proto::{FungibleTokenPacketData, OpaquePacketData, Packet, PacketData};

/// Acknowledgement written for a successfully applied transfer.
pub const SUCCESS_ACK: &[u8] = br#"{"result":"AQ=="}"#;

/// Execute `packet` and produce its acknowledgement.
pub fn on_recv_packet(packet: &Packet<OpaquePacketData>) -> Bytes {
    let applied = FungibleTokenPacketData::decode(&packet.data.data).and_then(|transfer| {
        transfer.validate_basic()?;
        Ok(transfer)
    });

    match applied {
        Ok(_) => Bytes::from_static(SUCCESS_ACK),
        Err(err) => Bytes::from(format!(r#"{{"error":"{err}"}}"#)),
    }
}
