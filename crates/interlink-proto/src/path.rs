//! Canonical store key paths.
//!
//! Both ledgers agree on these paths: the sender stores a commitment under
//! [`packet_commitment`], and the receiver's light client proves membership
//! of exactly that key. Changing a path is a protocol break.

use crate::identifier::{ChannelId, PortId};

/// Channel record key.
pub fn channel_end(port_id: &PortId, channel_id: &ChannelId) -> String {
    format!("channelEnds/ports/{port_id}/channels/{channel_id}")
}

/// Next-send counter key.
pub fn next_sequence_send(port_id: &PortId, channel_id: &ChannelId) -> String {
    format!("seqSends/ports/{port_id}/channels/{channel_id}/nextSequenceSend")
}

/// Next-receive counter key.
pub fn next_sequence_recv(port_id: &PortId, channel_id: &ChannelId) -> String {
    format!("seqRecvs/ports/{port_id}/channels/{channel_id}/nextSequenceRecv")
}

/// Next-acknowledge counter key.
pub fn next_sequence_ack(port_id: &PortId, channel_id: &ChannelId) -> String {
    format!("seqAcks/ports/{port_id}/channels/{channel_id}/nextSequenceAck")
}

/// Send-side packet commitment key.
pub fn packet_commitment(port_id: &PortId, channel_id: &ChannelId, sequence: u64) -> String {
    format!("commitments/ports/{port_id}/channels/{channel_id}/packets/{sequence}")
}

/// Receive-side acknowledgement commitment key.
pub fn packet_acknowledgement(port_id: &PortId, channel_id: &ChannelId, sequence: u64) -> String {
    format!("acks/ports/{port_id}/channels/{channel_id}/acknowledgements/{sequence}")
}
