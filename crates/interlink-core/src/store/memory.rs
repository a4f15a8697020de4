//! In-memory store.
//!
//! Ordered maps keep iteration deterministic, which the simulation harness
//! relies on when it snapshots a ledger's state per height.

use std::collections::BTreeMap;

use interlink_proto::{Channel, ChannelId, Commitment, PortId};

use super::{ChannelStore, CommitmentStore, SequenceStore};

type ChannelKey = (PortId, ChannelId);
type PacketKey = (PortId, ChannelId, u64);

fn channel_key(port_id: &PortId, channel_id: &ChannelId) -> ChannelKey {
    (port_id.clone(), channel_id.clone())
}

fn packet_key(port_id: &PortId, channel_id: &ChannelId, sequence: u64) -> PacketKey {
    (port_id.clone(), channel_id.clone(), sequence)
}

/// In-memory implementation of all three stores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    channels: BTreeMap<ChannelKey, Channel>,
    next_send: BTreeMap<ChannelKey, u64>,
    next_recv: BTreeMap<ChannelKey, u64>,
    next_ack: BTreeMap<ChannelKey, u64>,
    commitments: BTreeMap<PacketKey, Commitment>,
    acknowledgements: BTreeMap<PacketKey, Commitment>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of send-side commitments across all channels.
    pub fn commitment_count(&self) -> usize {
        self.commitments.len()
    }

    /// Number of acknowledgement commitments across all channels.
    pub fn acknowledgement_count(&self) -> usize {
        self.acknowledgements.len()
    }
}

impl ChannelStore for MemoryStore {
    fn channel(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<Channel> {
        self.channels.get(&channel_key(port_id, channel_id)).cloned()
    }

    fn set_channel(&mut self, port_id: &PortId, channel_id: &ChannelId, channel: Channel) {
        self.channels.insert(channel_key(port_id, channel_id), channel);
    }
}

impl SequenceStore for MemoryStore {
    fn next_sequence_send(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<u64> {
        self.next_send.get(&channel_key(port_id, channel_id)).copied()
    }

    fn set_next_sequence_send(&mut self, port_id: &PortId, channel_id: &ChannelId, sequence: u64) {
        self.next_send.insert(channel_key(port_id, channel_id), sequence);
    }

    fn next_sequence_recv(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<u64> {
        self.next_recv.get(&channel_key(port_id, channel_id)).copied()
    }

    fn set_next_sequence_recv(&mut self, port_id: &PortId, channel_id: &ChannelId, sequence: u64) {
        self.next_recv.insert(channel_key(port_id, channel_id), sequence);
    }

    fn next_sequence_ack(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<u64> {
        self.next_ack.get(&channel_key(port_id, channel_id)).copied()
    }

    fn set_next_sequence_ack(&mut self, port_id: &PortId, channel_id: &ChannelId, sequence: u64) {
        self.next_ack.insert(channel_key(port_id, channel_id), sequence);
    }
}

impl CommitmentStore for MemoryStore {
    fn packet_commitment(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
    ) -> Option<Commitment> {
        self.commitments.get(&packet_key(port_id, channel_id, sequence)).copied()
    }

    fn set_packet_commitment(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
        commitment: Commitment,
    ) {
        self.commitments.insert(packet_key(port_id, channel_id, sequence), commitment);
    }

    fn delete_packet_commitment(&mut self, port_id: &PortId, channel_id: &ChannelId, sequence: u64) {
        self.commitments.remove(&packet_key(port_id, channel_id, sequence));
    }

    fn packet_commitment_sequences(&self, port_id: &PortId, channel_id: &ChannelId) -> Vec<u64> {
        self.commitments
            .keys()
            .filter(|(port, channel, _)| port == port_id && channel == channel_id)
            .map(|(_, _, sequence)| *sequence)
            .collect()
    }

    fn packet_acknowledgement(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
    ) -> Option<Commitment> {
        self.acknowledgements.get(&packet_key(port_id, channel_id, sequence)).copied()
    }

    fn set_packet_acknowledgement(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
        commitment: Commitment,
    ) {
        self.acknowledgements.insert(packet_key(port_id, channel_id, sequence), commitment);
    }

    fn delete_packet_acknowledgement(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
    ) {
        self.acknowledgements.remove(&packet_key(port_id, channel_id, sequence));
    }
}
