//! Keyed stores for channel state.
//!
//! Three independent stores back the lifecycle engine:
//!
//! - [`ChannelStore`]: `(port, channel)` to [`Channel`] record
//! - [`SequenceStore`]: next-send, next-receive and next-acknowledge
//!   counters per channel
//! - [`CommitmentStore`]: `(port, channel, sequence)` to packet and
//!   acknowledgement commitments
//!
//! Stores hold no business logic. Absence is reported as `None` and it is
//! up to the caller to decide whether that is an error; counters are never
//! defaulted.
//!
//! Atomicity is the host's job: the engine performs every check before its
//! first write, so a host that discards a failed transaction never observes
//! partial state.

mod memory;

use interlink_proto::{Channel, ChannelId, Commitment, PortId};
pub use memory::MemoryStore;

/// Channel registry.
pub trait ChannelStore {
    /// Channel record at `(port_id, channel_id)`.
    fn channel(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<Channel>;

    /// Store a channel record.
    fn set_channel(&mut self, port_id: &PortId, channel_id: &ChannelId, channel: Channel);
}

/// Per-channel sequence counters.
pub trait SequenceStore {
    /// Next sequence to send.
    fn next_sequence_send(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<u64>;

    /// Set the next sequence to send.
    fn set_next_sequence_send(&mut self, port_id: &PortId, channel_id: &ChannelId, sequence: u64);

    /// Next sequence expected on receive.
    fn next_sequence_recv(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<u64>;

    /// Set the next sequence expected on receive.
    fn set_next_sequence_recv(&mut self, port_id: &PortId, channel_id: &ChannelId, sequence: u64);

    /// Next sequence expected to be acknowledged.
    fn next_sequence_ack(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<u64>;

    /// Set the next sequence expected to be acknowledged.
    fn set_next_sequence_ack(&mut self, port_id: &PortId, channel_id: &ChannelId, sequence: u64);
}

/// Packet and acknowledgement commitments.
pub trait CommitmentStore {
    /// Send-side commitment at `(port_id, channel_id, sequence)`.
    fn packet_commitment(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
    ) -> Option<Commitment>;

    /// Store a send-side commitment.
    fn set_packet_commitment(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
        commitment: Commitment,
    );

    /// Remove a send-side commitment.
    fn delete_packet_commitment(&mut self, port_id: &PortId, channel_id: &ChannelId, sequence: u64);

    /// Sequences with a send-side commitment on the channel, ascending.
    fn packet_commitment_sequences(&self, port_id: &PortId, channel_id: &ChannelId) -> Vec<u64>;

    /// Acknowledgement commitment at `(port_id, channel_id, sequence)`.
    fn packet_acknowledgement(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
    ) -> Option<Commitment>;

    /// Store an acknowledgement commitment.
    fn set_packet_acknowledgement(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
        commitment: Commitment,
    );

    /// Remove an acknowledgement commitment.
    fn delete_packet_acknowledgement(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
    );
}

/// All three stores behind one handle.
pub trait Store: ChannelStore + SequenceStore + CommitmentStore {}

impl<T: ChannelStore + SequenceStore + CommitmentStore> Store for T {}
