//! Simulated relayer.
//!
//! Carries packets one way, from a source [`SimChain`] to a destination
//! [`SimChain`], and carries acknowledgements back. The relayer is honest:
//! every proof it submits is built from a value the proving ledger really
//! committed. It is also the only actor that learns about packets, and it
//! does so the way a real relayer does, by reading `send_packet` events.
//!
//! ```text
//!   source                 relayer                  destination
//!   ──────                 ───────                  ───────────
//!   send_packet ─event──>  scan
//!                          deliver ──────────────>  recv_packet
//!                                                   packet_executed
//!   acknowledge_packet <── acknowledge
//!   cleanup_packet
//! ```

use std::{collections::VecDeque, fmt, str::FromStr};

use bytes::Bytes;
use interlink_core::{
    CommitmentStore, Error, EventKind, InvariantViolation, PacketError, PacketEvent,
    SequenceStore, event::attributes,
};
use interlink_proto::{
    ChannelId, Commitment, Height, OpaquePacketData, Order, Packet, PortId, path,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    app,
    sim_chain::{SimChain, prove},
};

/// Why a relay step did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// No packet is waiting for this step
    #[error("nothing to relay")]
    NothingToRelay,

    /// A `send_packet` event could not be turned back into a packet
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// The source no longer holds the packet's commitment
    #[error("packet {0} is not committed on the source")]
    NotCommitted(u64),

    /// The channel end is missing on one of the ledgers
    #[error("channel missing on {0}")]
    ChannelMissing(String),

    /// A ledger rejected the step
    #[error(transparent)]
    Packet(#[from] PacketError),

    /// A ledger hit corrupt state
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

impl From<Error> for RelayError {
    fn from(err: Error) -> Self {
        match err {
            Error::Packet(err) => Self::Packet(err),
            Error::Invariant(violation) => Self::Invariant(violation),
        }
    }
}

/// A packet delivered to the destination, waiting for its acknowledgement
/// to be carried back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    /// The packet as the destination received it
    pub packet: Packet<OpaquePacketData>,
    /// Acknowledgement the destination application wrote
    pub acknowledgement: Bytes,
}

/// One-way relayer with a pending queue per lifecycle step.
#[derive(Debug, Default)]
pub struct Relayer {
    cursor: usize,
    pending: Vec<Packet<OpaquePacketData>>,
    delivered: VecDeque<Delivered>,
}

impl Relayer {
    /// Create a relayer that has not read any events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Packets sent but not yet delivered, in send order.
    pub fn pending(&self) -> &[Packet<OpaquePacketData>] {
        &self.pending
    }

    /// Packets delivered but not yet acknowledged on the source.
    pub fn delivered(&self) -> &VecDeque<Delivered> {
        &self.delivered
    }

    /// Pick up `send_packet` events the source emitted since the last scan.
    ///
    /// Returns the number of new packets queued.
    pub fn scan(&mut self, source: &SimChain) -> Result<usize, RelayError> {
        let events = source.handler().events();
        let fresh = events.get(self.cursor..).unwrap_or_default();

        let mut queued = 0;
        for event in fresh.iter().filter(|event| event.kind == EventKind::SendPacket) {
            self.pending.push(packet_from_event(event)?);
            queued += 1;
        }
        self.cursor = events.len();

        if queued > 0 {
            debug!(queued, chain = source.name(), "scanned send events");
        }
        Ok(queued)
    }

    /// Deliver the pending packet at `index` (modulo the queue length).
    ///
    /// On success the packet moves to the delivered queue and the
    /// destination commits. On failure it stays pending.
    pub fn deliver(
        &mut self,
        index: usize,
        source: &SimChain,
        destination: &mut SimChain,
    ) -> Result<u64, RelayError> {
        if self.pending.is_empty() {
            return Err(RelayError::NothingToRelay);
        }
        let index = index % self.pending.len();
        let packet = self.pending[index].clone();

        let commitment = source
            .handler()
            .store()
            .packet_commitment(&packet.source_port, &packet.source_channel, packet.sequence)
            .ok_or(RelayError::NotCommitted(packet.sequence))?;
        let proof_height = source.height();
        let proof = prove(
            &path::packet_commitment(&packet.source_port, &packet.source_channel, packet.sequence),
            commitment.as_bytes(),
        );

        let host_height = destination.height();
        destination.handler_mut().keeper_mut().update_client(proof_height);
        let handler = destination.handler_mut();
        let packet = handler
            .recv_packet(packet, &proof, proof_height, &host_height)
            .inspect_err(|err| warn!(%err, "delivery rejected"))?;

        let acknowledgement = app::on_recv_packet(&packet);
        handler
            .packet_executed(&packet, Some(&acknowledgement))
            .inspect_err(|err| warn!(%err, "execution rejected"))?;
        destination.commit();

        let sequence = packet.sequence;
        self.pending.remove(index);
        self.delivered.push_back(Delivered { packet, acknowledgement });

        info!(sequence, "delivered");
        Ok(sequence)
    }

    /// Carry the acknowledgement of the delivered packet at `index` (modulo
    /// the queue length) back to the source, then clean the packet up.
    pub fn acknowledge(
        &mut self,
        index: usize,
        source: &mut SimChain,
        destination: &SimChain,
    ) -> Result<u64, RelayError> {
        if self.delivered.is_empty() {
            return Err(RelayError::NothingToRelay);
        }
        let index = index % self.delivered.len();
        let Delivered { packet, acknowledgement } = self.delivered[index].clone();

        let proof_height = destination.height();
        let ack_proof = prove(
            &path::packet_acknowledgement(
                &packet.destination_port,
                &packet.destination_channel,
                packet.sequence,
            ),
            Commitment::acknowledgement(&acknowledgement).as_bytes(),
        );
        let (next_sequence_recv, cleanup_proof) =
            cleanup_claim(&packet, destination, &ack_proof)?;

        source.handler_mut().keeper_mut().update_client(proof_height);
        let handler = source.handler_mut();
        let packet = handler
            .acknowledge_packet(packet, &acknowledgement, &ack_proof, proof_height)
            .inspect_err(|err| warn!(%err, "acknowledgement rejected"))?;
        let packet = handler
            .cleanup_packet(packet, &cleanup_proof, proof_height, next_sequence_recv, &acknowledgement)
            .inspect_err(|err| warn!(%err, "cleanup rejected"))?;
        source.commit();

        self.delivered.remove(index);
        info!(sequence = packet.sequence, "acknowledged and cleaned up");
        Ok(packet.sequence)
    }
}

/// Counter value and proof the source needs to clean `packet` up.
///
/// Ordered channels prove the destination's next-receive counter. Unordered
/// channels prove the acknowledgement, and the counter argument only has to
/// show the packet was passed.
fn cleanup_claim(
    packet: &Packet<OpaquePacketData>,
    destination: &SimChain,
    ack_proof: &[u8],
) -> Result<(u64, Vec<u8>), RelayError> {
    let channel =
        destination.channel().ok_or_else(|| RelayError::ChannelMissing(destination.name().to_string()))?;

    if channel.ordering == Order::Ordered {
        let next_sequence_recv = destination
            .handler()
            .store()
            .next_sequence_recv(&packet.destination_port, &packet.destination_channel)
            .ok_or_else(|| RelayError::ChannelMissing(destination.name().to_string()))?;
        let proof = prove(
            &path::next_sequence_recv(&packet.destination_port, &packet.destination_channel),
            &next_sequence_recv.to_be_bytes(),
        );
        Ok((next_sequence_recv, proof))
    } else {
        Ok((packet.sequence.saturating_add(1), ack_proof.to_vec()))
    }
}

/// Rebuild a packet from its `send_packet` event.
///
/// The payload comes back opaque: the commitment only covers its bytes and
/// timeout, so the destination can verify it without knowing its type.
pub fn packet_from_event(event: &PacketEvent) -> Result<Packet<OpaquePacketData>, RelayError> {
    let data = hex::decode(attribute::<String>(event, attributes::DATA)?)
        .map_err(|e| RelayError::MalformedEvent(format!("{}: {e}", attributes::DATA)))?;

    Ok(Packet::new(
        OpaquePacketData::new(data, Height::new(attribute(event, attributes::TIMEOUT_HEIGHT)?)),
        attribute(event, attributes::SEQUENCE)?,
        attribute::<PortId>(event, attributes::SRC_PORT)?,
        attribute::<ChannelId>(event, attributes::SRC_CHANNEL)?,
        attribute::<PortId>(event, attributes::DST_PORT)?,
        attribute::<ChannelId>(event, attributes::DST_CHANNEL)?,
    ))
}

fn attribute<T>(event: &PacketEvent, key: &'static str) -> Result<T, RelayError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    event
        .attribute(key)
        .ok_or_else(|| RelayError::MalformedEvent(format!("missing {key}")))?
        .parse()
        .map_err(|e| RelayError::MalformedEvent(format!("{key}: {e}")))
}
