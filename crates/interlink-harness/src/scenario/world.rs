//! World state for scenario execution.
//!
//! The World owns both simulated ledgers and the relayer between them,
//! records what happened to every relay step, and exposes the queries the
//! oracles check.

use bytes::Bytes;
use interlink_core::{CommitmentStore, PacketError, SequenceStore};
use interlink_proto::{Height, OpaquePacketData, Order, Packet, PacketData};
use tracing::debug;

use crate::{
    model::{ObservableState, Operation, OperationError, OperationResult},
    relayer::{RelayError, Relayer},
    sim_chain::SimChain,
};

/// Relay step recorded by the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    /// Packet sent on the source
    Send,
    /// Packet relayed to the destination
    Deliver,
    /// Acknowledgement relayed back and packet cleaned up
    Acknowledge,
}

/// Outcome of one recorded step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// What was attempted
    pub kind: StepKind,
    /// Sequence on success, error otherwise
    pub outcome: Result<u64, RelayError>,
}

/// Two ledgers, one channel, one relayer.
#[derive(Debug)]
pub struct World {
    ordering: Order,
    source: SimChain,
    destination: SimChain,
    relayer: Relayer,
    steps: Vec<Step>,
}

impl World {
    /// Create a world with a freshly opened channel.
    pub fn new(ordering: Order) -> Result<Self, String> {
        let (source, destination) = SimChain::connected_pair(ordering)?;
        Ok(Self { ordering, source, destination, relayer: Relayer::new(), steps: Vec::new() })
    }

    /// Channel ordering.
    pub fn ordering(&self) -> Order {
        self.ordering
    }

    /// Sending ledger.
    pub fn source(&self) -> &SimChain {
        &self.source
    }

    /// Mutable sending ledger.
    pub fn source_mut(&mut self) -> &mut SimChain {
        &mut self.source
    }

    /// Receiving ledger.
    pub fn destination(&self) -> &SimChain {
        &self.destination
    }

    /// Mutable receiving ledger.
    pub fn destination_mut(&mut self) -> &mut SimChain {
        &mut self.destination
    }

    /// Both ledgers at once, source first.
    pub fn chains_mut(&mut self) -> (&mut SimChain, &mut SimChain) {
        (&mut self.source, &mut self.destination)
    }

    /// Relayer between the ledgers.
    pub fn relayer(&self) -> &Relayer {
        &self.relayer
    }

    /// Every recorded step, in order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of successful steps of `kind`.
    pub fn successes(&self, kind: &StepKind) -> usize {
        self.steps.iter().filter(|step| &step.kind == kind && step.outcome.is_ok()).count()
    }

    /// Number of failed steps of `kind`.
    pub fn failures(&self, kind: &StepKind) -> usize {
        self.steps.iter().filter(|step| &step.kind == kind && step.outcome.is_err()).count()
    }

    /// Send `data` as the next packet on the source and queue it for
    /// relaying.
    pub fn send<D: PacketData>(&mut self, data: D) -> Result<u64, RelayError> {
        let outcome = self.try_send(data);
        self.steps.push(Step { kind: StepKind::Send, outcome: outcome.clone() });
        outcome
    }

    fn try_send<D: PacketData>(&mut self, data: D) -> Result<u64, RelayError> {
        let sequence = self
            .source
            .handler()
            .store()
            .next_sequence_send(self.source.port_id(), self.source.channel_id())
            .ok_or_else(|| RelayError::ChannelMissing(self.source.name().to_string()))?;
        let packet = Packet::new(
            data,
            sequence,
            self.source.port_id().clone(),
            self.source.channel_id().clone(),
            self.destination.port_id().clone(),
            self.destination.channel_id().clone(),
        );

        self.source.handler_mut().send_packet(&packet)?;
        self.source.commit();
        self.relayer.scan(&self.source)?;
        Ok(sequence)
    }

    /// Send an opaque payload timing out `ttl` blocks past the source's
    /// latest view of the destination.
    pub fn send_opaque(&mut self, data: impl Into<Bytes>, ttl: u64) -> Result<u64, RelayError> {
        let client_height = self.source.handler().keeper().client_height();
        let timeout = Height::new(client_height.value().saturating_add(ttl));
        self.send(OpaquePacketData::new(data, timeout))
    }

    /// Relay the pending packet at `index`.
    pub fn deliver(&mut self, index: usize) -> Result<u64, RelayError> {
        let outcome = self.relayer.deliver(index, &self.source, &mut self.destination);
        self.steps.push(Step { kind: StepKind::Deliver, outcome: outcome.clone() });
        outcome
    }

    /// Relay back the acknowledgement at `index`.
    pub fn acknowledge(&mut self, index: usize) -> Result<u64, RelayError> {
        let outcome = self.relayer.acknowledge(index, &mut self.source, &self.destination);
        self.steps.push(Step { kind: StepKind::Acknowledge, outcome: outcome.clone() });
        outcome
    }

    /// Deliver everything deliverable, oldest first, then relay back every
    /// acknowledgement. Packets that cannot be delivered stay pending.
    pub fn drain(&mut self) {
        let mut index = 0;
        while index < self.relayer.pending().len() {
            if self.deliver(index).is_err() {
                index += 1;
            }
        }
        while !self.relayer.delivered().is_empty() {
            if self.acknowledge(0).is_err() {
                break;
            }
        }
    }

    /// Apply a model operation to the real ledgers.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        debug!(?op, "apply");
        match *op {
            Operation::Send { ttl, len } => {
                let payload: Vec<u8> = (0..len).collect();
                match self.send_opaque(payload, u64::from(ttl)) {
                    Ok(_) => OperationResult::Ok,
                    Err(RelayError::Packet(PacketError::PacketTimeout { .. })) => {
                        OperationResult::Error(OperationError::Timeout)
                    },
                    Err(RelayError::Packet(PacketError::InvalidPacket { .. })) => {
                        OperationResult::Error(OperationError::InvalidPacket)
                    },
                    Err(_) => OperationResult::Error(OperationError::Unexpected),
                }
            },
            Operation::Deliver { index } => match self.deliver(usize::from(index)) {
                Ok(_) => OperationResult::Ok,
                Err(RelayError::NothingToRelay) => {
                    OperationResult::Error(OperationError::NothingToRelay)
                },
                Err(RelayError::Packet(PacketError::PacketTimeout { .. })) => {
                    OperationResult::Error(OperationError::Timeout)
                },
                Err(RelayError::Packet(PacketError::InvalidPacket { .. })) => {
                    OperationResult::Error(OperationError::OutOfOrder)
                },
                Err(_) => OperationResult::Error(OperationError::Unexpected),
            },
            Operation::Acknowledge { index } => match self.acknowledge(usize::from(index)) {
                Ok(_) => OperationResult::Ok,
                Err(RelayError::NothingToRelay) => {
                    OperationResult::Error(OperationError::NothingToRelay)
                },
                Err(_) => OperationResult::Error(OperationError::Unexpected),
            },
            Operation::AdvanceDestination { blocks } => {
                self.destination.advance(u64::from(blocks));
                OperationResult::Ok
            },
        }
    }

    /// State comparable with the reference model.
    pub fn observable_state(&self) -> ObservableState {
        let source = self.source.handler();
        let destination = self.destination.handler();
        ObservableState {
            next_send: source
                .store()
                .next_sequence_send(self.source.port_id(), self.source.channel_id())
                .unwrap_or_default(),
            next_recv: destination
                .store()
                .next_sequence_recv(self.destination.port_id(), self.destination.channel_id())
                .unwrap_or_default(),
            in_flight: source.in_flight_sequences(self.source.port_id(), self.source.channel_id()),
            acknowledgements: destination.store().acknowledgement_count(),
            destination_height: self.destination.height().value(),
        }
    }

    /// True if every delivered packet has an acknowledgement commitment on
    /// the destination.
    pub fn acknowledgements_recorded(&self) -> bool {
        let store = self.destination.handler().store();
        self.relayer.delivered().iter().all(|delivered| {
            store
                .packet_acknowledgement(
                    self.destination.port_id(),
                    self.destination.channel_id(),
                    delivered.packet.sequence,
                )
                .is_some()
        })
    }
}
