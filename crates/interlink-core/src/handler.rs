//! Packet lifecycle state machine.
//!
//! [`PacketHandler`] implements the five packet operations on top of the
//! stores in [`crate::store`] and the host collaborator in
//! [`crate::keeper`].
//!
//! # Lifecycle
//!
//! ```text
//!   sending ledger                          receiving ledger
//!   ──────────────                          ────────────────
//!   send_packet ──── commitment ────────>   recv_packet (verify commitment)
//!                                                │
//!                                           application executes
//!                                                │
//!                                           packet_executed (ack commitment,
//!                                                │            ordered recv counter)
//!   acknowledge_packet <── ack proof ────────────┘
//!         │
//!   cleanup_packet (verify receipt, delete commitment)
//! ```
//!
//! # Failure Model
//!
//! Every operation runs its checks in a fixed order and returns on the first
//! failure. All checks complete before the first write, so a rejected
//! operation leaves the stores untouched. The check order is part of the
//! protocol: two implementations must report the same error for the same
//! input.
//!
//! `recv_packet` and `acknowledge_packet` are read-only. Receipt is recorded
//! by `packet_executed` after the application has run, and send-side storage
//! is reclaimed by `cleanup_packet`, so each step can be retried on its own.
//!
//! Port ownership is not authenticated here; callers are expected to have
//! authorized the calling module for the port before invoking the handler.

use interlink_proto::{
    Acknowledgement, Channel, ChannelId, Commitment, ConnectionEnd, ConnectionState, Height,
    Order, Packet, PacketData, PortId, State, ValidationError,
};
use tracing::{debug, error, info};

use crate::{
    config::HandlerConfig,
    env::Environment,
    error::{Error, InvariantViolation, PacketError},
    event::{EventKind, EventSink, PacketEvent},
    keeper::ConnectionKeeper,
    store::Store,
};

/// Packet lifecycle engine.
///
/// Owns its store, the host's connection keeper and an event sink. Hosts
/// reach the store through [`PacketHandler::store`] and
/// [`PacketHandler::store_mut`] for handshake writes and queries.
#[derive(Debug)]
pub struct PacketHandler<S, K, E> {
    store: S,
    keeper: K,
    events: E,
    config: HandlerConfig,
}

impl<S, K, E> PacketHandler<S, K, E>
where
    S: Store,
    K: ConnectionKeeper,
    E: EventSink,
{
    /// Create a handler with default limits.
    pub fn new(store: S, keeper: K, events: E) -> Self {
        Self::with_config(store, keeper, events, HandlerConfig::default())
    }

    /// Create a handler with explicit limits.
    pub fn with_config(store: S, keeper: K, events: E, config: HandlerConfig) -> Self {
        Self { store, keeper, events, config }
    }

    /// Store handle.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable store handle.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Connection keeper handle.
    pub fn keeper(&self) -> &K {
        &self.keeper
    }

    /// Mutable connection keeper handle.
    pub fn keeper_mut(&mut self) -> &mut K {
        &mut self.keeper
    }

    /// Event sink handle.
    pub fn events(&self) -> &E {
        &self.events
    }

    /// Active limits.
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Install a negotiated channel end and start its counters at 1.
    ///
    /// This is the hand-off point from the handshake protocol: the record
    /// must be well-formed, and the channel must not already exist.
    ///
    /// # Errors
    ///
    /// - `InvalidChannel` if the record fails validation
    /// - `InvalidChannelState` if a channel already exists at the end
    pub fn open_channel(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        channel: Channel,
    ) -> Result<(), PacketError> {
        channel.validate_basic().map_err(PacketError::InvalidChannel)?;

        if let Some(existing) = self.store.channel(port_id, channel_id) {
            return Err(PacketError::InvalidChannelState {
                state: existing.state,
                reason: "channel already exists",
            });
        }

        info!(
            port = %port_id,
            channel = %channel_id,
            ordering = %channel.ordering,
            state = %channel.state,
            "channel installed"
        );

        self.store.set_channel(port_id, channel_id, channel);
        self.store.set_next_sequence_send(port_id, channel_id, 1);
        self.store.set_next_sequence_recv(port_id, channel_id, 1);
        self.store.set_next_sequence_ack(port_id, channel_id, 1);
        Ok(())
    }

    /// Move a channel end to `Closed`.
    ///
    /// # Errors
    ///
    /// - `ChannelNotFound` if there is no channel at the end
    /// - `InvalidChannelState` if the channel is already closed
    pub fn close_channel(&mut self, port_id: &PortId, channel_id: &ChannelId) -> Result<(), PacketError> {
        let mut channel = self.channel_end(port_id, channel_id)?;
        if channel.state == State::Closed {
            return Err(PacketError::InvalidChannelState {
                state: channel.state,
                reason: "channel is already CLOSED",
            });
        }

        channel.state = State::Closed;
        self.store.set_channel(port_id, channel_id, channel);
        info!(port = %port_id, channel = %channel_id, "channel closed");
        Ok(())
    }

    /// Commit an outgoing packet.
    ///
    /// Advances the next-send counter, stores the packet commitment and
    /// emits a `send_packet` event for relayers.
    ///
    /// # Errors
    ///
    /// In check order: `InvalidPacket` (malformed), `ChannelNotFound`,
    /// `InvalidChannelState` (closed), `InvalidPacket` (destination is not
    /// the counterparty), `ConnectionNotFound`, `InvalidConnectionState`,
    /// `ClientStateNotFound`, `PacketTimeout`, `SequenceSendNotFound`,
    /// `InvalidPacket` (sequence mismatch).
    pub fn send_packet<D: PacketData>(&mut self, packet: &Packet<D>) -> Result<(), PacketError> {
        let next_sequence_send = self.check_send(packet).inspect_err(|err| {
            debug!(sequence = packet.sequence, error = %err, "send_packet rejected");
        })?;

        self.store.set_next_sequence_send(
            &packet.source_port,
            &packet.source_channel,
            next_sequence_send,
        );
        self.store.set_packet_commitment(
            &packet.source_port,
            &packet.source_channel,
            packet.sequence,
            packet.commitment(),
        );
        self.events.emit(PacketEvent::from_packet(EventKind::SendPacket, packet));

        info!(%packet, "packet sent");
        Ok(())
    }

    /// Returns the next-send value to store on success.
    fn check_send<D: PacketData>(&self, packet: &Packet<D>) -> Result<u64, PacketError> {
        packet.validate_basic()?;
        let data_len = packet.data_bytes().len();
        if data_len > self.config.max_packet_data_size {
            return Err(PacketError::invalid_packet(format!(
                "packet data is {data_len} bytes, limit is {}",
                self.config.max_packet_data_size
            )));
        }

        let channel = self.channel_end(&packet.source_port, &packet.source_channel)?;
        if channel.state == State::Closed {
            return Err(PacketError::InvalidChannelState {
                state: channel.state,
                reason: "channel is CLOSED",
            });
        }

        check_destination(&channel, packet)?;

        let connection = self.connection_of(&channel)?;
        // An uninitialized connection is treated as closed
        if connection.state == ConnectionState::Uninitialized {
            return Err(PacketError::InvalidConnectionState {
                state: connection.state,
                reason: "connection is closed",
            });
        }

        let client_state = self
            .keeper
            .client_state(&connection.client_id)
            .ok_or_else(|| PacketError::ClientStateNotFound(connection.client_id.clone()))?;

        // Already timed out on the receiving ledger
        if client_state.latest_height >= packet.timeout_height() {
            return Err(PacketError::PacketTimeout {
                height: client_state.latest_height,
                timeout_height: packet.timeout_height(),
            });
        }

        let next_sequence_send = self
            .store
            .next_sequence_send(&packet.source_port, &packet.source_channel)
            .ok_or_else(|| PacketError::SequenceSendNotFound {
                port_id: packet.source_port.clone(),
                channel_id: packet.source_channel.clone(),
            })?;

        if packet.sequence != next_sequence_send {
            return Err(PacketError::invalid_packet(format!(
                "packet sequence ≠ next send sequence ({} ≠ {next_sequence_send})",
                packet.sequence
            )));
        }

        next_sequence_send
            .checked_add(1)
            .ok_or_else(|| PacketError::invalid_packet("send sequence exhausted"))
    }

    /// Verify an incoming packet against the counterparty's commitment.
    ///
    /// Read-only: the packet is handed back for application execution and
    /// receipt is recorded later by [`PacketHandler::packet_executed`].
    ///
    /// # Errors
    ///
    /// In check order: `ChannelNotFound`, `InvalidChannelState` (not open),
    /// `InvalidPacket` (source is not the counterparty),
    /// `ConnectionNotFound`, `InvalidConnectionState` (not open),
    /// `PacketTimeout`, `VerificationFailed`.
    pub fn recv_packet<D: PacketData>(
        &self,
        packet: Packet<D>,
        proof: &[u8],
        proof_height: Height,
        env: &impl Environment,
    ) -> Result<Packet<D>, PacketError> {
        self.check_recv(&packet, proof, proof_height, env.block_height()).inspect_err(|err| {
            debug!(sequence = packet.sequence, error = %err, "recv_packet rejected");
        })?;

        debug!(%packet, %proof_height, "packet verified");
        Ok(packet)
    }

    fn check_recv<D: PacketData>(
        &self,
        packet: &Packet<D>,
        proof: &[u8],
        proof_height: Height,
        block_height: Height,
    ) -> Result<(), PacketError> {
        let channel = self.open_channel_end(&packet.destination_port, &packet.destination_channel)?;

        if packet.source_port != channel.counterparty.port_id {
            return Err(PacketError::invalid_packet(format!(
                "packet source port doesn't match the counterparty's port ({} ≠ {})",
                packet.source_port, channel.counterparty.port_id
            )));
        }
        if packet.source_channel != channel.counterparty.channel_id {
            return Err(PacketError::invalid_packet(format!(
                "packet source channel doesn't match the counterparty's channel ({} ≠ {})",
                packet.source_channel, channel.counterparty.channel_id
            )));
        }

        let connection = self.open_connection_of(&channel)?;

        if block_height >= packet.timeout_height() {
            return Err(PacketError::PacketTimeout {
                height: block_height,
                timeout_height: packet.timeout_height(),
            });
        }

        self.keeper
            .verify_packet_commitment(
                &connection,
                proof_height,
                proof,
                &packet.source_port,
                &packet.source_channel,
                packet.sequence,
                &packet.commitment(),
            )
            .map_err(|source| PacketError::VerificationFailed {
                context: "couldn't verify counterparty packet commitment",
                source,
            })
    }

    /// Record that a received packet has been executed.
    ///
    /// Writes the acknowledgement commitment when an acknowledgement was
    /// produced or the channel is unordered, and on ordered channels
    /// advances the next-receive counter. Must be called exactly once per
    /// received packet, after the application has applied it.
    ///
    /// # Errors
    ///
    /// In check order: `ChannelNotFound`, `InvalidChannelState` (not open),
    /// `InvalidPacket` (acknowledgement over the size limit), and on ordered
    /// channels `SequenceReceiveNotFound` and `InvalidPacket` (sequence
    /// mismatch).
    pub fn packet_executed<D: PacketData>(
        &mut self,
        packet: &Packet<D>,
        acknowledgement: Option<&dyn Acknowledgement>,
    ) -> Result<(), PacketError> {
        let receipt = self.check_executed(packet, acknowledgement).inspect_err(|err| {
            debug!(sequence = packet.sequence, error = %err, "packet_executed rejected");
        })?;

        if let Some(ack) = receipt.acknowledgement {
            self.store.set_packet_acknowledgement(
                &packet.destination_port,
                &packet.destination_channel,
                packet.sequence,
                ack,
            );
        }
        if let Some(next_sequence_recv) = receipt.next_sequence_recv {
            self.store.set_next_sequence_recv(
                &packet.destination_port,
                &packet.destination_channel,
                next_sequence_recv,
            );
        }
        self.events.emit(PacketEvent::from_packet(EventKind::RecvPacket, packet));

        info!(%packet, "packet received");
        Ok(())
    }

    fn check_executed<D: PacketData>(
        &self,
        packet: &Packet<D>,
        acknowledgement: Option<&dyn Acknowledgement>,
    ) -> Result<Receipt, PacketError> {
        let channel = self.open_channel_end(&packet.destination_port, &packet.destination_channel)?;

        let ack_bytes = acknowledgement.map(Acknowledgement::to_bytes);
        if let Some(bytes) = &ack_bytes
            && bytes.len() > self.config.max_ack_size
        {
            return Err(PacketError::invalid_packet(format!(
                "acknowledgement is {} bytes, limit is {}",
                bytes.len(),
                self.config.max_ack_size
            )));
        }

        // Unordered channels always record a receipt; a missing
        // acknowledgement commits the empty payload.
        let acknowledgement = match (&ack_bytes, channel.ordering) {
            (Some(bytes), _) => Some(Commitment::acknowledgement(bytes)),
            (None, Order::Unordered) => Some(Commitment::acknowledgement(&[])),
            (None, _) => None,
        };

        let next_sequence_recv = if channel.ordering == Order::Ordered {
            let next_sequence_recv = self
                .store
                .next_sequence_recv(&packet.destination_port, &packet.destination_channel)
                .ok_or_else(|| PacketError::SequenceReceiveNotFound {
                    port_id: packet.destination_port.clone(),
                    channel_id: packet.destination_channel.clone(),
                })?;

            if packet.sequence != next_sequence_recv {
                return Err(PacketError::invalid_packet(format!(
                    "packet sequence ≠ next receive sequence ({} ≠ {next_sequence_recv})",
                    packet.sequence
                )));
            }

            Some(
                next_sequence_recv
                    .checked_add(1)
                    .ok_or_else(|| PacketError::invalid_packet("receive sequence exhausted"))?,
            )
        } else {
            None
        };

        Ok(Receipt { acknowledgement, next_sequence_recv })
    }

    /// Verify the counterparty's acknowledgement of a packet we sent.
    ///
    /// Read-only: the commitment stays in place until
    /// [`PacketHandler::cleanup_packet`] reclaims it.
    ///
    /// # Errors
    ///
    /// In check order: `ChannelNotFound`, `InvalidChannelState` (not open),
    /// `InvalidPacket` (destination is not the counterparty),
    /// `ConnectionNotFound`, `InvalidConnectionState` (not open),
    /// `InvalidPacket` (no matching commitment), `VerificationFailed`.
    pub fn acknowledge_packet<D: PacketData>(
        &self,
        packet: Packet<D>,
        acknowledgement: &dyn Acknowledgement,
        proof: &[u8],
        proof_height: Height,
    ) -> Result<Packet<D>, PacketError> {
        self.check_acknowledge(&packet, acknowledgement, proof, proof_height).inspect_err(
            |err| {
                debug!(sequence = packet.sequence, error = %err, "acknowledge_packet rejected");
            },
        )?;

        info!(%packet, "packet acknowledged");
        Ok(packet)
    }

    fn check_acknowledge<D: PacketData>(
        &self,
        packet: &Packet<D>,
        acknowledgement: &dyn Acknowledgement,
        proof: &[u8],
        proof_height: Height,
    ) -> Result<(), PacketError> {
        let channel = self.open_channel_end(&packet.source_port, &packet.source_channel)?;
        check_destination(&channel, packet)?;
        let connection = self.open_connection_of(&channel)?;
        self.check_commitment(packet)?;

        self.keeper
            .verify_packet_acknowledgement(
                &connection,
                proof_height,
                proof,
                &packet.destination_port,
                &packet.destination_channel,
                packet.sequence,
                &acknowledgement.commitment(),
            )
            .map_err(|source| PacketError::VerificationFailed {
                context: "invalid acknowledgement on counterparty chain",
                source,
            })
    }

    /// Reclaim the commitment of a packet the counterparty has processed.
    ///
    /// On ordered channels the proof shows the counterparty's next-receive
    /// counter has moved past the packet. On unordered channels it shows the
    /// counterparty holds the acknowledgement commitment for
    /// `acknowledgement`.
    ///
    /// # Errors
    ///
    /// Recoverable, in check order: `ChannelNotFound`,
    /// `InvalidChannelState` (not open), `InvalidPacket` (destination is not
    /// the counterparty), `ConnectionNotFound`, `InvalidPacket` (counterparty
    /// has not moved past the packet), `InvalidPacket` (no matching
    /// commitment), `VerificationFailed`.
    ///
    /// Fatal: `InvalidChannelOrdering` if the stored channel has no valid
    /// ordering.
    pub fn cleanup_packet<D: PacketData>(
        &mut self,
        packet: Packet<D>,
        proof: &[u8],
        proof_height: Height,
        next_sequence_recv: u64,
        acknowledgement: &[u8],
    ) -> Result<Packet<D>, Error> {
        self.check_cleanup(&packet, proof, proof_height, next_sequence_recv, acknowledgement)
            .inspect_err(|err| match err {
                Error::Invariant(violation) => {
                    error!(sequence = packet.sequence, %violation, "cleanup_packet hit corrupt state");
                },
                Error::Packet(err) => {
                    debug!(sequence = packet.sequence, error = %err, "cleanup_packet rejected");
                },
            })?;

        self.store.delete_packet_commitment(
            &packet.source_port,
            &packet.source_channel,
            packet.sequence,
        );

        info!(%packet, "packet cleaned up");
        Ok(packet)
    }

    fn check_cleanup<D: PacketData>(
        &self,
        packet: &Packet<D>,
        proof: &[u8],
        proof_height: Height,
        next_sequence_recv: u64,
        acknowledgement: &[u8],
    ) -> Result<(), Error> {
        let channel = self.open_channel_end(&packet.source_port, &packet.source_channel)?;
        check_destination(&channel, packet)?;
        let connection = self.connection_of(&channel)?;

        // The counterparty must already have moved past this packet
        if next_sequence_recv <= packet.sequence {
            return Err(PacketError::invalid_packet(format!(
                "packet not yet received by the counterparty (next receive {next_sequence_recv} ≤ sequence {})",
                packet.sequence
            ))
            .into());
        }

        self.check_commitment(packet)?;

        let verified = match channel.ordering {
            Order::Ordered => self.keeper.verify_next_sequence_recv(
                &connection,
                proof_height,
                proof,
                &packet.destination_port,
                &packet.destination_channel,
                next_sequence_recv,
            ),
            Order::Unordered => self.keeper.verify_packet_acknowledgement(
                &connection,
                proof_height,
                proof,
                &packet.destination_port,
                &packet.destination_channel,
                packet.sequence,
                &Commitment::acknowledgement(acknowledgement),
            ),
            Order::None => {
                return Err(InvariantViolation::InvalidChannelOrdering {
                    port_id: packet.source_port.clone(),
                    channel_id: packet.source_channel.clone(),
                    ordering: channel.ordering,
                }
                .into());
            },
        };

        verified.map_err(|source| {
            PacketError::VerificationFailed { context: "packet verification failed", source }.into()
        })
    }

    /// Sequences sent on the channel that have not been cleaned up.
    pub fn in_flight_sequences(&self, port_id: &PortId, channel_id: &ChannelId) -> Vec<u64> {
        self.store.packet_commitment_sequences(port_id, channel_id)
    }

    /// Acknowledgement commitment recorded for a received packet.
    pub fn packet_acknowledgement(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
    ) -> Option<Commitment> {
        self.store.packet_acknowledgement(port_id, channel_id, sequence)
    }

    fn channel_end(&self, port_id: &PortId, channel_id: &ChannelId) -> Result<Channel, PacketError> {
        self.store.channel(port_id, channel_id).ok_or_else(|| PacketError::ChannelNotFound {
            port_id: port_id.clone(),
            channel_id: channel_id.clone(),
        })
    }

    fn open_channel_end(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<Channel, PacketError> {
        let channel = self.channel_end(port_id, channel_id)?;
        if !channel.is_open() {
            return Err(PacketError::InvalidChannelState {
                state: channel.state,
                reason: "channel state is not OPEN",
            });
        }
        Ok(channel)
    }

    fn connection_of(&self, channel: &Channel) -> Result<ConnectionEnd, PacketError> {
        let hop = channel.connection_hop().ok_or_else(|| {
            PacketError::InvalidChannel(ValidationError::InvalidChannel(
                "channel has no connection hop".to_string(),
            ))
        })?;
        self.keeper.connection_end(hop).ok_or_else(|| PacketError::ConnectionNotFound(hop.clone()))
    }

    fn open_connection_of(&self, channel: &Channel) -> Result<ConnectionEnd, PacketError> {
        let connection = self.connection_of(channel)?;
        if connection.state != ConnectionState::Open {
            return Err(PacketError::InvalidConnectionState {
                state: connection.state,
                reason: "connection state is not OPEN",
            });
        }
        Ok(connection)
    }

    /// The stored commitment must match the packet: it was sent by us and
    /// has not been cleaned up yet.
    fn check_commitment<D: PacketData>(&self, packet: &Packet<D>) -> Result<(), PacketError> {
        let stored = self.store.packet_commitment(
            &packet.source_port,
            &packet.source_channel,
            packet.sequence,
        );
        if stored != Some(packet.commitment()) {
            return Err(PacketError::invalid_packet("packet hasn't been sent"));
        }
        Ok(())
    }
}

/// Writes planned by `packet_executed` once its checks pass.
struct Receipt {
    acknowledgement: Option<Commitment>,
    next_sequence_recv: Option<u64>,
}

/// The packet's destination must be the channel's counterparty.
fn check_destination<D: PacketData>(
    channel: &Channel,
    packet: &Packet<D>,
) -> Result<(), PacketError> {
    if packet.destination_port != channel.counterparty.port_id {
        return Err(PacketError::invalid_packet(format!(
            "packet destination port doesn't match the counterparty's port ({} ≠ {})",
            packet.destination_port, channel.counterparty.port_id
        )));
    }
    if packet.destination_channel != channel.counterparty.channel_id {
        return Err(PacketError::invalid_packet(format!(
            "packet destination channel doesn't match the counterparty's channel ({} ≠ {})",
            packet.destination_channel, channel.counterparty.channel_id
        )));
    }
    Ok(())
}
