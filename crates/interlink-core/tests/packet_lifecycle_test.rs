//! Packet lifecycle integration tests.
//!
//! Each test drives a [`PacketHandler`] through the public API only. The
//! keeper used here verifies claims against a plain copy of the counterparty
//! store, so a proof "verifies" exactly when the counterparty really holds
//! the claimed value.

use bytes::Bytes;
use interlink_core::{
    ChannelStore, CommitmentStore, ConnectionKeeper, Error, EventKind, MemoryStore, PacketError,
    PacketHandler, SequenceStore, VerificationError, event::attributes,
};
use interlink_proto::{
    Channel, ChannelId, ClientId, ClientState, Commitment, ConnectionEnd, ConnectionId,
    ConnectionState, Counterparty, Height, OpaquePacketData, Order, Packet, PortId, State, path,
};
use proptest::prelude::*;

/// Keeper backed by a snapshot of the counterparty's stores.
#[derive(Debug, Default)]
struct MirrorKeeper {
    connection_state: Option<ConnectionState>,
    client_height: Option<Height>,
    counterparty: MemoryStore,
}

impl MirrorKeeper {
    fn open(client_height: u64) -> Self {
        Self {
            connection_state: Some(ConnectionState::Open),
            client_height: Some(Height::new(client_height)),
            counterparty: MemoryStore::new(),
        }
    }
}

impl ConnectionKeeper for MirrorKeeper {
    fn connection_end(&self, connection_id: &ConnectionId) -> Option<ConnectionEnd> {
        if connection_id.as_str() != "connection-0" {
            return None;
        }
        self.connection_state
            .map(|state| ConnectionEnd::new(state, ClientId::new("07-tendermint-0").unwrap()))
    }

    fn client_state(&self, _: &ClientId) -> Option<ClientState> {
        self.client_height.map(ClientState::new)
    }

    fn verify_packet_commitment(
        &self,
        _: &ConnectionEnd,
        _: Height,
        _: &[u8],
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
        commitment: &Commitment,
    ) -> Result<(), VerificationError> {
        let key = path::packet_commitment(port_id, channel_id, sequence);
        match self.counterparty.packet_commitment(port_id, channel_id, sequence) {
            Some(stored) if &stored == commitment => Ok(()),
            Some(_) => Err(VerificationError::ValueMismatch { path: key }),
            None => Err(VerificationError::Absent { path: key }),
        }
    }

    fn verify_packet_acknowledgement(
        &self,
        _: &ConnectionEnd,
        _: Height,
        _: &[u8],
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
        acknowledgement: &Commitment,
    ) -> Result<(), VerificationError> {
        let key = path::packet_acknowledgement(port_id, channel_id, sequence);
        match self.counterparty.packet_acknowledgement(port_id, channel_id, sequence) {
            Some(stored) if &stored == acknowledgement => Ok(()),
            Some(_) => Err(VerificationError::ValueMismatch { path: key }),
            None => Err(VerificationError::Absent { path: key }),
        }
    }

    fn verify_next_sequence_recv(
        &self,
        _: &ConnectionEnd,
        _: Height,
        _: &[u8],
        port_id: &PortId,
        channel_id: &ChannelId,
        next_sequence_recv: u64,
    ) -> Result<(), VerificationError> {
        let key = path::next_sequence_recv(port_id, channel_id);
        match self.counterparty.next_sequence_recv(port_id, channel_id) {
            Some(stored) if stored == next_sequence_recv => Ok(()),
            Some(_) => Err(VerificationError::ValueMismatch { path: key }),
            None => Err(VerificationError::Absent { path: key }),
        }
    }
}

type Handler = PacketHandler<MemoryStore, MirrorKeeper, Vec<interlink_core::PacketEvent>>;

fn transfer() -> PortId {
    PortId::new("transfer").unwrap()
}

fn channel_0() -> ChannelId {
    ChannelId::new("channel-0").unwrap()
}

fn channel_1() -> ChannelId {
    ChannelId::new("channel-1").unwrap()
}

/// Channel end `transfer/channel-0` whose counterparty is `transfer/channel-1`.
fn channel_end(state: State, ordering: Order) -> Channel {
    Channel::new(
        state,
        ordering,
        Counterparty::new(transfer(), channel_1()),
        vec![ConnectionId::new("connection-0").unwrap()],
        "ics20-1",
    )
}

fn handler(ordering: Order) -> Handler {
    let mut handler = PacketHandler::new(MemoryStore::new(), MirrorKeeper::open(10), Vec::new());
    handler.open_channel(&transfer(), &channel_0(), channel_end(State::Open, ordering)).unwrap();
    handler
}

fn outgoing(sequence: u64, data: &'static [u8]) -> Packet<OpaquePacketData> {
    Packet::new(
        OpaquePacketData::new(Bytes::from_static(data), Height::new(100)),
        sequence,
        transfer(),
        channel_0(),
        transfer(),
        channel_1(),
    )
}

fn incoming(sequence: u64, data: &'static [u8]) -> Packet<OpaquePacketData> {
    Packet::new(
        OpaquePacketData::new(Bytes::from_static(data), Height::new(100)),
        sequence,
        transfer(),
        channel_1(),
        transfer(),
        channel_0(),
    )
}

fn next_send(handler: &Handler) -> Option<u64> {
    handler.store().next_sequence_send(&transfer(), &channel_0())
}

fn next_recv(handler: &Handler) -> Option<u64> {
    handler.store().next_sequence_recv(&transfer(), &channel_0())
}

#[test]
fn ordered_send_advances_counter() {
    let mut handler = handler(Order::Ordered);
    let packet = outgoing(1, b"hello");

    handler.send_packet(&packet).unwrap();

    assert_eq!(next_send(&handler), Some(2));
    assert_eq!(
        handler.store().packet_commitment(&transfer(), &channel_0(), 1),
        Some(Commitment::packet(Height::new(100), b"hello"))
    );

    let event = &handler.events()[0];
    assert_eq!(event.kind, EventKind::SendPacket);
    assert_eq!(event.attribute(attributes::DATA), Some("68656c6c6f"));
    assert_eq!(event.attribute(attributes::DST_CHANNEL), Some("channel-1"));
}

#[test]
fn out_of_sequence_send_leaves_counter() {
    let mut handler = handler(Order::Ordered);

    let result = handler.send_packet(&outgoing(2, b"hello"));

    assert!(matches!(result, Err(PacketError::InvalidPacket { .. })));
    assert_eq!(next_send(&handler), Some(1));
    assert_eq!(handler.store().commitment_count(), 0);
    assert!(handler.events().is_empty());
}

#[test]
fn closed_channel_rejects_any_send() {
    let mut handler: Handler =
        PacketHandler::new(MemoryStore::new(), MirrorKeeper::default(), Vec::new());
    handler
        .open_channel(&transfer(), &channel_0(), channel_end(State::Closed, Order::Ordered))
        .unwrap();

    // Wrong sequence, wrong destination, no connection: state still wins
    let mut packet = outgoing(9, b"hello");
    packet.destination_port = PortId::new("other").unwrap();

    assert!(matches!(
        handler.send_packet(&packet),
        Err(PacketError::InvalidChannelState { state: State::Closed, .. })
    ));
}

#[test]
fn cleanup_before_counterparty_receives_fails() {
    let mut handler = handler(Order::Ordered);
    let packet = outgoing(1, b"hello");
    handler.send_packet(&packet).unwrap();

    let result = handler.cleanup_packet(packet, b"proof", Height::new(5), 1, b"");

    assert!(matches!(result, Err(Error::Packet(PacketError::InvalidPacket { .. }))));
    assert_eq!(handler.in_flight_sequences(&transfer(), &channel_0()), vec![1]);
}

#[test]
fn receive_then_cleanup_too_early() {
    // Receiver side verifies the packet against the sender's commitment
    let mut sender = handler(Order::Ordered);
    let packet = outgoing(1, b"hello");
    sender.send_packet(&packet).unwrap();

    let mut receiver: Handler =
        PacketHandler::new(MemoryStore::new(), MirrorKeeper::open(10), Vec::new());
    let receiver_end = Channel::new(
        State::Open,
        Order::Ordered,
        Counterparty::new(transfer(), channel_0()),
        vec![ConnectionId::new("connection-0").unwrap()],
        "ics20-1",
    );
    receiver.open_channel(&transfer(), &channel_1(), receiver_end).unwrap();
    receiver.keeper_mut().counterparty = sender.store().clone();

    let received =
        receiver.recv_packet(packet.clone(), b"proof", Height::new(5), &Height::new(6)).unwrap();
    assert_eq!(received, packet);

    // Receipt not executed yet, so the counterparty has not advanced
    let result = sender.cleanup_packet(packet, b"proof", Height::new(5), 1, b"");
    assert!(matches!(result, Err(Error::Packet(PacketError::InvalidPacket { .. }))));
}

#[test]
fn unordered_executed_records_ack_only() {
    let mut handler = handler(Order::Unordered);
    let before = handler.store().clone();
    let ack = Bytes::from_static(b"{\"result\":\"AQ==\"}");

    handler.packet_executed(&incoming(7, b"hello"), Some(&ack)).unwrap();

    assert_eq!(
        handler.packet_acknowledgement(&transfer(), &channel_0(), 7),
        Some(Commitment::acknowledgement(&ack))
    );
    let counters: [fn(&MemoryStore, &PortId, &ChannelId) -> Option<u64>; 3] = [
        MemoryStore::next_sequence_send,
        MemoryStore::next_sequence_recv,
        MemoryStore::next_sequence_ack,
    ];
    for read in counters {
        assert_eq!(
            read(handler.store(), &transfer(), &channel_0()),
            read(&before, &transfer(), &channel_0())
        );
    }
    assert_eq!(handler.events()[0].kind, EventKind::RecvPacket);
}

#[test]
fn ordered_executed_enforces_sequence() {
    let mut handler = handler(Order::Ordered);
    let ack = Bytes::from_static(b"ok");

    handler.packet_executed(&incoming(1, b"a"), Some(&ack)).unwrap();
    assert_eq!(next_recv(&handler), Some(2));

    // Replay and skip both fail without advancing
    for sequence in [1, 3] {
        let result = handler.packet_executed(&incoming(sequence, b"a"), Some(&ack));
        assert!(matches!(result, Err(PacketError::InvalidPacket { .. })));
        assert_eq!(next_recv(&handler), Some(2));
    }

    handler.packet_executed(&incoming(2, b"a"), None).unwrap();
    assert_eq!(next_recv(&handler), Some(3));
}

#[test]
fn ordered_executed_without_counter_fails() {
    let mut handler: Handler =
        PacketHandler::new(MemoryStore::new(), MirrorKeeper::open(10), Vec::new());
    // Registered without going through open_channel, so no counters exist
    handler.store_mut().set_channel(&transfer(), &channel_0(), channel_end(State::Open, Order::Ordered));

    let result = handler.packet_executed(&incoming(1, b"a"), None);
    assert!(matches!(result, Err(PacketError::SequenceReceiveNotFound { .. })));
}

#[test]
fn receive_timeout_uses_host_height() {
    let handler = handler(Order::Unordered);

    for height in [100, 101] {
        let result =
            handler.recv_packet(incoming(1, b"a"), b"proof", Height::new(5), &Height::new(height));
        assert!(matches!(result, Err(PacketError::PacketTimeout { .. })));
    }
}

#[test]
fn receive_reports_timeout_before_proof() {
    // Counterparty holds nothing, so verification would also fail
    let handler = handler(Order::Unordered);
    let result =
        handler.recv_packet(incoming(1, b"a"), b"proof", Height::new(5), &Height::new(200));
    assert!(matches!(result, Err(PacketError::PacketTimeout { .. })));

    let result = handler.recv_packet(incoming(1, b"a"), b"proof", Height::new(5), &Height::new(1));
    assert!(matches!(
        result,
        Err(PacketError::VerificationFailed { source: VerificationError::Absent { .. }, .. })
    ));
}

#[test]
fn receive_rejects_foreign_source() {
    let handler = handler(Order::Unordered);
    let mut packet = incoming(1, b"a");
    packet.source_channel = ChannelId::new("channel-42").unwrap();

    let err = handler.recv_packet(packet, b"proof", Height::new(5), &Height::new(1)).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"invalid packet: packet source channel doesn't match the counterparty's channel (channel-42 ≠ channel-1)"
    );
}

#[test]
fn receive_requires_open_connection() {
    let mut handler = handler(Order::Unordered);
    handler.keeper_mut().connection_state = Some(ConnectionState::TryOpen);

    let result = handler.recv_packet(incoming(1, b"a"), b"proof", Height::new(5), &Height::new(1));
    assert!(matches!(
        result,
        Err(PacketError::InvalidConnectionState { state: ConnectionState::TryOpen, .. })
    ));

    handler.keeper_mut().connection_state = None;
    let result = handler.recv_packet(incoming(1, b"a"), b"proof", Height::new(5), &Height::new(1));
    assert!(matches!(result, Err(PacketError::ConnectionNotFound(_))));
}

#[test]
fn send_requires_client_state() {
    let mut handler = handler(Order::Unordered);
    handler.keeper_mut().client_height = None;

    assert!(matches!(
        handler.send_packet(&outgoing(1, b"a")),
        Err(PacketError::ClientStateNotFound(_))
    ));
}

#[test]
fn send_accepts_initializing_connection() {
    let mut handler = handler(Order::Unordered);
    handler.keeper_mut().connection_state = Some(ConnectionState::Init);
    assert!(handler.send_packet(&outgoing(1, b"a")).is_ok());

    handler.keeper_mut().connection_state = Some(ConnectionState::Uninitialized);
    assert!(matches!(
        handler.send_packet(&outgoing(2, b"a")),
        Err(PacketError::InvalidConnectionState { .. })
    ));
}

#[test]
fn acknowledge_detects_tampered_data() {
    let mut handler = handler(Order::Unordered);
    handler.send_packet(&outgoing(1, b"hello")).unwrap();
    let ack = Bytes::from_static(b"ok");

    let result = handler.acknowledge_packet(outgoing(1, b"hellO"), &ack, b"proof", Height::new(5));
    assert!(matches!(result, Err(PacketError::InvalidPacket { .. })));
}

#[test]
fn acknowledge_detects_tampered_ack() {
    let mut handler = handler(Order::Unordered);
    handler.send_packet(&outgoing(1, b"hello")).unwrap();
    handler.keeper_mut().counterparty.set_packet_acknowledgement(
        &transfer(),
        &channel_1(),
        1,
        Commitment::acknowledgement(b"ok"),
    );

    let forged = Bytes::from_static(b"not ok");
    let result = handler.acknowledge_packet(outgoing(1, b"hello"), &forged, b"proof", Height::new(5));
    assert!(matches!(
        result,
        Err(PacketError::VerificationFailed { source: VerificationError::ValueMismatch { .. }, .. })
    ));

    let genuine = Bytes::from_static(b"ok");
    assert!(handler.acknowledge_packet(outgoing(1, b"hello"), &genuine, b"proof", Height::new(5)).is_ok());
}

#[test]
fn unordered_cleanup_is_at_most_once() {
    let mut handler = handler(Order::Unordered);
    handler.send_packet(&outgoing(1, b"hello")).unwrap();
    handler.keeper_mut().counterparty.set_packet_acknowledgement(
        &transfer(),
        &channel_1(),
        1,
        Commitment::acknowledgement(b"ok"),
    );

    handler.cleanup_packet(outgoing(1, b"hello"), b"proof", Height::new(5), 2, b"ok").unwrap();
    assert!(handler.in_flight_sequences(&transfer(), &channel_0()).is_empty());

    let second = handler.cleanup_packet(outgoing(1, b"hello"), b"proof", Height::new(5), 2, b"ok");
    assert!(matches!(
        second,
        Err(Error::Packet(PacketError::InvalidPacket { reason })) if reason == "packet hasn't been sent"
    ));
}

#[test]
fn unordered_cleanup_rejects_wrong_ack() {
    let mut handler = handler(Order::Unordered);
    handler.send_packet(&outgoing(1, b"hello")).unwrap();
    handler.keeper_mut().counterparty.set_packet_acknowledgement(
        &transfer(),
        &channel_1(),
        1,
        Commitment::acknowledgement(b"ok"),
    );

    let result = handler.cleanup_packet(outgoing(1, b"hello"), b"proof", Height::new(5), 2, b"no");
    assert!(matches!(result, Err(Error::Packet(PacketError::VerificationFailed { .. }))));
    assert_eq!(handler.in_flight_sequences(&transfer(), &channel_0()), vec![1]);
}

#[test]
fn ordered_cleanup_checks_counterparty_counter() {
    let mut handler = handler(Order::Ordered);
    handler.send_packet(&outgoing(1, b"hello")).unwrap();
    handler.keeper_mut().counterparty.set_next_sequence_recv(&transfer(), &channel_1(), 2);

    // Claimed counter differs from what the counterparty holds
    let result = handler.cleanup_packet(outgoing(1, b"hello"), b"proof", Height::new(5), 3, b"");
    assert!(matches!(result, Err(Error::Packet(PacketError::VerificationFailed { .. }))));

    handler.cleanup_packet(outgoing(1, b"hello"), b"proof", Height::new(5), 2, b"").unwrap();
    assert_eq!(handler.store().commitment_count(), 0);
}

#[test]
fn cleanup_with_corrupt_ordering_halts() {
    let mut handler = handler(Order::Ordered);
    handler.send_packet(&outgoing(1, b"hello")).unwrap();
    handler
        .store_mut()
        .set_channel(&transfer(), &channel_0(), channel_end(State::Open, Order::None));

    let err = handler
        .cleanup_packet(outgoing(1, b"hello"), b"proof", Height::new(5), 2, b"")
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(
        err,
        Error::Invariant(interlink_core::InvariantViolation::InvalidChannelOrdering {
            ordering: Order::None,
            ..
        })
    ));
}

#[test]
fn open_channel_rejects_unset_ordering() {
    let mut handler: Handler =
        PacketHandler::new(MemoryStore::new(), MirrorKeeper::open(10), Vec::new());
    let result =
        handler.open_channel(&transfer(), &channel_0(), channel_end(State::Open, Order::None));

    assert!(matches!(result, Err(PacketError::InvalidChannel(_))));
    assert_eq!(next_send(&handler), None);
}

#[test]
fn full_round_trip_between_two_handlers() {
    let mut sender = handler(Order::Unordered);
    let mut receiver: Handler =
        PacketHandler::new(MemoryStore::new(), MirrorKeeper::open(10), Vec::new());
    let receiver_end = Channel::new(
        State::Open,
        Order::Unordered,
        Counterparty::new(transfer(), channel_0()),
        vec![ConnectionId::new("connection-0").unwrap()],
        "ics20-1",
    );
    receiver.open_channel(&transfer(), &channel_1(), receiver_end).unwrap();

    let packet = outgoing(1, b"hello");
    sender.send_packet(&packet).unwrap();

    receiver.keeper_mut().counterparty = sender.store().clone();
    let packet = receiver.recv_packet(packet, b"proof", Height::new(5), &Height::new(6)).unwrap();
    let ack = Bytes::from_static(b"ok");
    receiver.packet_executed(&packet, Some(&ack)).unwrap();

    sender.keeper_mut().counterparty = receiver.store().clone();
    let packet = sender.acknowledge_packet(packet, &ack, b"proof", Height::new(7)).unwrap();
    sender.cleanup_packet(packet, b"proof", Height::new(7), 2, &ack).unwrap();

    assert!(sender.in_flight_sequences(&transfer(), &channel_0()).is_empty());
    assert_eq!(
        receiver.packet_acknowledgement(&transfer(), &channel_1(), 1),
        Some(Commitment::acknowledgement(b"ok"))
    );
}

proptest! {
    /// Only the exact next sequence is accepted, and the counter moves by
    /// one per accepted send.
    #[test]
    fn send_sequence_is_monotonic(attempts in prop::collection::vec(1..8u64, 1..40)) {
        let mut handler = handler(Order::Ordered);

        for sequence in attempts {
            let before = next_send(&handler).unwrap();
            let result = handler.send_packet(&outgoing(sequence, b"data"));

            if sequence == before {
                prop_assert!(result.is_ok());
                prop_assert_eq!(next_send(&handler), Some(before + 1));
            } else {
                let is_invalid = matches!(result, Err(PacketError::InvalidPacket { .. }));
                prop_assert!(is_invalid);
                prop_assert_eq!(next_send(&handler), Some(before));
            }
        }

        let sent = handler.in_flight_sequences(&transfer(), &channel_0());
        let expected: Vec<u64> = (1..next_send(&handler).unwrap()).collect();
        prop_assert_eq!(sent, expected);
    }

    /// Unordered receipts never touch a counter, whatever arrives.
    #[test]
    fn unordered_receipts_leave_counters(sequences in prop::collection::vec(1..1000u64, 1..20)) {
        let mut handler = handler(Order::Unordered);
        let ack = Bytes::from_static(b"ok");

        for sequence in sequences {
            handler.packet_executed(&incoming(sequence, b"a"), Some(&ack)).unwrap();
        }

        prop_assert_eq!(next_recv(&handler), Some(1));
        prop_assert_eq!(next_send(&handler), Some(1));
    }
}

#[test]
fn send_to_foreign_destination_on_open_channel() {
    let mut handler = handler(Order::Unordered);
    let mut packet = outgoing(1, b"hello");
    packet.destination_channel = ChannelId::new("channel-9").unwrap();

    let err = handler.send_packet(&packet).unwrap_err();

    insta::assert_snapshot!(
        err.to_string(),
        @"invalid packet: packet destination channel doesn't match the counterparty's channel (channel-9 ≠ channel-1)"
    );
    assert_eq!(next_send(&handler), Some(1));
    assert_eq!(handler.store().commitment_count(), 0);
    assert!(handler.events().is_empty());
}

#[test]
fn send_requires_connection() {
    let mut handler = handler(Order::Ordered);
    handler.keeper_mut().connection_state = None;

    let result = handler.send_packet(&outgoing(1, b"hello"));

    assert_eq!(
        result,
        Err(PacketError::ConnectionNotFound(ConnectionId::new("connection-0").unwrap()))
    );
    assert_eq!(next_send(&handler), Some(1));
    assert_eq!(handler.store().commitment_count(), 0);
}

#[test]
fn send_requires_send_counter() {
    // Channel installed directly, without the counters open_channel sets up
    let mut handler: Handler =
        PacketHandler::new(MemoryStore::new(), MirrorKeeper::open(10), Vec::new());
    handler.store_mut().set_channel(
        &transfer(),
        &channel_0(),
        channel_end(State::Open, Order::Ordered),
    );

    let result = handler.send_packet(&outgoing(1, b"hello"));

    assert_eq!(
        result,
        Err(PacketError::SequenceSendNotFound { port_id: transfer(), channel_id: channel_0() })
    );
    assert_eq!(next_send(&handler), None);
    assert_eq!(handler.store().commitment_count(), 0);
    assert!(handler.events().is_empty());
}

#[test]
fn acknowledge_and_cleanup_reject_foreign_destination() {
    let mut handler = handler(Order::Unordered);
    handler.send_packet(&outgoing(1, b"hello")).unwrap();
    let before = handler.store().clone();

    let mut misrouted = outgoing(1, b"hello");
    misrouted.destination_port = PortId::new("oracle").unwrap();
    let ack = Bytes::from_static(b"ok");

    let result = handler.acknowledge_packet(misrouted.clone(), &ack, b"proof", Height::new(5));
    assert!(matches!(result, Err(PacketError::InvalidPacket { .. })));

    let result = handler.cleanup_packet(misrouted, b"proof", Height::new(5), 2, b"ok");
    assert!(matches!(result, Err(Error::Packet(PacketError::InvalidPacket { .. }))));

    assert_eq!(handler.store(), &before);
    assert_eq!(handler.in_flight_sequences(&transfer(), &channel_0()), vec![1]);
}
