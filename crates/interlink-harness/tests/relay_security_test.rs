//! Relaying with forged inputs.
//!
//! The honest relayer always builds proofs from committed state. These
//! tests bypass it and call the ledgers directly with proofs and claims a
//! dishonest relayer could submit.

use bytes::Bytes;
use interlink_core::{Error, PacketError, VerificationError};
use interlink_harness::{RelayError, Relayer, scenario::World, sim_chain::prove};
use interlink_proto::{Commitment, ConnectionState, Height, OpaquePacketData, Order, Packet, path};

fn world_with_sent_packet(ordering: Order) -> (World, Packet<OpaquePacketData>) {
    let mut world = World::new(ordering).unwrap();
    world.send_opaque(&b"transfer me"[..], 50).unwrap();
    let packet = world.relayer().pending()[0].clone();
    (world, packet)
}

#[test]
fn forged_packet_data_fails_verification() {
    let (mut world, packet) = world_with_sent_packet(Order::Unordered);
    let proof_height = world.source().height();

    let mut forged = packet;
    forged.data = OpaquePacketData::new(&b"transfer you"[..], forged.data.timeout_height);
    let proof = prove(
        &path::packet_commitment(&forged.source_port, &forged.source_channel, forged.sequence),
        forged.commitment().as_bytes(),
    );

    let destination = world.destination_mut();
    destination.handler_mut().keeper_mut().update_client(proof_height);
    let host_height = destination.height();
    let result = destination.handler().recv_packet(forged, &proof, proof_height, &host_height);

    assert!(matches!(
        result,
        Err(PacketError::VerificationFailed { source: VerificationError::ValueMismatch { .. }, .. })
    ));
}

#[test]
fn proof_for_another_key_is_malformed() {
    let (mut world, packet) = world_with_sent_packet(Order::Unordered);
    let proof_height = world.source().height();

    // Right value, wrong key
    let proof = prove(
        &path::packet_commitment(&packet.source_port, &packet.source_channel, 99),
        packet.commitment().as_bytes(),
    );

    let destination = world.destination_mut();
    destination.handler_mut().keeper_mut().update_client(proof_height);
    let host_height = destination.height();
    let result = destination.handler().recv_packet(packet, &proof, proof_height, &host_height);

    assert!(matches!(
        result,
        Err(PacketError::VerificationFailed { source: VerificationError::MalformedProof(_), .. })
    ));
}

#[test]
fn proof_beyond_client_height_is_rejected() {
    let (mut world, packet) = world_with_sent_packet(Order::Unordered);
    let proof = prove(
        &path::packet_commitment(&packet.source_port, &packet.source_channel, packet.sequence),
        packet.commitment().as_bytes(),
    );

    // Client never updated, so no consensus state at height 1
    let destination = world.destination_mut();
    let host_height = destination.height();
    let result = destination.handler().recv_packet(packet, &proof, Height::new(1), &host_height);

    assert!(matches!(
        result,
        Err(PacketError::VerificationFailed {
            source: VerificationError::ConsensusStateNotFound(_),
            ..
        })
    ));
}

#[test]
fn forged_acknowledgement_cannot_clean_up() {
    let (mut world, _) = world_with_sent_packet(Order::Unordered);
    world.deliver(0).unwrap();
    let delivered = world.relayer().delivered()[0].clone();
    let proof_height = world.destination().height();

    let forged_ack = Bytes::from_static(br#"{"result":"forged"}"#);
    let proof = prove(
        &path::packet_acknowledgement(
            &delivered.packet.destination_port,
            &delivered.packet.destination_channel,
            delivered.packet.sequence,
        ),
        Commitment::acknowledgement(&forged_ack).as_bytes(),
    );

    let source = world.source_mut();
    source.handler_mut().keeper_mut().update_client(proof_height);
    let result = source.handler_mut().cleanup_packet(
        delivered.packet.clone(),
        &proof,
        proof_height,
        delivered.packet.sequence + 1,
        &forged_ack,
    );

    assert!(matches!(
        result,
        Err(Error::Packet(PacketError::VerificationFailed {
            source: VerificationError::ValueMismatch { .. },
            ..
        }))
    ));
    assert_eq!(source.handler().in_flight_sequences(source.port_id(), source.channel_id()), vec![1]);
}

#[test]
fn ordered_cleanup_with_inflated_counter_fails() {
    let (mut world, _) = world_with_sent_packet(Order::Ordered);
    world.deliver(0).unwrap();
    let delivered = world.relayer().delivered()[0].clone();
    let proof_height = world.destination().height();

    // Destination's next receive is 2; claim 3
    let proof = prove(
        &path::next_sequence_recv(
            &delivered.packet.destination_port,
            &delivered.packet.destination_channel,
        ),
        &3u64.to_be_bytes(),
    );

    let source = world.source_mut();
    source.handler_mut().keeper_mut().update_client(proof_height);
    let result =
        source.handler_mut().cleanup_packet(delivered.packet.clone(), &proof, proof_height, 3, b"");

    assert!(matches!(result, Err(Error::Packet(PacketError::VerificationFailed { .. }))));
}

#[test]
fn replayed_delivery_is_rejected_on_ordered_channel() {
    let (mut world, packet) = world_with_sent_packet(Order::Ordered);
    world.deliver(0).unwrap();

    // A second relayer that also saw the send event replays it
    let mut replayer = Relayer::new();
    replayer.scan(world.source()).unwrap();
    assert_eq!(replayer.pending(), &[packet][..]);

    let (source, destination) = world.chains_mut();
    let result = replayer.deliver(0, source, destination);

    assert!(matches!(result, Err(RelayError::Packet(PacketError::InvalidPacket { .. }))));
    insta::assert_snapshot!(
        result.unwrap_err().to_string(),
        @"invalid packet: packet sequence ≠ next receive sequence (1 ≠ 2)"
    );
    assert_eq!(world.observable_state().next_recv, 2);
    assert_eq!(world.observable_state().acknowledgements, 1);
}

#[test]
fn replayed_delivery_overwrites_nothing_on_unordered_channel() {
    let (mut world, _) = world_with_sent_packet(Order::Unordered);
    world.deliver(0).unwrap();
    let before = world.destination().handler().store().clone();

    let mut replayer = Relayer::new();
    replayer.scan(world.source()).unwrap();
    let (source, destination) = world.chains_mut();
    // Unordered receipt is idempotent: same packet, same acknowledgement
    replayer.deliver(0, source, destination).unwrap();

    assert_eq!(world.destination().handler().store(), &before);
}

#[test]
fn delivery_over_reopening_connection_is_rejected() {
    let (mut world, _) = world_with_sent_packet(Order::Unordered);
    world
        .destination_mut()
        .handler_mut()
        .keeper_mut()
        .set_connection_state(ConnectionState::TryOpen);

    let err = world.deliver(0).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"invalid connection state: connection state is not OPEN (got TRYOPEN)"
    );
    // Packet stays queued for a later attempt
    assert_eq!(world.relayer().pending().len(), 1);
    assert_eq!(world.observable_state().acknowledgements, 0);
}
