//! Packet events.
//!
//! Events are the side channel relayers watch to learn which packets to
//! carry. The handler appends them to an injected [`EventSink`]; they are
//! never part of an operation's return value.

use interlink_proto::{Packet, PacketData};

/// Attribute keys shared by send and receive events.
pub mod attributes {
    /// Hex-encoded packet data
    pub const DATA: &str = "data";
    /// Packet timeout height
    pub const TIMEOUT_HEIGHT: &str = "timeout-height";
    /// Packet sequence
    pub const SEQUENCE: &str = "sequence";
    /// Source port
    pub const SRC_PORT: &str = "src-port";
    /// Source channel
    pub const SRC_CHANNEL: &str = "src-channel";
    /// Destination port
    pub const DST_PORT: &str = "dst-port";
    /// Destination channel
    pub const DST_CHANNEL: &str = "dst-channel";
}

/// Kind of packet event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A packet was committed for sending
    SendPacket,
    /// A received packet was executed and its receipt recorded
    RecvPacket,
}

impl EventKind {
    /// Event type string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SendPacket => "send_packet",
            Self::RecvPacket => "recv_packet",
        }
    }
}

/// A structured packet event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketEvent {
    /// Event kind
    pub kind: EventKind,
    /// Ordered key/value attributes
    pub attributes: Vec<(&'static str, String)>,
}

impl PacketEvent {
    /// Build the standard attribute set for `packet`.
    pub fn from_packet<D: PacketData>(kind: EventKind, packet: &Packet<D>) -> Self {
        let attributes = vec![
            (attributes::DATA, hex::encode(packet.data_bytes())),
            (attributes::TIMEOUT_HEIGHT, packet.timeout_height().to_string()),
            (attributes::SEQUENCE, packet.sequence.to_string()),
            (attributes::SRC_PORT, packet.source_port.to_string()),
            (attributes::SRC_CHANNEL, packet.source_channel.to_string()),
            (attributes::DST_PORT, packet.destination_port.to_string()),
            (attributes::DST_CHANNEL, packet.destination_channel.to_string()),
        ];
        Self { kind, attributes }
    }

    /// Value of the first attribute named `key`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }
}

/// Append-only destination for packet events.
pub trait EventSink {
    /// Record an event.
    fn emit(&mut self, event: PacketEvent);
}

impl EventSink for Vec<PacketEvent> {
    fn emit(&mut self, event: PacketEvent) {
        self.push(event);
    }
}

impl<T: EventSink + ?Sized> EventSink for &mut T {
    fn emit(&mut self, event: PacketEvent) {
        (**self).emit(event);
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use interlink_proto::{ChannelId, Height, OpaquePacketData, PortId};

    use super::*;

    #[test]
    fn send_event_carries_all_attributes() {
        let packet = Packet::new(
            OpaquePacketData::new(Bytes::from_static(b"hi"), Height::new(42)),
            5,
            PortId::new("transfer").unwrap(),
            ChannelId::new("channel-0").unwrap(),
            PortId::new("transfer").unwrap(),
            ChannelId::new("channel-1").unwrap(),
        );
        let event = PacketEvent::from_packet(EventKind::SendPacket, &packet);

        let rendered: Vec<String> =
            event.attributes.iter().map(|(k, v)| format!("{k}={v}")).collect();
        insta::assert_snapshot!(
            rendered.join(" "),
            @"data=6869 timeout-height=42 sequence=5 src-port=transfer src-channel=channel-0 dst-port=transfer dst-channel=channel-1"
        );
        assert_eq!(event.kind.as_str(), "send_packet");
        assert_eq!(event.attribute(attributes::SEQUENCE), Some("5"));
        assert_eq!(event.attribute("missing"), None);
    }
}
