//! Handler configuration.

/// Limits applied by the packet handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Maximum size of packet data accepted by `send_packet`
    pub max_packet_data_size: usize,
    /// Maximum size of an acknowledgement written by `packet_executed`
    pub max_ack_size: usize,
}

impl HandlerConfig {
    /// Default packet data limit (16 MiB)
    pub const DEFAULT_MAX_PACKET_DATA_SIZE: usize = 16 * 1024 * 1024;

    /// Default acknowledgement limit (1 MiB)
    pub const DEFAULT_MAX_ACK_SIZE: usize = 1024 * 1024;
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            max_packet_data_size: Self::DEFAULT_MAX_PACKET_DATA_SIZE,
            max_ack_size: Self::DEFAULT_MAX_ACK_SIZE,
        }
    }
}
