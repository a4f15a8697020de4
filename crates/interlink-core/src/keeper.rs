//! Connection, client and proof verification collaborator.
//!
//! Connections, light clients and the proof format are owned by the host.
//! The lifecycle engine consumes them through [`ConnectionKeeper`] and never
//! inspects a proof: it hands over the claim it needs substantiated and
//! acts on the verdict.
//!
//! Every verification claim is a commitment or a counter value at a
//! canonical key (see [`interlink_proto::path`]) on the counterparty ledger
//! at `proof_height`.

use interlink_proto::{
    ChannelId, ClientId, ClientState, Commitment, ConnectionEnd, ConnectionId, Height, PortId,
};
use thiserror::Error;

/// Why a counterparty claim could not be substantiated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The client has no consensus state at the proof height
    #[error("no consensus state at height {0}")]
    ConsensusStateNotFound(Height),

    /// Proof bytes could not be interpreted
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    /// Proof does not establish the claimed value at the key
    #[error("value at {path} does not match the claim")]
    ValueMismatch {
        /// Key the claim was made about
        path: String,
    },

    /// Proof shows the key is absent
    #[error("key {path} is absent on the counterparty")]
    Absent {
        /// Key the claim was made about
        path: String,
    },
}

/// Host capability for connections, clients and proof verification.
pub trait ConnectionKeeper {
    /// Look up a connection end.
    fn connection_end(&self, connection_id: &ConnectionId) -> Option<ConnectionEnd>;

    /// Look up a light client state.
    fn client_state(&self, client_id: &ClientId) -> Option<ClientState>;

    /// Verify the counterparty stores `commitment` as the packet commitment
    /// at `(port_id, channel_id, sequence)`.
    #[allow(clippy::too_many_arguments)]
    fn verify_packet_commitment(
        &self,
        connection: &ConnectionEnd,
        proof_height: Height,
        proof: &[u8],
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
        commitment: &Commitment,
    ) -> Result<(), VerificationError>;

    /// Verify the counterparty stores `acknowledgement` as the
    /// acknowledgement commitment at `(port_id, channel_id, sequence)`.
    #[allow(clippy::too_many_arguments)]
    fn verify_packet_acknowledgement(
        &self,
        connection: &ConnectionEnd,
        proof_height: Height,
        proof: &[u8],
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
        acknowledgement: &Commitment,
    ) -> Result<(), VerificationError>;

    /// Verify the counterparty's next-receive counter at
    /// `(port_id, channel_id)` equals `next_sequence_recv`.
    fn verify_next_sequence_recv(
        &self,
        connection: &ConnectionEnd,
        proof_height: Height,
        proof: &[u8],
        port_id: &PortId,
        channel_id: &ChannelId,
        next_sequence_recv: u64,
    ) -> Result<(), VerificationError>;
}
