//! Simulated connection keeper.
//!
//! Holds one connection and one light client of the counterparty. Proofs are
//! checked against the counterparty's published [`History`]: the claim must
//! match the snapshot at `proof_height`, and the proof must be
//! [`prove`]`(path, value)` for that exact claim.
//!
//! [`History`]: crate::sim_chain::History

use interlink_core::{CommitmentStore, ConnectionKeeper, MemoryStore, SequenceStore, VerificationError};
use interlink_proto::{
    ChannelId, ClientId, ClientState, Commitment, ConnectionEnd, ConnectionId, ConnectionState,
    Height, PortId, path,
};
use tracing::debug;

use crate::sim_chain::{SharedHistory, prove};

/// Keeper backed by the counterparty's committed snapshots.
#[derive(Debug)]
pub struct SimKeeper {
    connection_id: ConnectionId,
    connection: ConnectionEnd,
    client: ClientState,
    counterparty: SharedHistory,
}

impl SimKeeper {
    /// Open connection whose client has not seen any counterparty height yet.
    pub fn new(connection_id: ConnectionId, client_id: ClientId, counterparty: SharedHistory) -> Self {
        Self {
            connection_id,
            connection: ConnectionEnd::new(ConnectionState::Open, client_id),
            client: ClientState::new(Height::ZERO),
            counterparty,
        }
    }

    /// Advance the light client to `height`. Clients never move backwards.
    pub fn update_client(&mut self, height: Height) {
        if height > self.client.latest_height {
            debug!(from = %self.client.latest_height, to = %height, "client updated");
            self.client.latest_height = height;
        }
    }

    /// Latest counterparty height the client has verified.
    pub fn client_height(&self) -> Height {
        self.client.latest_height
    }

    /// Force the connection into `state`.
    pub fn set_connection_state(&mut self, state: ConnectionState) {
        self.connection.state = state;
    }

    fn verify(
        &self,
        proof_height: Height,
        proof: &[u8],
        path: String,
        claimed: &[u8],
        read: impl FnOnce(&MemoryStore) -> Option<Vec<u8>>,
    ) -> Result<(), VerificationError> {
        if proof_height > self.client.latest_height {
            return Err(VerificationError::ConsensusStateNotFound(proof_height));
        }

        let history = self.counterparty.borrow();
        let snapshot =
            history.at(proof_height).ok_or(VerificationError::ConsensusStateNotFound(proof_height))?;

        match read(snapshot) {
            None => return Err(VerificationError::Absent { path }),
            Some(stored) if stored != claimed => return Err(VerificationError::ValueMismatch { path }),
            Some(_) => {},
        }

        if proof != prove(&path, claimed) {
            return Err(VerificationError::MalformedProof(format!("proof does not open {path}")));
        }
        Ok(())
    }
}

impl ConnectionKeeper for SimKeeper {
    fn connection_end(&self, connection_id: &ConnectionId) -> Option<ConnectionEnd> {
        (connection_id == &self.connection_id).then(|| self.connection.clone())
    }

    fn client_state(&self, client_id: &ClientId) -> Option<ClientState> {
        (client_id == &self.connection.client_id).then_some(self.client)
    }

    fn verify_packet_commitment(
        &self,
        _: &ConnectionEnd,
        proof_height: Height,
        proof: &[u8],
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
        commitment: &Commitment,
    ) -> Result<(), VerificationError> {
        self.verify(
            proof_height,
            proof,
            path::packet_commitment(port_id, channel_id, sequence),
            commitment.as_bytes(),
            |store| {
                store.packet_commitment(port_id, channel_id, sequence).map(|c| c.as_bytes().to_vec())
            },
        )
    }

    fn verify_packet_acknowledgement(
        &self,
        _: &ConnectionEnd,
        proof_height: Height,
        proof: &[u8],
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
        acknowledgement: &Commitment,
    ) -> Result<(), VerificationError> {
        self.verify(
            proof_height,
            proof,
            path::packet_acknowledgement(port_id, channel_id, sequence),
            acknowledgement.as_bytes(),
            |store| {
                store
                    .packet_acknowledgement(port_id, channel_id, sequence)
                    .map(|c| c.as_bytes().to_vec())
            },
        )
    }

    fn verify_next_sequence_recv(
        &self,
        _: &ConnectionEnd,
        proof_height: Height,
        proof: &[u8],
        port_id: &PortId,
        channel_id: &ChannelId,
        next_sequence_recv: u64,
    ) -> Result<(), VerificationError> {
        self.verify(
            proof_height,
            proof,
            path::next_sequence_recv(port_id, channel_id),
            &next_sequence_recv.to_be_bytes(),
            |store| store.next_sequence_recv(port_id, channel_id).map(|n| n.to_be_bytes().to_vec()),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::sim_chain::History;

    use super::*;

    fn ids() -> (PortId, ChannelId) {
        (PortId::new("transfer").unwrap(), ChannelId::new("channel-0").unwrap())
    }

    fn keeper_with(store: MemoryStore, at: Height) -> SimKeeper {
        let history = History::shared();
        history.borrow_mut().record(at, store);
        let mut keeper = SimKeeper::new(
            ConnectionId::new("connection-0").unwrap(),
            ClientId::new("07-tendermint-0").unwrap(),
            history,
        );
        keeper.update_client(at);
        keeper
    }

    #[test]
    fn verifies_committed_value_with_matching_proof() {
        let (port, channel) = ids();
        let commitment = Commitment::packet(Height::new(50), b"data");
        let mut store = MemoryStore::new();
        store.set_packet_commitment(&port, &channel, 1, commitment);
        let keeper = keeper_with(store, Height::new(3));
        let connection = keeper.connection.clone();

        let proof = prove(&path::packet_commitment(&port, &channel, 1), commitment.as_bytes());
        assert_eq!(
            keeper.verify_packet_commitment(
                &connection,
                Height::new(3),
                &proof,
                &port,
                &channel,
                1,
                &commitment
            ),
            Ok(())
        );
    }

    #[test]
    fn rejects_unknown_height_and_wrong_proof() {
        let (port, channel) = ids();
        let mut store = MemoryStore::new();
        store.set_next_sequence_recv(&port, &channel, 4);
        let keeper = keeper_with(store, Height::new(3));
        let connection = keeper.connection.clone();
        let proof = prove(&path::next_sequence_recv(&port, &channel), &4u64.to_be_bytes());

        assert_eq!(
            keeper.verify_next_sequence_recv(&connection, Height::new(9), &proof, &port, &channel, 4),
            Err(VerificationError::ConsensusStateNotFound(Height::new(9)))
        );
        assert!(matches!(
            keeper.verify_next_sequence_recv(&connection, Height::new(3), &proof, &port, &channel, 5),
            Err(VerificationError::ValueMismatch { .. })
        ));
        assert!(matches!(
            keeper.verify_next_sequence_recv(&connection, Height::new(3), b"junk", &port, &channel, 4),
            Err(VerificationError::MalformedProof(_))
        ));
        assert_eq!(
            keeper.verify_next_sequence_recv(&connection, Height::new(3), &proof, &port, &channel, 4),
            Ok(())
        );
    }

    #[test]
    fn client_never_moves_backwards() {
        let mut keeper = keeper_with(MemoryStore::new(), Height::new(7));
        keeper.update_client(Height::new(2));
        assert_eq!(keeper.client_height(), Height::new(7));
    }
}
