//! Simulated ledger.
//!
//! A [`SimChain`] wraps one [`PacketHandler`] and publishes a snapshot of its
//! store every time it commits. The counterparty's [`SimKeeper`] verifies
//! proofs against those snapshots, so a claim only verifies if the ledger
//! really held the value at the proof height.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use interlink_core::{ChannelStore, MemoryStore, PacketError, PacketEvent, PacketHandler};
use interlink_proto::{
    Channel, ChannelId, ClientId, ConnectionId, Counterparty, Height, Order, PortId, State,
};
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::sim_keeper::SimKeeper;

/// Handler type every simulated ledger runs.
pub type SimHandler = PacketHandler<MemoryStore, SimKeeper, Vec<PacketEvent>>;

/// Committed store snapshots shared with the counterparty's keeper.
pub type SharedHistory = Rc<RefCell<History>>;

/// Store snapshots indexed by height.
#[derive(Debug, Default)]
pub struct History {
    snapshots: BTreeMap<Height, MemoryStore>,
}

impl History {
    /// Create a shared, empty history.
    pub fn shared() -> SharedHistory {
        Rc::new(RefCell::new(Self::default()))
    }

    /// Record the state at `height`, replacing an earlier record at the same
    /// height.
    pub fn record(&mut self, height: Height, store: MemoryStore) {
        self.snapshots.insert(height, store);
    }

    /// State committed at exactly `height`.
    pub fn at(&self, height: Height) -> Option<&MemoryStore> {
        self.snapshots.get(&height)
    }

    /// Highest committed height.
    pub fn latest_height(&self) -> Option<Height> {
        self.snapshots.keys().next_back().copied()
    }
}

/// Membership proof over `(path, value)`.
///
/// Stands in for a Merkle proof: it binds the key and the value together so
/// that a proof built for one claim never opens another.
pub fn prove(path: &str, value: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hasher.update([0u8]);
    hasher.update(value);
    hasher.finalize().to_vec()
}

/// Port used by both simulated ledgers.
pub const TRANSFER_PORT: &str = "transfer";
/// Connection both ledgers route their channel over.
pub const CONNECTION: &str = "connection-0";
/// Light client each ledger keeps of the other.
pub const CLIENT: &str = "07-tendermint-0";
/// Negotiated channel version.
pub const VERSION: &str = "ics20-1";

/// One simulated ledger.
#[derive(Debug)]
pub struct SimChain {
    name: String,
    height: Height,
    port_id: PortId,
    channel_id: ChannelId,
    handler: SimHandler,
    history: SharedHistory,
}

impl SimChain {
    /// Create a ledger at height 1 with nothing committed.
    pub fn new(
        name: impl Into<String>,
        port_id: PortId,
        channel_id: ChannelId,
        keeper: SimKeeper,
        history: SharedHistory,
    ) -> Self {
        Self {
            name: name.into(),
            height: Height::new(1),
            port_id,
            channel_id,
            handler: PacketHandler::new(MemoryStore::new(), keeper, Vec::new()),
            history,
        }
    }

    /// Two ledgers joined by an open channel of the given ordering.
    ///
    /// The source end is `transfer/channel-0`, the destination end
    /// `transfer/channel-1`. Both ledgers have committed height 1.
    pub fn connected_pair(ordering: Order) -> Result<(Self, Self), String> {
        let port_id = PortId::new(TRANSFER_PORT).map_err(|e| e.to_string())?;
        let source_channel = ChannelId::new("channel-0").map_err(|e| e.to_string())?;
        let destination_channel = ChannelId::new("channel-1").map_err(|e| e.to_string())?;
        let connection = ConnectionId::new(CONNECTION).map_err(|e| e.to_string())?;
        let client_id = ClientId::new(CLIENT).map_err(|e| e.to_string())?;

        let source_history = History::shared();
        let destination_history = History::shared();

        let mut source = Self::new(
            "source",
            port_id.clone(),
            source_channel.clone(),
            SimKeeper::new(connection.clone(), client_id.clone(), Rc::clone(&destination_history)),
            source_history,
        );
        let mut destination = Self::new(
            "destination",
            port_id.clone(),
            destination_channel.clone(),
            SimKeeper::new(connection.clone(), client_id, Rc::clone(&source.history)),
            destination_history,
        );

        let source_end = Channel::new(
            State::Open,
            ordering,
            Counterparty::new(port_id.clone(), destination_channel),
            vec![connection.clone()],
            VERSION,
        );
        let destination_end = Channel::new(
            State::Open,
            ordering,
            Counterparty::new(port_id, source_channel),
            vec![connection],
            VERSION,
        );

        source.open(source_end).map_err(|e| e.to_string())?;
        destination.open(destination_end).map_err(|e| e.to_string())?;

        Ok((source, destination))
    }

    fn open(&mut self, channel: Channel) -> Result<(), PacketError> {
        let (port_id, channel_id) = (self.port_id.clone(), self.channel_id.clone());
        self.handler.open_channel(&port_id, &channel_id, channel)?;
        self.commit();
        Ok(())
    }

    /// Ledger name for logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current height.
    pub fn height(&self) -> Height {
        self.height
    }

    /// Port of this ledger's channel end.
    pub fn port_id(&self) -> &PortId {
        &self.port_id
    }

    /// Identifier of this ledger's channel end.
    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    /// Packet handler.
    pub fn handler(&self) -> &SimHandler {
        &self.handler
    }

    /// Mutable packet handler.
    pub fn handler_mut(&mut self) -> &mut SimHandler {
        &mut self.handler
    }

    /// Stored channel end, if present.
    pub fn channel(&self) -> Option<Channel> {
        self.handler.store().channel(&self.port_id, &self.channel_id)
    }

    /// Publish the current store at the current height.
    pub fn commit(&mut self) {
        trace!(chain = %self.name, height = %self.height, "commit");
        self.history.borrow_mut().record(self.height, self.handler.store().clone());
    }

    /// Produce `blocks` empty blocks and commit at the new height.
    pub fn advance(&mut self, blocks: u64) {
        self.height = Height::new(self.height.value().saturating_add(blocks));
        self.commit();
    }
}
