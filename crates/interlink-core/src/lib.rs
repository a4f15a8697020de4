//! Interlink packet lifecycle core logic
//!
//! Pure state machine for moving packets between two ledgers over a channel,
//! completely decoupled from storage backends, proof formats and I/O.
//!
//! # Architecture
//!
//! The [`handler::PacketHandler`] owns three injected collaborators:
//!
//! - a [`store::Store`] holding channel records, sequence counters and
//!   commitments
//! - a [`keeper::ConnectionKeeper`] that resolves connections and light
//!   clients and verifies counterparty proofs
//! - an [`event::EventSink`] that receives the events relayers watch
//!
//! Every operation is validate-then-apply: all checks run against the stores
//! before the first write, so a rejected operation is a no-op. The host
//! ledger supplies its current height explicitly through [`mod@env`].
//!
//! The same handler runs unchanged in production hosts, unit tests against
//! [`store::MemoryStore`], and the two-ledger simulation in
//! `interlink-harness`.
//!
//! # Components
//!
//! - [`handler`]: Packet lifecycle (send, receive, executed, acknowledge,
//!   cleanup)
//! - [`store`]: Channel, sequence and commitment stores
//! - [`keeper`]: Connection, client and proof verification collaborator
//! - [`event`]: Packet events for relayers
//! - [`mod@env`]: Environment abstraction (block height)
//! - [`config`]: Handler limits
//! - [`error`]: Packet errors and invariant violations

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod env;
pub mod error;
pub mod event;
pub mod handler;
pub mod keeper;
pub mod store;

pub use config::HandlerConfig;
pub use env::Environment;
pub use error::{Error, InvariantViolation, PacketError};
pub use event::{EventKind, EventSink, PacketEvent};
pub use handler::PacketHandler;
pub use keeper::{ConnectionKeeper, VerificationError};
pub use store::{ChannelStore, CommitmentStore, MemoryStore, SequenceStore, Store};
