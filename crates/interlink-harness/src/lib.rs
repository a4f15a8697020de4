//! Deterministic simulation harness for Interlink packet lifecycle testing.
//!
//! Two simulated ledgers, each running an unmodified
//! [`interlink_core::PacketHandler`], joined by a relayer that carries
//! packets and acknowledgements between them. Proof verification is real in
//! the sense that matters: a claim only verifies if the counterparty
//! committed that exact value at the proof height.
//!
//! # Components
//!
//! - [`sim_chain`]: Simulated ledger with per-height store snapshots
//! - [`sim_keeper`]: Connection keeper verifying against snapshots
//! - [`relayer`]: Event-driven relayer
//! - [`app`]: Token transfer application on the receiving ledger
//! - [`scenario`]: Declarative scenarios with mandatory oracles
//! - [`model`]: Reference model for model-based testing

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod model;
pub mod relayer;
pub mod scenario;
pub mod sim_chain;
pub mod sim_keeper;

pub use model::{ModelWorld, ObservableState, Operation, OperationError, OperationResult};
pub use relayer::{RelayError, Relayer};
pub use sim_chain::{SimChain, SimHandler};
pub use sim_keeper::SimKeeper;
