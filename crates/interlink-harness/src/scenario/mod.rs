//! Scenario-based testing framework.
//!
//! Scenarios describe a run declaratively: the channel ordering, the packets
//! to send, how many blocks pass before relaying, and in which order the
//! relayer delivers. Every scenario must end with an oracle that checks the
//! final [`World`]; a scenario without one cannot be run.
//!
//! ```text
//! Scenario::new("name")
//!     .ordering(Order::Ordered)
//!     .packets(3)
//!     .oracle(oracle::no_packets_in_flight())
//!     .run()
//! ```

mod builder;
pub mod oracle;
mod world;

pub use builder::{Delivery, RunnableScenario, Scenario};
pub use world::{Step, StepKind, World};

/// Final-state check run after a scenario completes.
pub type OracleFn = Box<dyn Fn(&World) -> Result<(), String>>;
