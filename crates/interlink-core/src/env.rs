//! Environment abstraction.
//!
//! The lifecycle engine never reads a clock. The only ambient input it needs
//! is the host ledger's current block height, used for the receive-side
//! timeout check, and the host supplies it through [`Environment`].

use interlink_proto::Height;

/// Host context supplied to operations that depend on the current height.
pub trait Environment {
    /// Height of the block currently being executed.
    fn block_height(&self) -> Height;
}

/// A bare height is a fixed environment.
impl Environment for Height {
    fn block_height(&self) -> Height {
        *self
    }
}
