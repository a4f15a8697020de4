//! Ledger heights.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque, monotonically meaningful ledger height.
///
/// Zero is the "unset" value and is never a valid packet timeout.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Height(u64);

impl Height {
    /// The unset height
    pub const ZERO: Self = Self(0);

    /// Create a height.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw height value.
    pub const fn value(self) -> u64 {
        self.0
    }

    /// True for the unset height.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Big-endian encoding, as bound into packet commitments.
    pub const fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl From<u64> for Height {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
