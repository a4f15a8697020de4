//! Packet and acknowledgement commitments.
//!
//! A commitment is the SHA-256 digest that stands in for a packet (or an
//! acknowledgement) in the store. The counterparty only ever sees a proof
//! over this digest, never the raw data, so it has to be collision
//! resistant and bit-for-bit deterministic.
//!
//! Packet commitments bind the timeout height ahead of the data bytes so a
//! relayer cannot move a packet's timeout without invalidating the proof.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::height::Height;

/// A 32-byte SHA-256 commitment.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment([u8; 32]);

impl Commitment {
    /// Commit to a packet's timeout height and data.
    pub fn packet(timeout_height: Height, data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(timeout_height.to_be_bytes());
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Commit to acknowledgement bytes.
    pub fn acknowledgement(ack: &[u8]) -> Self {
        Self(Sha256::digest(ack).into())
    }

    /// Raw digest bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for Commitment {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", self.to_hex())
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
