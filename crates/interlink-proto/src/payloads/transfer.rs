//! Fungible token transfer payload.
//!
//! The payload describes tokens moving from `sender` on the source ledger to
//! `receiver` on the destination ledger. Balance effects (escrow, mint, burn)
//! belong to the transfer application and are not modelled here.
//!
//! # Denomination prefixes
//!
//! Tokens that leave their origin ledger are tracked with a `{port}/{channel}/`
//! prefix naming the channel end they arrived on. `source` tells the receiver
//! which side of the channel originally minted the tokens.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{Result, ValidationError},
    height::Height,
    identifier::{ChannelId, PortId},
    packet::PacketData,
};

/// Maximum denomination length
pub const MAX_DENOM_LEN: usize = 128;

/// Minimum denomination length
pub const MIN_DENOM_LEN: usize = 2;

/// A token amount in one denomination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    /// Denomination, possibly channel-prefixed
    pub denom: String,
    /// Amount in base units
    pub amount: u64,
}

impl Coin {
    /// Create a coin.
    pub fn new(denom: impl Into<String>, amount: u64) -> Self {
        Self { denom: denom.into(), amount }
    }

    /// True if the denomination carries the prefix of `(port, channel)`.
    pub fn has_prefix(&self, port_id: &PortId, channel_id: &ChannelId) -> bool {
        self.denom.starts_with(&denom_prefix(port_id, channel_id))
    }

    fn validate(&self) -> Result<()> {
        let len = self.denom.len();
        if !(MIN_DENOM_LEN..=MAX_DENOM_LEN).contains(&len) {
            return Err(ValidationError::InvalidPacketData(format!(
                "denomination {:?} has length {len}, must be between {MIN_DENOM_LEN} and {MAX_DENOM_LEN}",
                self.denom
            )));
        }
        if !self.denom.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidPacketData(format!(
                "denomination {:?} must start with a letter",
                self.denom
            )));
        }
        if let Some(ch) = self
            .denom
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-')))
        {
            return Err(ValidationError::InvalidPacketData(format!(
                "denomination {:?} contains invalid character {ch:?}",
                self.denom
            )));
        }
        if self.amount == 0 {
            return Err(ValidationError::InvalidPacketData(format!(
                "amount of {} must be positive",
                self.denom
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Prefix applied to denominations received over `(port, channel)`.
pub fn denom_prefix(port_id: &PortId, channel_id: &ChannelId) -> String {
    format!("{port_id}/{channel_id}/")
}

/// Fungible token transfer packet payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FungibleTokenPacketData {
    /// Tokens transferred, sorted by denomination without duplicates
    pub amount: Vec<Coin>,
    /// Sender address on the source ledger
    pub sender: String,
    /// Receiver address on the destination ledger
    pub receiver: String,
    /// True if the sending ledger is the tokens' origin
    pub source: bool,
    /// Timeout height on the destination ledger
    pub timeout: Height,
}

impl FungibleTokenPacketData {
    /// Create a transfer payload.
    pub fn new(
        amount: Vec<Coin>,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        source: bool,
        timeout: Height,
    ) -> Self {
        Self { amount, sender: sender.into(), receiver: receiver.into(), source, timeout }
    }

    /// Canonical CBOR encoding.
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| ValidationError::Cbor(e.to_string()))?;
        Ok(Bytes::from(buf))
    }

    /// Decode from CBOR bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        ciborium::de::from_reader(bytes).map_err(|e| ValidationError::Cbor(e.to_string()))
    }
}

impl PacketData for FungibleTokenPacketData {
    fn to_bytes(&self) -> Bytes {
        // Writing plain structs into a Vec cannot fail
        self.encode().unwrap_or_default()
    }

    fn timeout_height(&self) -> Height {
        self.timeout
    }

    fn validate_basic(&self) -> Result<()> {
        if self.amount.is_empty() {
            return Err(ValidationError::InvalidPacketData("amount is empty".to_string()));
        }
        for coin in &self.amount {
            coin.validate()?;
        }
        if self.amount.windows(2).any(|pair| pair[0].denom >= pair[1].denom) {
            return Err(ValidationError::InvalidPacketData(
                "amount must be sorted by denomination without duplicates".to_string(),
            ));
        }
        if self.sender.trim().is_empty() {
            return Err(ValidationError::InvalidPacketData("missing sender address".to_string()));
        }
        if self.receiver.trim().is_empty() {
            return Err(ValidationError::InvalidPacketData(
                "missing receiver address".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ValidationError::InvalidPacketData("timeout cannot be 0".to_string()));
        }
        Ok(())
    }
}
