//! Read models for connections and light clients.
//!
//! Connections and clients are owned by the host. The lifecycle engine only
//! reads the fields below.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::{height::Height, identifier::ClientId};

/// Connection handshake state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum ConnectionState {
    /// No connection, treated as closed
    #[default]
    Uninitialized = 0,
    /// Handshake started locally
    Init = 1,
    /// Handshake acknowledged by the counterparty
    TryOpen = 2,
    /// Handshake complete
    Open = 3,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Init => "INIT",
            Self::TryOpen => "TRYOPEN",
            Self::Open => "OPEN",
        })
    }
}

/// A connection end as seen by the channel layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEnd {
    /// Handshake state
    pub state: ConnectionState,
    /// Light client tracking the counterparty
    pub client_id: ClientId,
}

impl ConnectionEnd {
    /// Create a connection end.
    pub fn new(state: ConnectionState, client_id: ClientId) -> Self {
        Self { state, client_id }
    }
}

/// A light client state as seen by the channel layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientState {
    /// Latest counterparty height the client has verified
    pub latest_height: Height,
}

impl ClientState {
    /// Create a client state.
    pub fn new(latest_height: Height) -> Self {
        Self { latest_height }
    }
}
