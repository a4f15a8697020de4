//! Host identifiers for ports, channels, connections and clients.
//!
//! Identifiers are caller-assigned strings. They are opaque to the lifecycle
//! engine, but every identifier that enters the system has been checked
//! against the host grammar: no blanks, no path separators, a restricted
//! character set and per-kind length bounds.
//!
//! The `/` exclusion matters because identifiers are spliced into store key
//! paths (see [`crate::path`]); a separator inside an identifier would let two
//! distinct keys collide.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, ValidationError};

/// Returns true if `ch` belongs to the identifier alphabet.
fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '+' | '-' | '#' | '[' | ']' | '<' | '>')
}

/// Validate `id` against the identifier grammar with the given bounds.
pub fn validate_identifier(kind: &'static str, id: &str, min: usize, max: usize) -> Result<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::BlankIdentifier { kind });
    }

    let len = id.len();
    if len < min || len > max {
        return Err(ValidationError::IdentifierLength { kind, id: id.to_string(), len, min, max });
    }

    if let Some(ch) = id.chars().find(|c| !is_identifier_char(*c)) {
        return Err(ValidationError::IdentifierCharacter { kind, id: id.to_string(), ch });
    }

    Ok(())
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal, $min:expr, $max:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Minimum identifier length
            pub const MIN_LEN: usize = $min;
            /// Maximum identifier length
            pub const MAX_LEN: usize = $max;

            /// Parse and validate an identifier.
            pub fn new(id: impl Into<String>) -> Result<Self> {
                let id = id.into();
                validate_identifier($kind, &id, Self::MIN_LEN, Self::MAX_LEN)?;
                Ok(Self(id))
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(s: String) -> Result<Self> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

identifier!(
    /// Port identifier, naming the application module bound to a channel end.
    PortId,
    "port",
    2,
    64
);

identifier!(
    /// Channel identifier, unique per port.
    ChannelId,
    "channel",
    8,
    64
);

identifier!(
    /// Connection identifier referenced by a channel's single hop.
    ConnectionId,
    "connection",
    10,
    64
);

identifier!(
    /// Light client identifier backing a connection.
    ClientId,
    "client",
    9,
    64
);
