//! The closed set of curves a key-exchange context can be built on.

use std::fmt;
use std::str::FromStr;

use crate::error::ExchangeError;

/// Elliptic curve used for a key exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    /// Curve25519 in Montgomery form.
    X25519,
    /// The Koblitz curve used by Bitcoin.
    Secp256k1,
    /// NIST P-256.
    Secp256r1,
}

impl Curve {
    /// All supported curves.
    pub const ALL: [Curve; 3] = [Curve::X25519, Curve::Secp256k1, Curve::Secp256r1];

    /// Canonical configuration name.
    pub const fn name(&self) -> &'static str {
        match self {
            Curve::X25519 => "x25519",
            Curve::Secp256k1 => "secp256k1",
            Curve::Secp256r1 => "secp256r1",
        }
    }

    /// Length of a raw peer public key accepted by [`crate::KeyExchange::derive_key`]
    /// and produced by [`crate::KeyExchange::public_key`].
    pub const fn public_key_len(&self) -> usize {
        match self {
            Curve::X25519 => 32,
            Curve::Secp256k1 | Curve::Secp256r1 => 64,
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Curve {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x25519" | "curve25519" => Ok(Curve::X25519),
            "secp256k1" => Ok(Curve::Secp256k1),
            "secp256r1" | "prime256v1" | "p256" | "p-256" => Ok(Curve::Secp256r1),
            _ => Err(ExchangeError::UnsupportedCurve(s.to_string())),
        }
    }
}
