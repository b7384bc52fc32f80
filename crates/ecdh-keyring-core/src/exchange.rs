//! Key-exchange contexts and session key derivation.
//!
//! Wraps x25519-dalek, k256 and p256 behind one type so callers never need
//! to know which curve a key was configured with.

use std::borrow::Cow;
use std::fmt;

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::pkcs8::DecodePrivateKey;
use rand::RngCore;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::curve::Curve;
use crate::error::{ExchangeError, Result};

/// Length of a raw private scalar on every supported curve.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Length of the derived initialization vector.
pub const IV_LEN: usize = 16;

const SESSION_KEY_CONTEXT: &str = "ecdh-keyring v1 session key";
const SESSION_IV_CONTEXT: &str = "ecdh-keyring v1 session iv";

#[derive(Clone)]
enum Secret {
    X25519(StaticSecret),
    Secp256k1(k256::SecretKey),
    Secp256r1(p256::SecretKey),
}

/// A private key on a specific curve, ready to agree on session keys with
/// any number of peers.
///
/// Immutable once built. Derivation takes `&self`, so one context can serve
/// concurrent connections.
#[derive(Clone)]
pub struct KeyExchange {
    curve: Curve,
    secret: Secret,
}

impl KeyExchange {
    /// Build a context from a curve name and the private key file content.
    ///
    /// The private key may be 32 raw bytes or 64 hex characters. The secp
    /// curves also accept PEM (SEC1 or PKCS#8).
    pub fn new(curve: &str, private_key: &[u8]) -> Result<Self> {
        let curve = curve.parse::<Curve>()?;
        Self::from_curve(curve, private_key)
    }

    /// Build a context for an already parsed curve.
    pub fn from_curve(curve: Curve, private_key: &[u8]) -> Result<Self> {
        let secret = match curve {
            Curve::X25519 => {
                let mut scalar = decode_scalar(curve, private_key)?;
                Secret::X25519(x25519_secret(&mut scalar))
            }
            Curve::Secp256k1 => Secret::Secp256k1(decode_secp256k1(private_key)?),
            Curve::Secp256r1 => Secret::Secp256r1(decode_secp256r1(private_key)?),
        };
        Ok(Self { curve, secret })
    }

    /// Generate a context with a random private key.
    pub fn generate(curve: Curve) -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let mut bytes = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
            rng.fill_bytes(&mut bytes[..]);
            // Only the secp curves can reject a scalar (zero or >= order).
            if let Ok(exchange) = Self::from_curve(curve, &bytes[..]) {
                return exchange;
            }
        }
    }

    /// The curve this context was built on.
    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// The local public key in raw form: 32 bytes for x25519, 64 bytes
    /// (x || y) for the secp curves.
    pub fn public_key(&self) -> Vec<u8> {
        match &self.secret {
            Secret::X25519(secret) => X25519PublicKey::from(secret).as_bytes().to_vec(),
            Secret::Secp256k1(secret) => {
                secret.public_key().to_encoded_point(false).as_bytes()[1..].to_vec()
            }
            Secret::Secp256r1(secret) => {
                secret.public_key().to_encoded_point(false).as_bytes()[1..].to_vec()
            }
        }
    }

    /// Get the raw private scalar (secret key material).
    pub fn private_key_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_LEN]> {
        let mut out = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
        match &self.secret {
            Secret::X25519(secret) => out.copy_from_slice(secret.as_bytes()),
            Secret::Secp256k1(secret) => out.copy_from_slice(&secret.to_bytes()),
            Secret::Secp256r1(secret) => out.copy_from_slice(&secret.to_bytes()),
        }
        out
    }

    /// Perform the raw Diffie-Hellman agreement with a peer public key.
    ///
    /// For the secp curves the peer key may be 64 raw bytes (x || y), or a
    /// SEC1 point (65 bytes uncompressed, 33 bytes compressed). The result is
    /// the x-coordinate of the shared point.
    pub fn shared_secret(&self, peer_public_key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        match &self.secret {
            Secret::X25519(secret) => {
                let peer: [u8; 32] = peer_public_key.try_into().map_err(|_| {
                    invalid_public_key(
                        self.curve,
                        format!("expected 32 bytes, got {}", peer_public_key.len()),
                    )
                })?;
                let shared = secret.diffie_hellman(&X25519PublicKey::from(peer));
                if !shared.was_contributory() {
                    return Err(ExchangeError::NonContributory(self.curve));
                }
                Ok(Zeroizing::new(shared.as_bytes().to_vec()))
            }
            Secret::Secp256k1(secret) => {
                let peer = k256::PublicKey::from_sec1_bytes(&sec1_point(peer_public_key))
                    .map_err(|e| invalid_public_key(self.curve, e.to_string()))?;
                let shared =
                    k256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
                Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
            }
            Secret::Secp256r1(secret) => {
                let peer = p256::PublicKey::from_sec1_bytes(&sec1_point(peer_public_key))
                    .map_err(|e| invalid_public_key(self.curve, e.to_string()))?;
                let shared =
                    p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
                Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
            }
        }
    }

    /// Derive a session key of `key_len` bytes (16 or 32) and a 16-byte IV
    /// from the agreement with `peer_public_key`.
    pub fn derive_key(&self, peer_public_key: &[u8], key_len: usize) -> Result<DerivedKey> {
        if key_len != 16 && key_len != 32 {
            return Err(ExchangeError::InvalidKeyLength(key_len));
        }
        let secret = self.shared_secret(peer_public_key)?;
        Ok(DerivedKey::from_shared_secret(&secret, key_len))
    }
}

impl fmt::Debug for KeyExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let public = hex::encode(self.public_key());
        write!(f, "KeyExchange({}, {})", self.curve, &public[..16])
    }
}

/// Symmetric key material for one connection.
pub struct DerivedKey {
    key: Zeroizing<Vec<u8>>,
    iv: [u8; IV_LEN],
}

impl DerivedKey {
    fn from_shared_secret(secret: &[u8], key_len: usize) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(SESSION_KEY_CONTEXT);
        hasher.update(secret);
        let mut key = Zeroizing::new(vec![0u8; key_len]);
        hasher.finalize_xof().fill(&mut key);

        let iv_block = Zeroizing::new(blake3::derive_key(SESSION_IV_CONTEXT, secret));
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&iv_block[..IV_LEN]);

        Self { key, iv }
    }

    /// The session key.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The initialization vector.
    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DerivedKey(len={})", self.key.len())
    }
}

fn invalid_private_key(curve: Curve, reason: impl Into<String>) -> ExchangeError {
    ExchangeError::InvalidPrivateKey {
        curve,
        reason: reason.into(),
    }
}

fn invalid_public_key(curve: Curve, reason: impl Into<String>) -> ExchangeError {
    ExchangeError::InvalidPublicKey {
        curve,
        reason: reason.into(),
    }
}

/// Decode a 32-byte scalar given either raw or as hex text.
fn decode_scalar(curve: Curve, bytes: &[u8]) -> Result<Zeroizing<[u8; PRIVATE_KEY_LEN]>> {
    let mut out = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
    if bytes.len() == PRIVATE_KEY_LEN {
        out.copy_from_slice(bytes);
        return Ok(out);
    }

    let text = std::str::from_utf8(bytes).map_err(|_| {
        invalid_private_key(
            curve,
            format!("expected {PRIVATE_KEY_LEN} raw bytes or hex text, got {} bytes", bytes.len()),
        )
    })?;
    let decoded = Zeroizing::new(
        hex::decode(text.trim()).map_err(|e| invalid_private_key(curve, e.to_string()))?,
    );
    if decoded.len() != PRIVATE_KEY_LEN {
        return Err(invalid_private_key(
            curve,
            format!("expected {PRIVATE_KEY_LEN} bytes, hex decoded to {}", decoded.len()),
        ));
    }
    out.copy_from_slice(&decoded);
    Ok(out)
}

/// Move the scalar into a `StaticSecret`, leaving zeros behind.
fn x25519_secret(scalar: &mut [u8; PRIVATE_KEY_LEN]) -> StaticSecret {
    StaticSecret::from(std::mem::take(scalar))
}

fn pem_text(bytes: &[u8]) -> Option<&str> {
    std::str::from_utf8(bytes)
        .ok()
        .map(str::trim)
        .filter(|text| text.starts_with("-----BEGIN"))
}

fn decode_secp256k1(private_key: &[u8]) -> Result<k256::SecretKey> {
    let curve = Curve::Secp256k1;
    if let Some(pem) = pem_text(private_key) {
        return k256::SecretKey::from_sec1_pem(pem)
            .or_else(|_| k256::SecretKey::from_pkcs8_pem(pem))
            .map_err(|e| invalid_private_key(curve, e.to_string()));
    }
    let scalar = decode_scalar(curve, private_key)?;
    k256::SecretKey::from_slice(&scalar[..]).map_err(|e| invalid_private_key(curve, e.to_string()))
}

fn decode_secp256r1(private_key: &[u8]) -> Result<p256::SecretKey> {
    let curve = Curve::Secp256r1;
    if let Some(pem) = pem_text(private_key) {
        return p256::SecretKey::from_sec1_pem(pem)
            .or_else(|_| p256::SecretKey::from_pkcs8_pem(pem))
            .map_err(|e| invalid_private_key(curve, e.to_string()));
    }
    let scalar = decode_scalar(curve, private_key)?;
    p256::SecretKey::from_slice(&scalar[..]).map_err(|e| invalid_private_key(curve, e.to_string()))
}

/// Turn a raw 64-byte (x || y) key into an uncompressed SEC1 point; other
/// lengths are passed through for the SEC1 decoder to judge.
fn sec1_point(peer_public_key: &[u8]) -> Cow<'_, [u8]> {
    if peer_public_key.len() == 64 {
        let mut point = Vec::with_capacity(65);
        point.push(0x04);
        point.extend_from_slice(peer_public_key);
        Cow::Owned(point)
    } else {
        Cow::Borrowed(peer_public_key)
    }
}
