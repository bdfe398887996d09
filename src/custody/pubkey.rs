// Plutus — secp256k1 public key handling
//
// Keys arrive as raw SEC1 bytes (33-byte compressed or 65-byte
// uncompressed) and are always stored in compressed form.

use std::fmt;

use secp256k1::PublicKey;
use serde::Serialize;

/// Which party of an escrow a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignerRole {
    Customer,
    Vendor,
    Operator,
}

impl SignerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignerRole::Customer => "customer",
            SignerRole::Vendor => "vendor",
            SignerRole::Operator => "operator",
        }
    }
}

impl fmt::Display for SignerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode SEC1 bytes into a curve point. Rejects anything that is not a
/// valid secp256k1 point.
pub fn decode_public_key(bytes: &[u8]) -> Option<PublicKey> {
    PublicKey::from_slice(bytes).ok()
}

/// The 33-byte compressed encoding of a decoded key.
pub fn compressed(key: &PublicKey) -> Vec<u8> {
    key.serialize().to_vec()
}

/// Decode and re-encode in compressed form.
pub fn normalize(bytes: &[u8]) -> Option<Vec<u8>> {
    decode_public_key(bytes).map(|k| compressed(&k))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
