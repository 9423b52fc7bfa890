use crate::PublicKey;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};

/// Opaque signature bytes attached to a transaction input.
/// The bytes are interpreted only by a `SignatureVerifier`.
#[derive(Debug, Clone, Default, Hash, Eq, PartialEq)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn empty() -> Self {
        Self(vec![])
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map(Signature).map_err(D::Error::custom)
    }
}

/// Checks that `signature` was produced over `message` by the owner of `key`.
/// Implementations must be deterministic and side-effect free.
pub trait SignatureVerifier {
    fn verify(&self, message: &[u8], signature: &Signature, key: &PublicKey) -> bool;
}

/// Ed25519 signatures. Keys or signatures that cannot be decoded never verify.
#[derive(Debug, Default, Copy, Clone)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, message: &[u8], signature: &Signature, key: &PublicKey) -> bool {
        let verifying_key = match VerifyingKey::from_bytes(key.as_bytes()) {
            Ok(key) => key,
            Err(_) => return false,
        };
        match ed25519_dalek::Signature::from_slice(signature.as_slice()) {
            Ok(signature) => verifying_key.verify(message, &signature).is_ok(),
            Err(_) => false,
        }
    }
}

/// An Ed25519 signing key derived deterministically from a 32-byte seed.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::new(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature::new(self.signing_key.sign(message).to_bytes().to_vec())
    }
}
