use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::TryInto;
use std::fmt::{Display, Formatter};

pub const PUBLIC_KEY_BYTE_COUNT: usize = 32;

/// The verification key of the owner of a transaction output.
/// Only the owner of the matching signing key can spend the output.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct PublicKey([u8; PUBLIC_KEY_BYTE_COUNT]);

impl PublicKey {
    pub const fn new(raw: [u8; PUBLIC_KEY_BYTE_COUNT]) -> Self {
        Self(raw)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_BYTE_COUNT] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, String> {
        let bytes = hex::decode(s).map_err(|e| e.to_string())?;
        let raw: [u8; PUBLIC_KEY_BYTE_COUNT] = bytes
            .try_into()
            .map_err(|_| format!("Invalid public key length in: {}", s))?;
        Ok(Self(raw))
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PublicKey::from_hex(&s).map_err(D::Error::custom)
    }
}
