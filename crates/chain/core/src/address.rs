//! SS58 account addresses.
//!
//! An address is the base58 text form of a 32-byte public key:
//!
//! ```text
//! base58( prefix (1 or 2 bytes) | public key (32 bytes) | checksum (2 bytes) )
//! checksum = blake2b-512("SS58PRE" | prefix | public key)[..2]
//! ```

use std::fmt;

use blake2::{Blake2b512, Digest};
use serde::{Deserialize, Serialize, Serializer};

/// Generic Substrate network prefix.
pub const SUBSTRATE_PREFIX: u16 = 42;

const CHECKSUM_PREAMBLE: &[u8] = b"SS58PRE";
const CHECKSUM_LEN: usize = 2;
const KEY_LEN: usize = 32;

/// Address decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Address is not valid base58: {0}")]
    Base58(String),

    #[error("Unsupported address prefix byte {0:#04x}")]
    InvalidPrefix(u8),

    #[error("Address payload has {0} bytes, expected a 32-byte key")]
    InvalidLength(usize),

    #[error("Address checksum mismatch")]
    ChecksumMismatch,
}

/// Raw 32-byte account public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; KEY_LEN]);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Encode this key as an SS58 address for the given network prefix.
    pub fn to_address(&self, prefix: u16) -> Address {
        let mut data = encode_prefix(prefix);
        data.extend_from_slice(&self.0);
        let checksum = checksum(&data);
        data.extend_from_slice(&checksum[..CHECKSUM_LEN]);
        Address(bs58::encode(data).into_string())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// SS58 address as supplied by the user.
///
/// Construction does not validate; decoding happens when the key is needed,
/// so a malformed address fails at request encoding, before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the public key, verifying prefix, length and checksum.
    pub fn public_key(&self) -> Result<PublicKey, AddressError> {
        self.decode().map(|(_, key)| key)
    }

    /// Network prefix this address was encoded for.
    pub fn prefix(&self) -> Result<u16, AddressError> {
        self.decode().map(|(prefix, _)| prefix)
    }

    fn decode(&self) -> Result<(u16, PublicKey), AddressError> {
        let data = bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| AddressError::Base58(e.to_string()))?;

        let first = *data.first().ok_or(AddressError::InvalidLength(0))?;
        let (prefix_len, prefix) = match first {
            0..=63 => (1, u16::from(first)),
            64..=127 => {
                let second = *data.get(1).ok_or(AddressError::InvalidLength(data.len()))?;
                let lower = (first << 2) | (second >> 6);
                let upper = second & 0b0011_1111;
                (2, u16::from(lower) | (u16::from(upper) << 8))
            }
            other => return Err(AddressError::InvalidPrefix(other)),
        };

        if data.len() != prefix_len + KEY_LEN + CHECKSUM_LEN {
            return Err(AddressError::InvalidLength(data.len()));
        }

        let body_len = prefix_len + KEY_LEN;
        let expected = checksum(&data[..body_len]);
        if data[body_len..] != expected[..CHECKSUM_LEN] {
            return Err(AddressError::ChecksumMismatch);
        }

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&data[prefix_len..body_len]);
        Ok((prefix, PublicKey(key)))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// On the wire an address is its public key.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let key = self.public_key().map_err(serde::ser::Error::custom)?;
        key.serialize(serializer)
    }
}

fn encode_prefix(prefix: u16) -> Vec<u8> {
    match prefix {
        0..=63 => vec![prefix as u8],
        _ => {
            // Two-byte form; only the low 14 bits are representable.
            let first = ((prefix & 0b0000_0000_1111_1100) as u8) >> 2;
            let second = ((prefix >> 8) as u8 & 0b0011_1111) | (((prefix & 0b11) as u8) << 6);
            vec![first | 0b0100_0000, second]
        }
    }
}

fn checksum(body: &[u8]) -> Vec<u8> {
    let mut hasher = Blake2b512::new();
    hasher.update(CHECKSUM_PREAMBLE);
    hasher.update(body);
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development account.
    const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
    const ALICE_KEY: &str = "d43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d";

    #[test]
    fn test_decodes_known_address() {
        let key = Address::new(ALICE).public_key().unwrap();
        assert_eq!(hex::encode(key.0), ALICE_KEY);
        assert_eq!(Address::new(ALICE).prefix().unwrap(), SUBSTRATE_PREFIX);
    }

    #[test]
    fn test_encodes_known_address() {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hex::decode(ALICE_KEY).unwrap());
        assert_eq!(PublicKey(bytes).to_address(SUBSTRATE_PREFIX).as_str(), ALICE);
    }

    #[test]
    fn test_two_byte_prefix_survives_encoding() {
        let key = PublicKey([7u8; 32]);
        let address = key.to_address(1_000);
        assert_eq!(address.prefix().unwrap(), 1_000);
        assert_eq!(address.public_key().unwrap(), key);
    }

    #[test]
    fn test_rejects_corrupted_checksum() {
        let mut text = ALICE.to_string();
        text.pop();
        text.push('Z');
        assert!(matches!(
            Address::new(text).public_key(),
            Err(AddressError::ChecksumMismatch) | Err(AddressError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_rejects_non_base58() {
        assert!(matches!(
            Address::new("not-an-address-0OIl").public_key(),
            Err(AddressError::Base58(_))
        ));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(Address::new("").public_key().is_err());
    }
}
