use std::fmt;
use std::str::FromStr;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use sha3::Keccak256;

type Blake2b256 = Blake2b<U32>;

/// Errors that can occur when parsing a Waves address string.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is not valid base58")]
    InvalidBase58,
    #[error("address must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("unsupported address version {0}")]
    InvalidVersion(u8),
    #[error("address checksum mismatch")]
    InvalidChecksum,
}

/// Number of raw bytes contained in an address.
pub const ADDRESS_BYTES: usize = 26;
/// Version byte of a public-key derived address.
pub const ADDRESS_VERSION: u8 = 1;

const HASH_LENGTH: usize = 20;
const CHECKSUM_LENGTH: usize = 4;
const BODY_LENGTH: usize = ADDRESS_BYTES - CHECKSUM_LENGTH;

/// `keccak256(blake2b256(data))`, the hash used for address derivation.
pub fn secure_hash(data: &[u8]) -> [u8; 32] {
    let inner = Blake2b256::digest(data);
    let outer = Keccak256::digest(inner);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&outer);
    hash
}

/// Account address: `[version, chain_id, pubkey hash (20), checksum (4)]`.
///
/// Serialised as its base58 text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; ADDRESS_BYTES]);

impl Address {
    /// Derive the address of an account public key on the given chain.
    pub fn from_public_key(chain_id: u8, public_key: &[u8; 32]) -> Self {
        let hash = secure_hash(public_key);
        let mut bytes = [0u8; ADDRESS_BYTES];
        bytes[0] = ADDRESS_VERSION;
        bytes[1] = chain_id;
        bytes[2..BODY_LENGTH].copy_from_slice(&hash[..HASH_LENGTH]);
        let checksum = secure_hash(&bytes[..BODY_LENGTH]);
        bytes[BODY_LENGTH..].copy_from_slice(&checksum[..CHECKSUM_LENGTH]);
        Address(bytes)
    }

    /// Validate raw address bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let raw: [u8; ADDRESS_BYTES] =
            bytes
                .try_into()
                .map_err(|_| AddressError::InvalidLength {
                    expected: ADDRESS_BYTES,
                    actual: bytes.len(),
                })?;

        if raw[0] != ADDRESS_VERSION {
            return Err(AddressError::InvalidVersion(raw[0]));
        }

        let checksum = secure_hash(&raw[..BODY_LENGTH]);
        if raw[BODY_LENGTH..] != checksum[..CHECKSUM_LENGTH] {
            return Err(AddressError::InvalidChecksum);
        }

        Ok(Address(raw))
    }

    pub fn chain_id(&self) -> u8 {
        self.0[1]
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = bs58::decode(s.trim())
            .into_vec()
            .map_err(|_| AddressError::InvalidBase58)?;
        Address::from_bytes(&decoded)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_address_parses_back() {
        let address = Address::from_public_key(b'W', &[7u8; 32]);
        let text = address.to_string();

        let parsed: Address = text.parse().expect("address should parse");
        assert_eq!(parsed, address);
        assert_eq!(parsed.chain_id(), b'W');
    }

    #[test]
    fn corrupted_checksum_rejected() {
        let address = Address::from_public_key(b'W', &[1u8; 32]);
        let mut bytes = *address.as_bytes();
        bytes[ADDRESS_BYTES - 1] ^= 0xFF;

        let err = Address::from_bytes(&bytes).unwrap_err();
        assert_eq!(err, AddressError::InvalidChecksum);
    }

    #[test]
    fn wrong_length_and_version_rejected() {
        let err = Address::from_bytes(&[1u8; 10]).unwrap_err();
        assert!(matches!(err, AddressError::InvalidLength { actual: 10, .. }));

        let address = Address::from_public_key(b'T', &[2u8; 32]);
        let mut bytes = *address.as_bytes();
        bytes[0] = 2;
        assert_eq!(
            Address::from_bytes(&bytes).unwrap_err(),
            AddressError::InvalidVersion(2)
        );
    }

    #[test]
    fn invalid_base58_rejected() {
        let err = "0OIl".parse::<Address>().unwrap_err();
        assert_eq!(err, AddressError::InvalidBase58);
    }

    #[test]
    fn serde_uses_text_form() {
        let address = Address::from_public_key(b'W', &[9u8; 32]);
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{address}\""));

        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }
}
