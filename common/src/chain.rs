// Settlement-chain primitives.
// The ledger never talks to the chain directly, but withdrawal destinations
// and settlement receipts are chain-native values and must survive
// serialization without ambiguity. Addresses and hashes are fixed-size byte
// arrays rendered as 0x-prefixed hex in every JSON surface.

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use serde::{de::Error as SerdeError, Deserialize, Deserializer, Serialize, Serializer as SerdeSerializer};
use thiserror::Error;

use crate::serializer::{Reader, ReaderError, Serializer, Writer};

pub const WALLET_ADDRESS_SIZE: usize = 20;
pub const TX_HASH_SIZE: usize = 32;

/// Numeric chain identifier of the settlement chain.
pub type ChainId = u64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid hex encoding")]
    InvalidHex,
    #[error("Invalid length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

fn decode_prefixed_hex(value: &str, expected: usize) -> Result<Vec<u8>, AddressError> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(stripped).map_err(|_| AddressError::InvalidHex)?;
    if bytes.len() != expected {
        return Err(AddressError::InvalidLength {
            expected,
            got: bytes.len(),
        });
    }
    Ok(bytes)
}

/// A settlement-chain wallet address (20 bytes, hex encoded).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalletAddress([u8; WALLET_ADDRESS_SIZE]);

impl WalletAddress {
    pub const fn new(bytes: [u8; WALLET_ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; WALLET_ADDRESS_SIZE] {
        &self.0
    }

    pub const fn zero() -> Self {
        Self([0u8; WALLET_ADDRESS_SIZE])
    }
}

impl Display for WalletAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for WalletAddress {
    type Err = AddressError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let bytes = decode_prefixed_hex(value, WALLET_ADDRESS_SIZE)?;
        let mut array = [0u8; WALLET_ADDRESS_SIZE];
        array.copy_from_slice(&bytes);
        Ok(Self(array))
    }
}

impl Serialize for WalletAddress {
    fn serialize<S: SerdeSerializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::from_str(&value).map_err(SerdeError::custom)
    }
}

impl Serializer for WalletAddress {
    fn write(&self, writer: &mut Writer) {
        writer.write_bytes(&self.0);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let bytes = reader.read_bytes(WALLET_ADDRESS_SIZE)?;
        let mut array = [0u8; WALLET_ADDRESS_SIZE];
        array.copy_from_slice(bytes);
        Ok(Self(array))
    }

    fn size(&self) -> usize {
        WALLET_ADDRESS_SIZE
    }
}

/// An on-chain transaction hash (32 bytes, hex encoded).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxHash([u8; TX_HASH_SIZE]);

impl TxHash {
    pub const fn new(bytes: [u8; TX_HASH_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; TX_HASH_SIZE] {
        &self.0
    }
}

impl Display for TxHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for TxHash {
    type Err = AddressError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let bytes = decode_prefixed_hex(value, TX_HASH_SIZE)?;
        let mut array = [0u8; TX_HASH_SIZE];
        array.copy_from_slice(&bytes);
        Ok(Self(array))
    }
}

impl Serialize for TxHash {
    fn serialize<S: SerdeSerializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::from_str(&value).map_err(SerdeError::custom)
    }
}

impl Serializer for TxHash {
    fn write(&self, writer: &mut Writer) {
        writer.write_bytes(&self.0);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let bytes = reader.read_bytes(TX_HASH_SIZE)?;
        let mut array = [0u8; TX_HASH_SIZE];
        array.copy_from_slice(bytes);
        Ok(Self(array))
    }

    fn size(&self) -> usize {
        TX_HASH_SIZE
    }
}
