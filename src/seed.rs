//! # TapeSeed: externally reproducible tape identity
//!
//! A `TapeSeed` is the pair (64-bit entropy seed, flip overlay) that fully
//! determines every bit a [`Tape`](crate::tape::Tape) hands out. Persisting it
//! is enough to replay a generated value exactly, in another process.
//!
//! ## Binary layout
//!
//! ```text
//! [8 bytes seed, big-endian][4 bytes bit count, big-endian][ceil(bits / 8) bytes, MSB-first]
//! ```
//!
//! The text form is that blob in Base58.

use crate::bits::BitDeque;

use byteorder::{BigEndian, ByteOrder};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const HEADER_LEN: usize = 12;

/// Errors from decoding a serialized `TapeSeed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TapeSeedError {
    #[error("invalid Base58 text: {0}")]
    Base58(String),

    #[error("tape seed needs at least 12 bytes, got {0}")]
    TooShort(usize),

    #[error("tape seed declares {bit_count} flip bits but only carries {available} bytes")]
    Truncated { bit_count: u32, available: usize },
}

/// Entropy seed plus the flip overlay XORed over the entropy stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TapeSeed {
    seed: u64,
    flips: BitDeque,
}

impl TapeSeed {
    pub fn new(seed: u64, flips: BitDeque) -> Self {
        TapeSeed { seed, flips }
    }

    /// A seed with an empty overlay: the raw entropy stream, unperturbed.
    pub fn from_seed(seed: u64) -> Self {
        TapeSeed::new(seed, BitDeque::new())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn flips(&self) -> &BitDeque {
        &self.flips
    }

    pub fn into_parts(self) -> (u64, BitDeque) {
        (self.seed, self.flips)
    }

    /// Encode into the fixed binary layout.
    ///
    /// # Panics
    /// If the overlay holds more than `u32::MAX` bits.
    pub fn to_bytes(&self) -> Vec<u8> {
        let bit_count = u32::try_from(self.flips.len()).unwrap_or_else(|_| {
            panic!("overlay of {} bits does not fit the tape seed layout", self.flips.len())
        });
        let packed = self.flips.to_packed_bytes();

        let mut out = vec![0u8; HEADER_LEN + packed.len()];
        BigEndian::write_u64(&mut out[0..8], self.seed);
        BigEndian::write_u32(&mut out[8..HEADER_LEN], bit_count);
        out[HEADER_LEN..].copy_from_slice(&packed);
        out
    }

    /// Decode the fixed binary layout. Trailing bytes past the packed overlay
    /// are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TapeSeedError> {
        if bytes.len() < HEADER_LEN {
            return Err(TapeSeedError::TooShort(bytes.len()));
        }
        let seed = BigEndian::read_u64(&bytes[0..8]);
        let bit_count = BigEndian::read_u32(&bytes[8..HEADER_LEN]);
        let body = &bytes[HEADER_LEN..];

        let flips = BitDeque::from_packed_bytes(body, bit_count as usize).ok_or(
            TapeSeedError::Truncated {
                bit_count,
                available: body.len(),
            },
        )?;
        Ok(TapeSeed { seed, flips })
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.to_bytes()).into_string()
    }

    pub fn from_base58(encoded: &str) -> Result<Self, TapeSeedError> {
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| TapeSeedError::Base58(e.to_string()))?;
        TapeSeed::from_bytes(&bytes)
    }
}

impl fmt::Display for TapeSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl FromStr for TapeSeed {
    type Err = TapeSeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TapeSeed::from_base58(s)
    }
}

impl Serialize for TapeSeed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for TapeSeed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        TapeSeed::from_base58(&text).map_err(de::Error::custom)
    }
}
