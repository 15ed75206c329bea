//! # BitDeque: bit-addressable ring buffer
//!
//! `BitDeque` is the storage primitive underneath the tape: the entropy buffer a
//! tape refills 64 bits at a time, and the flip overlay the shrinker perturbs,
//! are both `BitDeque`s.
//!
//! ## Layout
//!
//! Bits live in a `Vec<u64>` used circularly. `start` and `end` are bit offsets
//! into that ring, and the logical length is `(end - start) mod capacity`. One
//! bit of capacity is always kept free so that `start == end` means empty.
//!
//! ## Costs
//! - `push_back` / `pop_front`: O(1) amortized
//! - `pop_bits(n)`: O(n), n <= 64
//! - `get` / `set`: O(1)
//! - growth: capacity doubles and the live range is relinearized to offset 0
//!
//! Equality, hashing, display and serialization only look at the logical bit
//! sequence, never at the ring offsets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

const WORD_BITS: usize = 64;
const INITIAL_WORDS: usize = 4;

/// Order in which the bits of a packed integer are appended or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BitOrder {
    /// Most significant bit first.
    #[default]
    MsbFirst,
    /// Least significant bit first.
    LsbFirst,
}

/// Growable FIFO of bits with random indexed access.
#[derive(Serialize, Deserialize)]
#[serde(into = "PackedBits", try_from = "PackedBits")]
pub struct BitDeque {
    words: Vec<u64>,
    start: usize,
    end: usize,
}

impl BitDeque {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty deque able to hold at least `bits` bits without growing.
    pub fn with_capacity(bits: usize) -> Self {
        BitDeque {
            words: vec![0; Self::words_for(bits)],
            start: 0,
            end: 0,
        }
    }

    /// Unpack `bit_count` bits stored MSB-first within each byte.
    ///
    /// Returns `None` when `bytes` holds fewer than `bit_count` bits. Padding
    /// bits beyond `bit_count` are ignored.
    pub fn from_packed_bytes(bytes: &[u8], bit_count: usize) -> Option<Self> {
        if bytes.len().saturating_mul(8) < bit_count {
            return None;
        }
        let mut deque = Self::with_capacity(bit_count);
        for i in 0..bit_count {
            let byte = bytes[i / 8];
            deque.push_back(byte & (0x80 >> (i % 8)) != 0);
        }
        Some(deque)
    }

    /// Pack the logical bits into bytes, MSB-first; the last byte is zero padded.
    pub fn to_packed_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; (self.len() + 7) / 8];
        for (i, bit) in self.iter().enumerate() {
            if bit {
                out[i / 8] |= 0x80 >> (i % 8);
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        if self.end >= self.start {
            self.end - self.start
        } else {
            self.capacity_bits() - (self.start - self.end)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn clear(&mut self) {
        self.start = 0;
        self.end = 0;
    }

    /// Bit at logical `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<bool> {
        if index < self.len() {
            Some(self.raw(self.physical(index)))
        } else {
            None
        }
    }

    /// Overwrite the bit at logical `index`.
    ///
    /// # Panics
    /// If `index >= len()`.
    pub fn set(&mut self, index: usize, value: bool) {
        let len = self.len();
        assert!(index < len, "index {} out of bounds for BitDeque of length {}", index, len);
        let at = self.physical(index);
        self.set_raw(at, value);
    }

    /// Set the bit at `index`, first extending with `false` bits if the deque is
    /// shorter than `index`.
    ///
    /// This lets an overlay bit be materialized at a distant offset without
    /// pre-sizing the overlay.
    pub fn fill_and_set(&mut self, index: usize, value: bool) {
        let len = self.len();
        if index < len {
            self.set(index, value);
            return;
        }
        self.reserve(index + 1 - len);
        for _ in len..index {
            self.push_back(false);
        }
        self.push_back(value);
    }

    pub fn push_back(&mut self, bit: bool) {
        self.reserve(1);
        let at = self.end;
        self.set_raw(at, bit);
        self.end = (self.end + 1) % self.capacity_bits();
    }

    /// Append the 8 bits of `byte` in the given order.
    pub fn push_byte(&mut self, byte: u8, order: BitOrder) {
        self.push_word(u64::from(byte), 8, order);
    }

    /// Append the 64 bits of `word` in the given order.
    pub fn push_u64(&mut self, word: u64, order: BitOrder) {
        self.push_word(word, 64, order);
    }

    fn push_word(&mut self, word: u64, width: u32, order: BitOrder) {
        self.reserve(width as usize);
        for i in 0..width {
            let shift = match order {
                BitOrder::MsbFirst => width - 1 - i,
                BitOrder::LsbFirst => i,
            };
            self.push_back((word >> shift) & 1 == 1);
        }
    }

    pub fn pop_front(&mut self) -> Option<bool> {
        if self.is_empty() {
            return None;
        }
        let bit = self.raw(self.start);
        self.start = (self.start + 1) % self.capacity_bits();
        Some(bit)
    }

    /// Remove the first `n` bits and pack them into an integer.
    ///
    /// Returns `None`, leaving the deque untouched, when fewer than `n` bits are
    /// available.
    ///
    /// # Panics
    /// If `n > 64`.
    pub fn pop_bits(&mut self, n: u32, order: BitOrder) -> Option<u64> {
        assert!(n <= 64, "pop_bits: n must be within [0, 64], got {}", n);
        if self.len() < n as usize {
            return None;
        }
        let mut value = 0u64;
        for i in 0..n {
            let bit = u64::from(self.pop_front()?);
            match order {
                BitOrder::MsbFirst => value = (value << 1) | bit,
                BitOrder::LsbFirst => value |= bit << i,
            }
        }
        Some(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len()).map(move |i| self.raw(self.physical(i)))
    }

    fn capacity_bits(&self) -> usize {
        self.words.len() * WORD_BITS
    }

    fn physical(&self, index: usize) -> usize {
        (self.start + index) % self.capacity_bits()
    }

    fn raw(&self, at: usize) -> bool {
        self.words[at / WORD_BITS] & (1u64 << (at % WORD_BITS)) != 0
    }

    fn set_raw(&mut self, at: usize, value: bool) {
        let mask = 1u64 << (at % WORD_BITS);
        let word = &mut self.words[at / WORD_BITS];
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    /// Smallest power-of-two word count (at least `INITIAL_WORDS`) that holds
    /// `bits` bits with one bit to spare.
    fn words_for(bits: usize) -> usize {
        let mut words = INITIAL_WORDS;
        while bits >= words * WORD_BITS {
            words *= 2;
        }
        words
    }

    /// Make room for `additional` more bits, doubling and relinearizing if needed.
    fn reserve(&mut self, additional: usize) {
        let len = self.len();
        if len + additional < self.capacity_bits() {
            return;
        }
        let mut words = self.words.len();
        while len + additional >= words * WORD_BITS {
            words *= 2;
        }
        let mut grown = BitDeque {
            words: vec![0; words],
            start: 0,
            end: len,
        };
        for (i, bit) in self.iter().enumerate() {
            grown.set_raw(i, bit);
        }
        *self = grown;
    }
}

impl Default for BitDeque {
    fn default() -> Self {
        BitDeque::new()
    }
}

/// Deep copy, relinearized to start at offset 0.
impl Clone for BitDeque {
    fn clone(&self) -> Self {
        let len = self.len();
        let mut copy = BitDeque::with_capacity(len);
        for (i, bit) in self.iter().enumerate() {
            copy.set_raw(i, bit);
        }
        copy.end = len;
        copy
    }
}

impl PartialEq for BitDeque {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for BitDeque {}

impl Hash for BitDeque {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for bit in self.iter() {
            bit.hash(state);
        }
    }
}

impl fmt::Display for BitDeque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.iter() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for BitDeque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitDeque(\"{}\")", self)
    }
}

impl FromIterator<bool> for BitDeque {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut deque = BitDeque::new();
        deque.extend(iter);
        deque
    }
}

impl Extend<bool> for BitDeque {
    fn extend<I: IntoIterator<Item = bool>>(&mut self, iter: I) {
        for bit in iter {
            self.push_back(bit);
        }
    }
}

/// Serialized form: the bit count followed by the bits packed MSB-first,
/// independent of the ring offsets.
#[derive(Serialize, Deserialize)]
struct PackedBits {
    bit_count: u32,
    bits: Vec<u8>,
}

impl From<BitDeque> for PackedBits {
    fn from(deque: BitDeque) -> Self {
        let bit_count = u32::try_from(deque.len()).unwrap_or_else(|_| {
            panic!("BitDeque of {} bits is too long to serialize", deque.len())
        });
        PackedBits {
            bit_count,
            bits: deque.to_packed_bytes(),
        }
    }
}

impl TryFrom<PackedBits> for BitDeque {
    type Error = String;

    fn try_from(packed: PackedBits) -> Result<Self, Self::Error> {
        BitDeque::from_packed_bytes(&packed.bits, packed.bit_count as usize).ok_or_else(|| {
            format!(
                "{} packed bytes cannot hold {} bits",
                packed.bits.len(),
                packed.bit_count
            )
        })
    }
}
