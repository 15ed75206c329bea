//! # Tape: deterministic, replayable bit source
//!
//! A tape combines a seeded entropy stream with a flip overlay. Every bit it
//! hands out is `entropy[k] XOR overlay[k]`, where `k` is the global read
//! offset. Because the entropy order never changes, flipping overlay bit `k`
//! changes exactly the decision made at offset `k`, however many times the
//! tape is replayed. The shrinker relies on that: it only ever edits overlays.

use crate::bits::{BitDeque, BitOrder};
use crate::seed::TapeSeed;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt;

pub struct Tape {
    seed: TapeSeed,
    read: u64,
    read0: u64,
    read1: u64,
    leftover: BitDeque,
    entropy: ChaCha8Rng,
}

impl Tape {
    pub fn new(seed: TapeSeed) -> Self {
        let entropy = ChaCha8Rng::seed_from_u64(seed.seed());
        Tape {
            seed,
            read: 0,
            read0: 0,
            read1: 0,
            leftover: BitDeque::with_capacity(64),
            entropy,
        }
    }

    /// A tape over the raw entropy of `seed`, with no flips.
    pub fn from_seed(seed: u64) -> Self {
        Tape::new(TapeSeed::from_seed(seed))
    }

    /// A fresh tape over the same seed and overlay, rewound to offset 0.
    pub fn replay(&self) -> Self {
        Tape::new(self.seed.clone())
    }

    pub fn seed(&self) -> &TapeSeed {
        &self.seed
    }

    /// Total bits read so far; also the global offset of the next bit.
    pub fn bits_read(&self) -> u64 {
        self.read
    }

    pub fn zeros_read(&self) -> u64 {
        self.read0
    }

    pub fn ones_read(&self) -> u64 {
        self.read1
    }

    /// Read `width` bits, assembled most significant bit first.
    ///
    /// # Panics
    /// If `width > 64`.
    pub fn read(&mut self, width: u32) -> u64 {
        assert!(width <= 64, "Tape::read: width must be within [0, 64], got {}", width);

        let mut value = 0u64;
        for _ in 0..width {
            let raw = self.next_entropy_bit();
            let flip = usize::try_from(self.read)
                .ok()
                .and_then(|offset| self.seed.flips().get(offset))
                .unwrap_or(false);
            let bit = raw ^ flip;

            self.read += 1;
            if bit {
                self.read1 += 1;
            } else {
                self.read0 += 1;
            }
            value = (value << 1) | u64::from(bit);
        }
        value
    }

    fn next_entropy_bit(&mut self) -> bool {
        loop {
            if let Some(bit) = self.leftover.pop_front() {
                return bit;
            }
            self.leftover.push_u64(self.entropy.next_u64(), BitOrder::MsbFirst);
        }
    }
}

impl fmt::Debug for Tape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tape")
            .field("seed", &self.seed.seed())
            .field("flips", self.seed.flips())
            .field("read", &self.read)
            .field("read0", &self.read0)
            .field("read1", &self.read1)
            .finish()
    }
}
