//! Bit sources the interpreter can pull from.
//!
//! An [`EntropyInput`] is unbounded and not replayable; a [`TapeInput`] reads
//! through a [`Tape`] and reports availability as `limit - bits_read`, which is
//! how the shrinker bounds the cost of a re-evaluation.

use crate::tape::Tape;

use rand::RngCore;

/// Bounded source of fixed-width bit reads.
pub trait BitInput {
    /// Number of bits that may still be read.
    fn available(&self) -> u64;

    /// Read `width` bits (0..=64). Callers check `available` first.
    fn next(&mut self, width: u32) -> u64;
}

/// Unbounded view straight over a pseudorandom generator.
pub struct EntropyInput<'a, R: RngCore + ?Sized> {
    rng: &'a mut R,
}

impl<'a, R: RngCore + ?Sized> EntropyInput<'a, R> {
    pub fn new(rng: &'a mut R) -> Self {
        EntropyInput { rng }
    }
}

impl<R: RngCore + ?Sized> BitInput for EntropyInput<'_, R> {
    fn available(&self) -> u64 {
        u64::MAX
    }

    fn next(&mut self, width: u32) -> u64 {
        debug_assert!(width <= 64);
        match width {
            0 => 0,
            64 => self.rng.next_u64(),
            _ => self.rng.next_u64() & ((1u64 << width) - 1),
        }
    }
}

/// Replayable view over a tape, optionally capped at `limit` total bits.
pub struct TapeInput<'a> {
    tape: &'a mut Tape,
    limit: u64,
}

impl<'a> TapeInput<'a> {
    pub fn new(tape: &'a mut Tape) -> Self {
        TapeInput::with_limit(tape, u64::MAX)
    }

    pub fn with_limit(tape: &'a mut Tape, limit: u64) -> Self {
        TapeInput { tape, limit }
    }
}

impl BitInput for TapeInput<'_> {
    fn available(&self) -> u64 {
        self.limit.saturating_sub(self.tape.bits_read())
    }

    fn next(&mut self, width: u32) -> u64 {
        self.tape.read(width)
    }
}
