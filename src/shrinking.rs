//! # Tape-level shrinking
//!
//! Shrinking never looks at generated values. It searches over flip overlays
//! of a witness tape, re-runs the generator on each perturbed tape, and keeps
//! whatever still satisfies the predicate while reading fewer bits, or the
//! same number of bits with fewer ones.
//!
//! ## Why this works for any generator
//!
//! Every generator reads its decisions from the tape in a fixed order, and a
//! flip at offset `k` changes exactly the decision made at `k`. Ranged integers
//! put their high bits first, `boolean` maps a clear bit to `false`, and
//! `freq`/`one_of` prefer their first options for small draws. Fewer ones
//! therefore tends toward smaller numbers, earlier alternatives and shorter
//! collections, without the generator author writing a shrinker.
//!
//! ## Bounded re-evaluation
//!
//! A perturbed tape may steer the generator into a much longer path. Each
//! re-run is capped at `limit_multiplier` times the source tape's bit count
//! and abandoned as `Eof` past that.

use crate::gen::Gen;
use crate::run::RunResult;
use crate::seed::TapeSeed;
use crate::tape::Tape;

use log::{debug, trace};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt;

/// Shrink order over tapes: bits read, then ones read. Smaller is simpler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TapeComplexity {
    pub length: u64,
    pub positive: u64,
}

impl TapeComplexity {
    pub fn of(tape: &Tape) -> Self {
        TapeComplexity {
            length: tape.bits_read(),
            positive: tape.ones_read(),
        }
    }
}

impl fmt::Display for TapeComplexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}P{}", self.length, self.positive)
    }
}

/// A generated value together with the tape that produced it.
#[derive(Debug)]
pub struct WithTape<A> {
    pub tape: Tape,
    pub value: A,
}

impl<A> WithTape<A> {
    pub fn new(tape: Tape, value: A) -> Self {
        WithTape { tape, value }
    }

    pub fn complexity(&self) -> TapeComplexity {
        TapeComplexity::of(&self.tape)
    }

    pub fn seed(&self) -> &TapeSeed {
        self.tape.seed()
    }
}

/// Search parameters for [`Gen::minimize_with`].
#[derive(Debug, Clone)]
pub struct MinimizeConfig {
    /// Candidates kept between rounds, best first.
    pub pool_size: usize,
    /// Upper bound on bits flipped per perturbation.
    pub max_flips: u64,
    /// A re-run may read this many times the source tape's bits.
    pub limit_multiplier: u64,
}

impl Default for MinimizeConfig {
    fn default() -> Self {
        MinimizeConfig {
            pool_size: 10,
            max_flips: 4,
            limit_multiplier: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MinimizeError {
    #[error("the starting value does not satisfy the predicate")]
    NotAWitness,
}

impl<A: 'static> Gen<A> {
    /// Searches `iters` fresh tapes, seeded from `seed`, for a value
    /// satisfying `p`.
    pub fn satisfy(&self, iters: usize, seed: u64, mut p: impl FnMut(&A) -> bool) -> Option<WithTape<A>> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        for i in 0..iters {
            let mut tape = Tape::from_seed(rng.next_u64());
            match self.run_tape(&mut tape, u64::MAX) {
                RunResult::Ok(value) => {
                    if p(&value) {
                        debug!("satisfy: found a witness after {} tapes at {}", i + 1, TapeComplexity::of(&tape));
                        return Some(WithTape::new(tape, value));
                    }
                }
                RunResult::Eof | RunResult::Filtered => {
                    trace!("satisfy: tape {} produced nothing", i);
                }
            }
        }
        None
    }

    /// [`Gen::minimize_with`] under the default configuration.
    pub fn minimize(
        &self,
        witness: WithTape<A>,
        iters: usize,
        seed: u64,
        p: impl FnMut(&A) -> bool,
    ) -> Result<WithTape<A>, MinimizeError> {
        self.minimize_with(&MinimizeConfig::default(), witness, iters, seed, p)
    }

    /// Shrinks `witness` toward the simplest tape whose value still satisfies
    /// `p`.
    ///
    /// Keeps a pool of the best candidates found so far. Each of the `iters`
    /// rounds picks a pool member uniformly, flips between 1 and
    /// `min(max_flips, bits_read)` of its consumed bits to random values, and
    /// re-runs the generator on the result. A candidate whose value satisfies
    /// `p` joins the pool, which is then cut back to `pool_size` by
    /// [`TapeComplexity`].
    ///
    /// The result is never more complex than `witness`, and its value
    /// satisfies `p`.
    ///
    /// # Errors
    /// [`MinimizeError::NotAWitness`] if `p(&witness.value)` is false.
    pub fn minimize_with(
        &self,
        config: &MinimizeConfig,
        witness: WithTape<A>,
        iters: usize,
        seed: u64,
        mut p: impl FnMut(&A) -> bool,
    ) -> Result<WithTape<A>, MinimizeError> {
        if !p(&witness.value) {
            return Err(MinimizeError::NotAWitness);
        }
        let pool_size = config.pool_size.max(1);
        let start = witness.complexity();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut pool = vec![witness];
        let mut improvements = 0usize;
        let mut discarded = 0usize;

        for round in 0..iters {
            if pool[0].tape.bits_read() == 0 {
                // Nothing is simpler than an empty read.
                break;
            }
            let (mut candidate, limit) = match perturb(&pool, config, &mut rng) {
                Some(perturbed) => perturbed,
                None => continue,
            };
            match self.run_tape(&mut candidate, limit) {
                RunResult::Ok(value) => {
                    if !p(&value) {
                        continue;
                    }
                    let best = pool[0].complexity();
                    pool.push(WithTape::new(candidate, value));
                    pool.sort_by_key(WithTape::complexity);
                    pool.truncate(pool_size);
                    if pool[0].complexity() < best {
                        improvements += 1;
                        debug!("minimize: round {} improved to {}", round, pool[0].complexity());
                    }
                }
                RunResult::Eof | RunResult::Filtered => discarded += 1,
            }
        }

        let best = pool.swap_remove(0);
        debug!(
            "minimize: {} -> {} in {} rounds ({} improvements, {} discarded)",
            start,
            best.complexity(),
            iters,
            improvements,
            discarded
        );
        Ok(best)
    }
}

/// Builds a perturbed copy of a random pool member, with the bit limit for
/// re-running it. `None` if the chosen member read nothing.
fn perturb<A>(pool: &[WithTape<A>], config: &MinimizeConfig, rng: &mut ChaCha8Rng) -> Option<(Tape, u64)> {
    let source = &pool[rng.gen_range(0..pool.len())];
    let consumed = source.tape.bits_read();
    if consumed == 0 {
        return None;
    }

    let mut flips = source.tape.seed().flips().clone();
    let count = rng.gen_range(1..=config.max_flips.clamp(1, consumed));
    for _ in 0..count {
        let offset = rng.gen_range(0..consumed);
        flips.fill_and_set(offset as usize, rng.gen());
    }

    let tape = Tape::new(TapeSeed::new(source.tape.seed().seed(), flips));
    Some((tape, consumed.saturating_mul(config.limit_multiplier)))
}
