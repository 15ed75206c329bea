//! # tapegen
//!
//! Property-based test data generation over a replayable bit tape.
//!
//! Generators ([`Gen`]) are immutable descriptions built from five primitive
//! nodes and run by a single stack-safe interpreter. Every random decision is
//! read from a [`Tape`]: a seeded entropy stream with a flip overlay XORed on
//! top. Because a flip at offset `k` changes exactly the `k`-th decision,
//! shrinking works on overlays alone and needs no per-type shrinker, and any
//! generated value can be replayed exactly from its [`TapeSeed`].
//!
//! ```
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use tapegen::{CheckConfig, CheckError, Gen};
//!
//! let pairs = Gen::uint(0..=1_000).zip(&Gen::uint(0..=1_000));
//! let mut rng = ChaCha8Rng::seed_from_u64(7);
//! let result = pairs.check(&mut rng, &CheckConfig::default(), |&(a, b)| {
//!     assert!(a + b < 1_500, "sum too large");
//! });
//! match result {
//!     Err(CheckError::Minimized { value: (a, b), .. }) => assert!(a + b >= 1_500),
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```

pub mod bits;
pub mod combinators;
pub mod distributions;
pub mod engine;
mod erased;
pub mod failure;
pub mod gen;
pub mod input;
pub mod ints;
pub mod run;
pub mod seed;
pub mod shrinking;
pub mod strings;
pub mod tape;

pub use bits::{BitDeque, BitOrder};
pub use engine::{CheckConfig, CheckError, CheckReport};
pub use failure::{catch_failure, Failure, FailureComparison, FailureEquivalence, Site};
pub use gen::Gen;
pub use input::{BitInput, EntropyInput, TapeInput};
pub use run::RunResult;
pub use seed::{TapeSeed, TapeSeedError};
pub use shrinking::{MinimizeConfig, MinimizeError, TapeComplexity, WithTape};
pub use tape::Tape;
