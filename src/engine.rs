//! # Check: failure-driven search
//!
//! [`Gen::check`] is the entry point a test calls. It draws fresh tapes,
//! runs the check body on every value produced, and on the first panic hands
//! the failing tape to the shrinker. The predicate the shrinker sees is "the
//! body still fails, and fails the same way", where "the same way" is a
//! [`FailureEquivalence`] policy.
//!
//! The outcome is either a passing [`CheckReport`] or a [`CheckError`] that
//! carries the simplest failing value together with the [`TapeSeed`] that
//! replays it exactly. Set [`CheckConfig::replay`] to that seed to reproduce
//! the failure first thing on the next run.

use crate::failure::{catch_failure, Failure, FailureComparison, FailureEquivalence};
use crate::gen::Gen;
use crate::run::RunResult;
use crate::seed::TapeSeed;
use crate::shrinking::{MinimizeConfig, MinimizeError, TapeComplexity, WithTape};
use crate::tape::Tape;

use log::{error, info, trace};
use rand::RngCore;
use std::fmt;

/// Configuration for [`Gen::check`].
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Fresh tapes to try, not counting `replay`.
    pub iterations: usize,

    /// Rounds the shrinker gets once a failure is found.
    pub minimizer_steps: usize,

    /// Failure equivalence used by [`Gen::check`].
    pub comparison: FailureComparison,

    pub minimize: MinimizeConfig,

    /// Tape evaluated before any fresh one, typically the seed of an earlier
    /// failure.
    pub replay: Option<TapeSeed>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        CheckConfig {
            iterations: 100,
            minimizer_steps: 10_000,
            comparison: FailureComparison::default(),
            minimize: MinimizeConfig::default(),
            replay: None,
        }
    }
}

impl CheckConfig {
    pub fn with_replay(mut self, seed: TapeSeed) -> Self {
        self.replay = Some(seed);
        self
    }
}

/// Counts from a check in which no value failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckReport {
    /// Values the body accepted.
    pub passed: usize,
    /// Tapes that produced no value (`Eof` or `Filtered`).
    pub discarded: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckError<A: fmt::Debug> {
    /// The body failed, and `value` is the simplest input found that fails
    /// the same way. Replay it with `seed`.
    #[error("check failed: {failure}\n  minimal input: {value:?} ({complexity})\n  replay seed: {seed}")]
    Minimized {
        failure: Failure,
        seed: TapeSeed,
        value: A,
        complexity: TapeComplexity,
    },

    /// The body failed once but re-running it on the same value did not
    /// fail the same way. Either the body is nondeterministic or the
    /// equivalence policy is too strict.
    #[error("check failed: {failure}\n  but the failure did not reproduce on replay seed {seed}; is the check deterministic?")]
    FailedToMinimize { failure: Failure, seed: TapeSeed },
}

impl<A: fmt::Debug> CheckError<A> {
    pub fn failure(&self) -> &Failure {
        match self {
            CheckError::Minimized { failure, .. } | CheckError::FailedToMinimize { failure, .. } => failure,
        }
    }

    pub fn seed(&self) -> &TapeSeed {
        match self {
            CheckError::Minimized { seed, .. } | CheckError::FailedToMinimize { seed, .. } => seed,
        }
    }
}

impl<A: fmt::Debug + 'static> Gen<A> {
    /// Runs `body` on values from this generator, using `config.comparison`
    /// to decide whether a shrunk value still fails the same way.
    ///
    /// # Errors
    /// A [`CheckError`] describing the first failure found, shrunk.
    pub fn check<R: RngCore + ?Sized>(
        &self,
        rng: &mut R,
        config: &CheckConfig,
        body: impl Fn(&A),
    ) -> Result<CheckReport, CheckError<A>> {
        self.check_with(rng, config, &config.comparison, body)
    }

    /// [`Gen::check`] with a custom equivalence policy.
    pub fn check_with<R, E>(
        &self,
        rng: &mut R,
        config: &CheckConfig,
        policy: &E,
        body: impl Fn(&A),
    ) -> Result<CheckReport, CheckError<A>>
    where
        R: RngCore + ?Sized,
        E: FailureEquivalence + ?Sized,
    {
        let mut report = CheckReport::default();
        let backtrace = policy.needs_backtrace();
        let fresh = (0..config.iterations).map(|_| TapeSeed::from_seed(rng.next_u64()));

        for seed in config.replay.iter().cloned().chain(fresh) {
            let mut tape = Tape::new(seed);
            let value = match self.run_tape(&mut tape, u64::MAX) {
                RunResult::Ok(value) => value,
                RunResult::Eof | RunResult::Filtered => {
                    trace!("check: tape {} produced nothing", tape.seed());
                    report.discarded += 1;
                    continue;
                }
            };
            match probe(&body, &value, backtrace) {
                None => report.passed += 1,
                Some(failure) => {
                    info!("check: {:?} failed ({}) on seed {}", value, failure, tape.seed());
                    let witness = WithTape::new(tape, value);
                    return Err(self.shrink_failure(config, policy, &body, witness, failure));
                }
            }
        }

        info!("check: passed {} values, discarded {}", report.passed, report.discarded);
        Ok(report)
    }

    fn shrink_failure<E: FailureEquivalence + ?Sized>(
        &self,
        config: &CheckConfig,
        policy: &E,
        body: &impl Fn(&A),
        witness: WithTape<A>,
        original: Failure,
    ) -> CheckError<A> {
        let backtrace = policy.needs_backtrace();
        let seed = witness.seed().clone();
        let reproduces = |value: &A| match probe(body, value, backtrace) {
            Some(candidate) => policy.equivalent(&original, &candidate),
            None => false,
        };

        match self.minimize_with(&config.minimize, witness, config.minimizer_steps, seed.seed(), reproduces) {
            Ok(best) => {
                let failure = probe(body, &best.value, backtrace).unwrap_or(original);
                info!(
                    "check: minimized to {:?} ({}), replay seed {}",
                    best.value,
                    best.complexity(),
                    best.seed()
                );
                CheckError::Minimized {
                    failure,
                    seed: best.seed().clone(),
                    complexity: best.complexity(),
                    value: best.value,
                }
            }
            Err(MinimizeError::NotAWitness) => {
                error!("check: failure on seed {} did not reproduce: {}", seed, original);
                CheckError::FailedToMinimize {
                    failure: original,
                    seed,
                }
            }
        }
    }
}

/// Runs the body once on `value`, returning its failure if it panicked.
fn probe<A>(body: &impl Fn(&A), value: &A, backtrace: bool) -> Option<Failure> {
    catch_failure(backtrace, || body(value)).err()
}
