//! Running generators.
//!
//! [`interpret`] is the only evaluator. It walks the node graph with an
//! explicit stack of pending continuations, so deep `flat_map` chains and
//! recursive generators use heap memory instead of call stack.

use crate::erased::{self, Cont, Node, Step, Value};
use crate::gen::Gen;
use crate::input::{BitInput, EntropyInput, TapeInput};
use crate::seed::TapeSeed;
use crate::tape::Tape;

use rand::RngCore;

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult<A> {
    Ok(A),
    /// A read needed more bits than the input had available.
    Eof,
    /// A `Fail` node was reached or a filter rejected its value.
    Filtered,
}

impl<A> RunResult<A> {
    pub fn ok(self) -> Option<A> {
        match self {
            RunResult::Ok(value) => Some(value),
            RunResult::Eof | RunResult::Filtered => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, RunResult::Ok(_))
    }

    pub fn map<B>(self, f: impl FnOnce(A) -> B) -> RunResult<B> {
        match self {
            RunResult::Ok(value) => RunResult::Ok(f(value)),
            RunResult::Eof => RunResult::Eof,
            RunResult::Filtered => RunResult::Filtered,
        }
    }
}

pub(crate) fn interpret(root: &Node, input: &mut dyn BitInput) -> RunResult<Value> {
    let mut stack: Vec<Cont> = Vec::new();
    let mut current = root.clone();

    loop {
        let mut value = match current {
            Node::Fail => return RunResult::Filtered,
            Node::Delay(thunk) => {
                current = thunk.force();
                continue;
            }
            Node::FlatMap(left, f) => {
                stack.push(f);
                current = Node::clone(&left);
                continue;
            }
            Node::Done(make) => make(),
            Node::ReadN(0) => erased::erase(0u64),
            Node::ReadN(width) => {
                if input.available() < u64::from(width) {
                    return RunResult::Eof;
                }
                erased::erase(input.next(width))
            }
        };

        // Feed the value through pending continuations until one hands back
        // a node that still has to be evaluated.
        loop {
            let f = match stack.pop() {
                Some(f) => f,
                None => return RunResult::Ok(value),
            };
            match f(value) {
                Step::Yield(next) => value = next,
                Step::Next(node) => {
                    current = node;
                    break;
                }
                Step::Reject => return RunResult::Filtered,
            }
        }
    }
}

impl<A: 'static> Gen<A> {
    pub fn run(&self, input: &mut dyn BitInput) -> RunResult<A> {
        interpret(self.node(), input).map(erased::unerase::<A>)
    }

    /// Runs over `tape`, allowing at most `limit` bits in total to have been
    /// read from it.
    pub fn run_tape(&self, tape: &mut Tape, limit: u64) -> RunResult<A> {
        self.run(&mut TapeInput::with_limit(tape, limit))
    }

    /// Rebuilds the tape for `seed` and runs over it from offset 0.
    pub fn replay(&self, seed: &TapeSeed) -> (RunResult<A>, Tape) {
        let mut tape = Tape::new(seed.clone());
        let result = self.run_tape(&mut tape, u64::MAX);
        (result, tape)
    }

    /// One attempt straight over `rng`. Filtered runs give `None`.
    pub fn sample<R: RngCore + ?Sized>(&self, rng: &mut R) -> Option<A> {
        self.run(&mut EntropyInput::new(rng)).ok()
    }

    /// Retries until a run produces a value. Never returns for a generator
    /// that always filters.
    pub fn sample_unbounded<R: RngCore + ?Sized>(&self, rng: &mut R) -> A {
        loop {
            if let Some(value) = self.sample(rng) {
                return value;
            }
        }
    }

    /// Runs `count` attempts and hands every produced value to `body`.
    pub fn foreach<R: RngCore + ?Sized>(&self, rng: &mut R, count: usize, mut body: impl FnMut(A)) {
        for _ in 0..count {
            if let Some(value) = self.sample(rng) {
                body(value);
            }
        }
    }
}
