//! # Gen: composable descriptions of random values
//!
//! A `Gen<A>` is an immutable recipe. It never holds a value and never reads
//! a bit until it is run against a [`BitInput`](crate::input::BitInput). Every
//! generator is built from five primitive nodes:
//!
//! - `Fail` - produces nothing; the run ends as `Filtered`
//! - `Done` - produces a value without reading
//! - `Delay` - a lazily built generator, forced once and memoized
//! - `ReadN(n)` - reads exactly `n` bits as an unsigned integer
//! - `FlatMap(g, f)` - runs `g`, then continues with `f(value)`
//!
//! All the other operations (`map`, `filter`, `zip`, sampling, collections)
//! are derived from those, so running any generator is one loop in
//! [`run`](crate::run).
//!
//! Generators are cheap to clone: clones share their structure.

use crate::erased::{self, Node, Step, Thunk, Value};

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

pub struct Gen<A> {
    node: Node,
    marker: PhantomData<fn() -> A>,
}

impl<A> Clone for Gen<A> {
    fn clone(&self) -> Self {
        Gen {
            node: self.node.clone(),
            marker: PhantomData,
        }
    }
}

impl<A> fmt::Debug for Gen<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match &self.node {
            Node::Fail => "Fail".to_string(),
            Node::Done(_) => "Done".to_string(),
            Node::Delay(_) => "Delay".to_string(),
            Node::ReadN(width) => format!("ReadN({})", width),
            Node::FlatMap(_, _) => "FlatMap".to_string(),
        };
        write!(f, "Gen<{}>::{}", std::any::type_name::<A>(), shape)
    }
}

impl<A: 'static> Gen<A> {
    pub(crate) fn from_node(node: Node) -> Self {
        Gen {
            node,
            marker: PhantomData,
        }
    }

    pub(crate) fn node(&self) -> &Node {
        &self.node
    }

    pub(crate) fn into_node(self) -> Node {
        self.node
    }

    /// A generator that never produces a value.
    pub fn fail() -> Self {
        Gen::from_node(Node::Fail)
    }

    /// Always produces `value` and reads nothing.
    pub fn done(value: A) -> Self
    where
        A: Clone,
    {
        Gen::from_fn(move || value.clone())
    }

    /// Alias for [`Gen::done`].
    pub fn pure(value: A) -> Self
    where
        A: Clone,
    {
        Gen::done(value)
    }

    /// Produces `make()` on every run, reading nothing. Lets generators of
    /// non-`Clone` values exist.
    pub fn from_fn(make: impl Fn() -> A + 'static) -> Self {
        Gen::from_node(Node::Done(Rc::new(move || erased::erase(make()))))
    }

    /// Defers building the generator until it is first run. The result of
    /// `build` is memoized, so it runs at most once per `Delay`.
    pub fn delay(build: impl Fn() -> Gen<A> + 'static) -> Self {
        let thunk = Thunk::lazy(Box::new(move || build().into_node()));
        Gen::from_node(Node::Delay(Rc::new(thunk)))
    }

    fn bind<B: 'static>(&self, f: impl Fn(A) -> Step + 'static) -> Gen<B> {
        let cont = Rc::new(move |value: Value| f(erased::unerase::<A>(value)));
        Gen::from_node(Node::FlatMap(Rc::new(self.node.clone()), cont))
    }

    /// Sequential composition where the continuation may reject the value.
    /// `None` ends the run as `Filtered`.
    pub fn flat_map_opt<B: 'static>(&self, f: impl Fn(A) -> Option<Gen<B>> + 'static) -> Gen<B> {
        self.bind(move |a| match f(a) {
            Some(next) => Step::Next(next.into_node()),
            None => Step::Reject,
        })
    }

    pub fn flat_map<B: 'static>(&self, f: impl Fn(A) -> Gen<B> + 'static) -> Gen<B> {
        self.bind(move |a| Step::Next(f(a).into_node()))
    }

    pub fn map<B: 'static>(&self, f: impl Fn(A) -> B + 'static) -> Gen<B> {
        self.bind(move |a| Step::Yield(erased::erase(f(a))))
    }

    /// Keeps values satisfying `keep`; any other value ends the run as
    /// `Filtered`. Nothing is retried.
    pub fn filter(&self, keep: impl Fn(&A) -> bool + 'static) -> Gen<A> {
        self.bind(move |a| {
            if keep(&a) {
                Step::Yield(erased::erase(a))
            } else {
                Step::Reject
            }
        })
    }

    pub fn filter_map<B: 'static>(&self, f: impl Fn(A) -> Option<B> + 'static) -> Gen<B> {
        self.bind(move |a| match f(a) {
            Some(b) => Step::Yield(erased::erase(b)),
            None => Step::Reject,
        })
    }
}

impl Gen<u64> {
    /// Reads exactly `width` bits as an unsigned integer, most significant
    /// bit first. `bits(0)` always produces 0.
    ///
    /// # Panics
    /// If `width > 64`.
    pub fn bits(width: u32) -> Self {
        assert!(width <= 64, "Gen::bits: width must be within [0, 64], got {}", width);
        Gen::from_node(Node::ReadN(width))
    }
}

impl Gen<()> {
    pub fn unit() -> Self {
        Gen::done(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunResult;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::cell::Cell;

    #[test]
    fn test_done_reads_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(Gen::done(7).sample(&mut rng), Some(7));
        assert_eq!(Gen::unit().sample(&mut rng), Some(()));
    }

    #[test]
    fn test_fail_never_produces() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..100 {
            assert_eq!(Gen::<u64>::fail().sample(&mut rng), None);
        }
    }

    #[test]
    fn test_from_fn_supports_non_clone_values() {
        struct Token(u8);
        let gen = Gen::from_fn(|| Token(3)).map(|t| t.0);
        assert_eq!(gen.sample(&mut ChaCha8Rng::seed_from_u64(0)), Some(3));
    }

    #[test]
    fn test_map_and_flat_map_compose() {
        let gen = Gen::bits(4).flat_map(|hi| Gen::bits(4).map(move |lo| (hi << 4) | lo));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert!(gen.sample(&mut rng).unwrap() < 256);
        }
    }

    #[test]
    fn test_filter_rejects_without_retry() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let evens = Gen::bits(8).filter(|x| x % 2 == 0);
        let mut produced = 0;
        let mut filtered = 0;
        for _ in 0..1000 {
            match evens.run(&mut crate::input::EntropyInput::new(&mut rng)) {
                RunResult::Ok(x) => {
                    assert_eq!(x % 2, 0);
                    produced += 1;
                }
                RunResult::Filtered => filtered += 1,
                RunResult::Eof => panic!("entropy input never runs out"),
            }
        }
        assert!(produced > 400 && filtered > 400);
    }

    #[test]
    fn test_flat_map_opt_none_filters() {
        let gen = Gen::bits(1).flat_map_opt(|b| if b == 1 { Some(Gen::done(b)) } else { None });
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..50 {
            if let Some(v) = gen.sample(&mut rng) {
                assert_eq!(v, 1);
            }
        }
    }

    #[test]
    fn test_delay_builds_once() {
        thread_local!(static BUILDS: Cell<u32> = Cell::new(0));
        let gen = Gen::delay(|| {
            BUILDS.with(|b| b.set(b.get() + 1));
            Gen::bits(3)
        });
        assert_eq!(BUILDS.with(Cell::get), 0);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for _ in 0..10 {
            assert!(gen.sample(&mut rng).unwrap() < 8);
        }
        assert_eq!(BUILDS.with(Cell::get), 1);
    }

    #[test]
    #[should_panic(expected = "width must be within")]
    fn test_bits_rejects_wide_reads() {
        Gen::bits(65);
    }

    #[test]
    fn test_debug_names_the_root() {
        assert_eq!(format!("{:?}", Gen::bits(3)), "Gen<u64>::ReadN(3)");
    }
}
