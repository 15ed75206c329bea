//! Type-erased generator nodes.
//!
//! `Gen<A>` is a typed handle over an untyped [`Node`]. A `FlatMap` chain mixes
//! many intermediate types, and the interpreter keeps its pending
//! continuations on one homogeneous heap stack, so values travel between nodes
//! as `Box<dyn Any>`.
//!
//! Unchecked invariant: a continuation stored in `FlatMap(left, f)` is only ever
//! applied to a value produced by `left`, and `left` was built from a `Gen<Z>`
//! whose continuation expects exactly `Z`. `gen.rs` is the only place nodes are
//! built, and it pairs them that way by construction, so [`unerase`] never sees
//! a mismatched type. Nothing here is exposed outside the crate.

use std::any::Any;
use std::cell::OnceCell;
use std::rc::{Rc, Weak};

pub(crate) type Value = Box<dyn Any>;

/// What a continuation hands back to the interpreter.
pub(crate) enum Step {
    /// A finished value, equivalent to continuing with `Done(value)`.
    Yield(Value),
    /// The next node to evaluate.
    Next(Node),
    /// Discard the value; the run ends as `Filtered`.
    Reject,
}

pub(crate) type Cont = Rc<dyn Fn(Value) -> Step>;

#[derive(Clone)]
pub(crate) enum Node {
    Fail,
    Done(Rc<dyn Fn() -> Value>),
    Delay(Rc<Thunk>),
    ReadN(u32),
    FlatMap(Rc<Node>, Cont),
}

pub(crate) enum Thunk {
    /// Built on first demand, then memoized.
    Lazy {
        init: Box<dyn Fn() -> Node>,
        forced: OnceCell<Node>,
    },
    /// Owning end of a recursive generator's late-bound slot.
    Bound(Rc<OnceCell<Node>>),
    /// Self reference handed to a recursive generator's body. Weak, so the
    /// definition does not keep itself alive.
    Slot(Weak<OnceCell<Node>>),
}

impl Thunk {
    pub(crate) fn lazy(init: Box<dyn Fn() -> Node>) -> Self {
        Thunk::Lazy {
            init,
            forced: OnceCell::new(),
        }
    }

    pub(crate) fn force(&self) -> Node {
        match self {
            Thunk::Lazy { init, forced } => forced.get_or_init(|| init()).clone(),
            Thunk::Bound(slot) => resolve(slot),
            Thunk::Slot(slot) => match slot.upgrade() {
                Some(slot) => resolve(&slot),
                None => panic!("recursive generator handle outlived its definition"),
            },
        }
    }
}

fn resolve(slot: &OnceCell<Node>) -> Node {
    match slot.get() {
        Some(node) => node.clone(),
        None => panic!("recursive generator evaluated before its definition completed"),
    }
}

pub(crate) fn erase<A: 'static>(value: A) -> Value {
    Box::new(value)
}

pub(crate) fn unerase<A: 'static>(value: Value) -> A {
    match value.downcast::<A>() {
        Ok(value) => *value,
        Err(_) => unreachable!(
            "generator continuation received a value that is not {}",
            std::any::type_name::<A>()
        ),
    }
}
