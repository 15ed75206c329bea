//! Products, collections, optional values and recursion.

use crate::erased::{Node, Thunk};
use crate::gen::Gen;

use std::cell::OnceCell;
use std::rc::Rc;

impl<A: Clone + 'static> Gen<A> {
    /// Runs `self`, then `that`, and pairs the results.
    pub fn zip<B: 'static>(&self, that: &Gen<B>) -> Gen<(A, B)> {
        let that = that.clone();
        self.flat_map(move |a| that.map(move |b| (a.clone(), b)))
    }

    /// Runs `self`, then `that`, keeping the first result.
    pub fn zip_right<B: 'static>(&self, that: &Gen<B>) -> Gen<A> {
        let that = that.clone();
        self.flat_map(move |a| that.map(move |_| a.clone()))
    }

    /// Runs `self`, then the generator `f` builds from its value, and pairs
    /// the two results.
    pub fn flat_map_zip<B: 'static>(&self, f: impl Fn(A) -> Gen<B> + 'static) -> Gen<(A, B)> {
        self.flat_map(move |a| f(a.clone()).map(move |b| (a.clone(), b)))
    }

    /// Runs `gens` left to right and collects their values in order.
    pub fn sequence(gens: Vec<Gen<A>>) -> Gen<Vec<A>> {
        sequence_from(Rc::new(gens), 0, None)
    }

    /// `count` independent runs of `gen`.
    pub fn repeat(count: usize, gen: Gen<A>) -> Gen<Vec<A>> {
        Gen::sequence(vec![gen; count])
    }

    pub fn repeat_n(&self, count: usize) -> Gen<Vec<A>> {
        Gen::repeat(count, self.clone())
    }

    /// Draws a length from `count`, then that many values.
    pub fn repeat_with(&self, count: &Gen<usize>) -> Gen<Vec<A>> {
        let this = self.clone();
        count.flat_map(move |n| Gen::repeat(n, this.clone()))
    }
}

/// Values a sequence has produced so far, newest first. Pushing shares the
/// tail, so one step costs the same however many values came before it.
struct Collected<A> {
    head: A,
    tail: Option<Rc<Collected<A>>>,
}

impl<A> Drop for Collected<A> {
    fn drop(&mut self) {
        // Unlink iteratively; a long chain would overflow the stack otherwise.
        let mut tail = self.tail.take();
        while let Some(next) = tail {
            match Rc::try_unwrap(next) {
                Ok(mut cell) => tail = cell.tail.take(),
                Err(_) => break,
            }
        }
    }
}

fn collect<A: Clone>(mut cursor: Option<&Collected<A>>, len: usize) -> Vec<A> {
    let mut out = Vec::with_capacity(len);
    while let Some(cell) = cursor {
        out.push(cell.head.clone());
        cursor = cell.tail.as_deref();
    }
    out.reverse();
    out
}

fn sequence_from<A: Clone + 'static>(
    gens: Rc<Vec<Gen<A>>>,
    index: usize,
    acc: Option<Rc<Collected<A>>>,
) -> Gen<Vec<A>> {
    let next = match gens.get(index) {
        Some(gen) => gen.clone(),
        None => return Gen::from_fn(move || collect(acc.as_deref(), index)),
    };
    next.flat_map(move |value| {
        let acc = Rc::new(Collected {
            head: value,
            tail: acc.clone(),
        });
        sequence_from(Rc::clone(&gens), index + 1, Some(acc))
    })
}

impl<A: 'static> Gen<A> {
    /// Runs `self`, then `that`, keeping the second result.
    pub fn zip_left<B: 'static>(&self, that: &Gen<B>) -> Gen<B> {
        let that = that.clone();
        self.flat_map(move |_| that.clone())
    }

    /// One bit decides between `None` and a value from `self`.
    pub fn nullable(&self) -> Gen<Option<A>> {
        let this = self.clone();
        Gen::boolean().flat_map(move |present| {
            if present {
                this.map(Some)
            } else {
                Gen::from_fn(|| None)
            }
        })
    }

    /// Ties a recursive knot. `body` receives a handle that stands for the
    /// generator being defined and may use it anywhere, typically under a
    /// choice that eventually picks a base case.
    ///
    /// The handle must not be run before `recursive` returns, and must not be
    /// kept after the returned generator is dropped; either panics.
    ///
    /// ```
    /// use tapegen::Gen;
    ///
    /// #[derive(Clone, Debug)]
    /// enum Tree {
    ///     Leaf,
    ///     Node(Box<Tree>, Box<Tree>),
    /// }
    ///
    /// let trees = Gen::recursive(|tree: Gen<Tree>| {
    ///     let branch = tree.zip(&tree).map(|(l, r)| Tree::Node(Box::new(l), Box::new(r)));
    ///     Gen::freq_gen(vec![(3, Gen::done(Tree::Leaf)), (1, branch)])
    /// });
    /// ```
    pub fn recursive(body: impl FnOnce(Gen<A>) -> Gen<A>) -> Gen<A> {
        let slot: Rc<OnceCell<Node>> = Rc::new(OnceCell::new());
        let handle = Gen::from_node(Node::Delay(Rc::new(Thunk::Slot(Rc::downgrade(&slot)))));
        let definition = body(handle).into_node();
        // Fresh slot; the only other reference is weak.
        let _ = slot.set(definition);
        Gen::from_node(Node::Delay(Rc::new(Thunk::Bound(slot))))
    }
}
