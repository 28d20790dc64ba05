//! data
//!
//! The extrinsic data store: typed side channels attached to document
//! nodes without modifying the node types themselves.
//!
//! # Architecture
//!
//! A [`Data`] channel is a globally-unique key created by
//! [`Data::declare`]. Values are stored in an [`Extrinsics`] table keyed
//! by `(channel, target identity)`, where target identity is the address
//! of the target object, not its value: two distinct targets that
//! compare equal are still independent. The label passed to `declare` is
//! diagnostic only; label collisions between channels are legal and
//! never cause cross-talk.
//!
//! [`Data::or_else`] turns a channel into a memoizing accessor: the first
//! read for a target runs the initializer and stores the result, and
//! every later read returns the stored value without recomputation. This
//! is how derived document facts (the parsed document, the schema
//! definition, per-node error lists, the using list) are cached.
//!
//! # Concurrency
//!
//! The store is single-threaded by design; it lives inside a document
//! facade and is never shared across threads. Channels themselves are
//! plain `Copy` keys and may be declared in statics.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

/// The identity of an attachment target: the address of the object, not
/// its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(usize);

impl TargetId {
    /// The identity of `target`.
    pub fn of<T>(target: &T) -> Self {
        TargetId(target as *const T as usize)
    }
}

/// Marker target type for channels keyed by heterogeneous nodes.
///
/// Channels declared over `AnyTarget` have no typed accessors; use the
/// `*_at` methods with a [`TargetId`] instead.
pub enum AnyTarget {}

/// The per-document side table holding every extrinsic attachment.
#[derive(Default)]
pub struct Extrinsics {
    cells: RefCell<HashMap<(u64, TargetId), Box<dyn Any>>>,
}

impl Extrinsics {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored attachments, across all channels and targets.
    pub fn len(&self) -> usize {
        self.cells.borrow().len()
    }

    /// Whether nothing has been attached yet.
    pub fn is_empty(&self) -> bool {
        self.cells.borrow().is_empty()
    }
}

impl fmt::Debug for Extrinsics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extrinsics")
            .field("attachments", &self.len())
            .finish()
    }
}

static NEXT_CHANNEL: AtomicU64 = AtomicU64::new(0);

/// A typed attachment channel for values of type `D` on targets of type
/// `T`.
///
/// The channel itself holds no data; it is a key into an [`Extrinsics`]
/// store.
///
/// ```
/// use specbind::data::{Data, Extrinsics};
///
/// let store = Extrinsics::new();
/// let label: Data<String, u32> = Data::declare("display label");
/// let target = 7u32;
///
/// assert_eq!(label.get(&store, &target), None);
/// label.set(&store, &target, "seven".to_string());
/// assert_eq!(label.get(&store, &target), Some("seven".to_string()));
/// ```
pub struct Data<D, T> {
    channel: u64,
    label: &'static str,
    _marker: PhantomData<fn(&T) -> D>,
}

impl<D, T> Clone for Data<D, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D, T> Copy for Data<D, T> {}

impl<D, T> fmt::Debug for Data<D, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Data")
            .field("channel", &self.channel)
            .field("label", &self.label)
            .finish()
    }
}

impl<D: Clone + 'static, T> Data<D, T> {
    /// Create a fresh channel. The label is for diagnostics only.
    pub fn declare(label: &'static str) -> Self {
        Data {
            channel: NEXT_CHANNEL.fetch_add(1, Ordering::Relaxed),
            label,
            _marker: PhantomData,
        }
    }

    /// The diagnostic label this channel was declared with.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Read the value stored for `target`, if any.
    pub fn get(&self, store: &Extrinsics, target: &T) -> Option<D> {
        self.get_at(store, TargetId::of(target))
    }

    /// Read the value stored for a raw target identity, if any.
    pub fn get_at(&self, store: &Extrinsics, target: TargetId) -> Option<D> {
        store
            .cells
            .borrow()
            .get(&(self.channel, target))
            .and_then(|cell| cell.downcast_ref::<D>())
            .cloned()
    }

    /// Write a value for `target`, replacing any prior value.
    pub fn set(&self, store: &Extrinsics, target: &T, value: D) {
        self.set_at(store, TargetId::of(target), value);
    }

    /// Write a value for a raw target identity, replacing any prior
    /// value.
    pub fn set_at(&self, store: &Extrinsics, target: TargetId, value: D) {
        store
            .cells
            .borrow_mut()
            .insert((self.channel, target), Box::new(value));
    }

    /// Store `value` only if the cell is empty; returns the value left in
    /// the cell either way.
    pub fn set_if_vacant(&self, store: &Extrinsics, target: &T, value: D) -> D {
        self.set_if_vacant_at(store, TargetId::of(target), value)
    }

    /// `set_if_vacant` addressed by raw target identity.
    pub fn set_if_vacant_at(&self, store: &Extrinsics, target: TargetId, value: D) -> D {
        let mut cells = store.cells.borrow_mut();
        let cell = cells
            .entry((self.channel, target))
            .or_insert_with(|| Box::new(value.clone()));
        cell.downcast_ref::<D>().cloned().unwrap_or(value)
    }

    /// Mutate the stored value in place. Returns `None` (without calling
    /// `mutate`) when nothing is stored for `target`.
    pub fn update<R>(
        &self,
        store: &Extrinsics,
        target: &T,
        mutate: impl FnOnce(&mut D) -> R,
    ) -> Option<R> {
        self.update_at(store, TargetId::of(target), mutate)
    }

    /// `update` addressed by raw target identity.
    pub fn update_at<R>(
        &self,
        store: &Extrinsics,
        target: TargetId,
        mutate: impl FnOnce(&mut D) -> R,
    ) -> Option<R> {
        let mut cells = store.cells.borrow_mut();
        cells
            .get_mut(&(self.channel, target))
            .and_then(|cell| cell.downcast_mut::<D>())
            .map(mutate)
    }

    /// Turn this channel into a memoizing accessor: reads compute the
    /// value with `init` the first time a target is seen and return the
    /// stored value ever after.
    pub fn or_else(self, init: fn(&Extrinsics, &T) -> D) -> Memo<D, T> {
        Memo { data: self, init }
    }
}

/// A memoizing accessor over a [`Data`] channel.
///
/// The initializer runs at most once per distinct target, even when it is
/// non-deterministic; later reads return the stored value.
pub struct Memo<D, T> {
    data: Data<D, T>,
    init: fn(&Extrinsics, &T) -> D,
}

impl<D, T> Clone for Memo<D, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D, T> Copy for Memo<D, T> {}

impl<D, T> fmt::Debug for Memo<D, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo").field("data", &self.data).finish()
    }
}

impl<D: Clone + 'static, T> Memo<D, T> {
    /// Read the value for `target`, computing and storing it first if
    /// this is the first read.
    pub fn get(&self, store: &Extrinsics, target: &T) -> D {
        if let Some(stored) = self.data.get(store, target) {
            return stored;
        }
        // No table borrow is held here: the initializer is free to read
        // and write other channels (or other targets of this one).
        let computed = (self.init)(store, target);
        self.data
            .set_if_vacant_at(store, TargetId::of(target), computed)
    }

    /// Mutate the (initialized-if-needed) value in place.
    pub fn update<R>(
        &self,
        store: &Extrinsics,
        target: &T,
        mutate: impl FnOnce(&mut D) -> R,
    ) -> Option<R> {
        self.get(store, target);
        self.data.update(store, target, mutate)
    }

    /// The underlying channel, for force-writes via [`Data::set`].
    pub fn data(&self) -> Data<D, T> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn unstored_targets_read_as_none() {
        let store = Extrinsics::new();
        let channel: Data<u32, String> = Data::declare("missing");
        let target = "anything".to_string();
        assert_eq!(channel.get(&store, &target), None);
    }

    #[test]
    fn set_then_get_round_trips() {
        let store = Extrinsics::new();
        let channel: Data<Vec<u32>, String> = Data::declare("numbers");
        let target = "doc".to_string();
        channel.set(&store, &target, vec![1, 2]);
        assert_eq!(channel.get(&store, &target), Some(vec![1, 2]));
        channel.set(&store, &target, vec![3]);
        assert_eq!(channel.get(&store, &target), Some(vec![3]));
    }

    #[test]
    fn channels_with_the_same_label_never_cross_talk() {
        let store = Extrinsics::new();
        let first: Data<u32, String> = Data::declare("shared label");
        let second: Data<u32, String> = Data::declare("shared label");
        let target = "doc".to_string();
        first.set(&store, &target, 1);
        second.set(&store, &target, 2);
        assert_eq!(first.get(&store, &target), Some(1));
        assert_eq!(second.get(&store, &target), Some(2));
    }

    #[test]
    fn equal_values_are_distinct_targets() {
        let store = Extrinsics::new();
        let channel: Data<u32, String> = Data::declare("per-node");
        let a = "same".to_string();
        let b = "same".to_string();
        assert_eq!(a, b);
        channel.set(&store, &a, 1);
        assert_eq!(channel.get(&store, &a), Some(1));
        assert_eq!(channel.get(&store, &b), None);
    }

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn count_up(_: &Extrinsics, _: &String) -> usize {
        CALLS.fetch_add(1, Ordering::SeqCst) + 1
    }

    #[test]
    fn or_else_computes_at_most_once_per_target() {
        let store = Extrinsics::new();
        let memo = Data::<usize, String>::declare("computed once").or_else(count_up);
        let first = "first".to_string();
        let second = "second".to_string();

        let a = memo.get(&store, &first);
        let b = memo.get(&store, &first);
        let c = memo.get(&store, &first);
        assert_eq!(a, b);
        assert_eq!(b, c);

        let d = memo.get(&store, &second);
        assert_ne!(a, d);
        assert_eq!(d, memo.get(&store, &second));
    }

    #[test]
    fn memo_update_initializes_then_mutates_in_place() {
        fn empty(_: &Extrinsics, _: &String) -> Vec<u32> {
            Vec::new()
        }

        let store = Extrinsics::new();
        let memo = Data::<Vec<u32>, String>::declare("list").or_else(empty);
        let target = "doc".to_string();
        memo.update(&store, &target, |list| list.push(1));
        memo.update(&store, &target, |list| list.push(2));
        assert_eq!(memo.get(&store, &target), vec![1, 2]);
    }

    #[test]
    fn force_set_overwrites_memoized_values() {
        fn zero(_: &Extrinsics, _: &String) -> u32 {
            0
        }

        let store = Extrinsics::new();
        let memo = Data::<u32, String>::declare("overwritten").or_else(zero);
        let target = "doc".to_string();
        assert_eq!(memo.get(&store, &target), 0);
        memo.data().set(&store, &target, 42);
        assert_eq!(memo.get(&store, &target), 42);
    }

    #[test]
    fn raw_target_ids_address_the_same_cells() {
        let store = Extrinsics::new();
        let channel: Data<u32, String> = Data::declare("raw");
        let target = "doc".to_string();
        channel.set(&store, &target, 9);
        assert_eq!(channel.get_at(&store, TargetId::of(&target)), Some(9));
    }
}
