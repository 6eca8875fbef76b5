//! Refcounted handles with epoch-deferred reclamation.
//!
//! The safe subset of the RCU discipline the relay needs: objects live in
//! lookup tables as [`WeakLookup`] entries that can only be promoted back to
//! owning [`StrongRef`] handles while the object's count is non-zero. When
//! the last strong reference drops, the object is removed from every table
//! that publishes it, then its destructor is deferred past the current epoch
//! so concurrent readers never observe a half-torn-down entry.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

/// Runs `f` inside an epoch-read critical section.
///
/// Deferred destructors scheduled by concurrent releases cannot run while
/// any thread is inside such a section. Lookups that start from a
/// [`WeakLookup`] without an existing strong reference must happen here.
pub fn epoch_read<R>(f: impl FnOnce() -> R) -> R {
    let _guard = crossbeam::epoch::pin();
    f()
}

/// Best-effort drain of pending deferred destructors.
///
/// The collector only advances when threads pin the epoch; shutdown paths
/// and tests call this to give queued destructors a chance to run.
pub fn epoch_barrier() {
    for _ in 0..128 {
        crossbeam::epoch::pin().flush();
    }
}

/// Strong count embedded in every reclaimed object. Starts at one: the
/// creator's reference.
pub struct RefCount(AtomicUsize);

impl RefCount {
    pub fn new() -> Self {
        Self(AtomicUsize::new(1))
    }

    /// Increment-unless-zero. A zero count means teardown has begun and the
    /// object must be treated as absent.
    fn try_increment(&self) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                if count == 0 { None } else { Some(count + 1) }
            })
            .is_ok()
    }

    fn increment(&self) {
        let prev = self.0.fetch_add(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "refcount resurrected from zero");
    }

    /// Returns true when this decrement released the last reference.
    fn decrement(&self) -> bool {
        let prev = self.0.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "refcount underflow");
        prev == 1
    }

    pub fn load(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for RefCount {
    fn default() -> Self {
        Self::new()
    }
}

/// Implemented by objects whose lifetime is managed through
/// [`StrongRef`]/[`WeakLookup`] handles.
pub trait Reclaim: Send + Sync + 'static {
    fn refcount(&self) -> &RefCount;

    /// Removes the object from every lookup table that publishes it.
    ///
    /// Called exactly once, on the thread that dropped the last strong
    /// reference, before destruction is scheduled. Table entries must be
    /// matched by identity so a racing re-creation under the same key is
    /// left alone.
    fn unpublish(&self);
}

/// Owning handle. While any exists, the target is alive and fully usable.
pub struct StrongRef<T: Reclaim>(Arc<T>);

impl<T: Reclaim> StrongRef<T> {
    /// Takes ownership of a freshly constructed object. The embedded count
    /// must still be at its initial value of one.
    pub fn new(value: T) -> Self {
        debug_assert_eq!(value.refcount().load(), 1, "object was already shared");
        Self(Arc::new(value))
    }

    /// An uncounted table entry for this object.
    pub fn downgrade(this: &Self) -> WeakLookup<T> {
        WeakLookup(Arc::clone(&this.0))
    }
}

impl<T: Reclaim> Deref for StrongRef<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Reclaim> std::fmt::Debug for StrongRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StrongRef").field(&Arc::as_ptr(&self.0)).finish()
    }
}

impl<T: Reclaim> Clone for StrongRef<T> {
    fn clone(&self) -> Self {
        self.0.refcount().increment();
        Self(Arc::clone(&self.0))
    }
}

impl<T: Reclaim> Drop for StrongRef<T> {
    fn drop(&mut self) {
        if self.0.refcount().decrement() {
            self.0.unpublish();
            let last = Arc::clone(&self.0);
            // The payload drop is held off until every thread currently
            // inside epoch_read has left its critical section.
            crossbeam::epoch::pin().defer(move || drop(last));
        }
    }
}

/// Table entry: keeps the object's memory reachable without keeping the
/// object alive. Promotion back to a [`StrongRef`] fails once teardown of
/// the target has begun.
pub struct WeakLookup<T: Reclaim>(Arc<T>);

impl<T: Reclaim> WeakLookup<T> {
    /// Atomic increment-unless-zero. `None` means the object is vanishing
    /// and must be treated as absent.
    ///
    /// Callers that do not already hold a [`StrongRef`] to the target must
    /// call this inside [`epoch_read`].
    pub fn try_acquire(&self) -> Option<StrongRef<T>> {
        self.0
            .refcount()
            .try_increment()
            .then(|| StrongRef(Arc::clone(&self.0)))
    }

    /// Identity peek for table maintenance under the table's write lock.
    /// The target may already be vanishing; only identity fields (ids,
    /// keys) may be read through this.
    pub(crate) fn peek(&self) -> &T {
        &self.0
    }
}

impl<T: Reclaim> Clone for WeakLookup<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

/// Hash table of [`WeakLookup`] entries keyed by name or integer id.
///
/// Writers serialize through the table's write lock; readers go through
/// [`epoch_read`] plus `try_acquire`, so a lookup either yields a live
/// strong reference or reports the object absent.
pub struct LookupTable<K, T: Reclaim> {
    entries: RwLock<HashMap<K, WeakLookup<T>>>,
}

impl<K: Eq + Hash, T: Reclaim> LookupTable<K, T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Looks up `key` and promotes the entry. `None` covers both "no entry"
    /// and "entry is vanishing".
    pub fn get<Q>(&self, key: &Q) -> Option<StrongRef<T>>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        epoch_read(|| self.entries.read().get(key)?.try_acquire())
    }

    /// Publishes `candidate` under `key` unless a live entry already exists,
    /// in which case the existing object is acquired and returned and the
    /// candidate is left untouched for the caller to discard.
    ///
    /// A dead entry (vanishing, not yet unpublished) is displaced; identity
    /// matching in [`Reclaim::unpublish`] keeps the loser from removing the
    /// replacement.
    pub(crate) fn publish_or_acquire(&self, key: K, candidate: &StrongRef<T>) -> Option<StrongRef<T>> {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(&key)
            && let Some(winner) = existing.try_acquire()
        {
            return Some(winner);
        }
        entries.insert(key, StrongRef::downgrade(candidate));
        None
    }

    /// Removes the entry under `key` if `matches` accepts it. Used by
    /// `unpublish` implementations with an identity predicate.
    pub(crate) fn remove_if(&self, key: &K, matches: impl FnOnce(&T) -> bool) -> bool {
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| matches(entry.peek())) {
            entries.remove(key);
            true
        } else {
            false
        }
    }

    /// Strong references to every live entry, in no particular order.
    /// Vanishing entries are skipped.
    pub fn acquire_all(&self) -> Vec<StrongRef<T>> {
        epoch_read(|| {
            self.entries
                .read()
                .values()
                .filter_map(WeakLookup::try_acquire)
                .collect()
        })
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<K: Eq + Hash, T: Reclaim> Default for LookupTable<K, T> {
    fn default() -> Self {
        Self::new()
    }
}
