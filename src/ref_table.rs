// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{BlobId, Error};
use crossbeam_skiplist::SkipMap;
use std::sync::{
    atomic::{
        AtomicU64,
        Ordering::{AcqRel, Acquire},
    },
    RwLock,
};

/// In-memory reference counts per blob id.
///
/// An entry exists iff the blob file is known to exist on disk (or was just
/// created); an entry with count 0 is eligible for garbage collection.
///
/// Counts live in a concurrent skip map and are adjusted with
/// compare-and-swap loops, so `link`/`unlink` never observe a torn count.
/// The internal latch is held shared by all count mutations and exclusively
/// by [`RefTable::gc`], which makes the sweep mutually exclusive with them.
#[derive(Default)]
pub struct RefTable {
    counts: SkipMap<BlobId, AtomicU64>,
    latch: RwLock<()>,
}

impl RefTable {
    /// Registers `id` with a zero count. No effect if already present.
    pub fn init(&self, id: &str) {
        let _latch = self.latch.read().expect("lock is poisoned");

        if self.counts.get(id).is_none() {
            self.counts.get_or_insert(id.into(), AtomicU64::new(0));
        }
    }

    /// Increments the refcount of `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is not registered.
    pub fn link(&self, id: &str) -> crate::Result<()> {
        let _latch = self.latch.read().expect("lock is poisoned");

        let entry = self.counts.get(id).ok_or(Error::NotFound)?;
        entry.value().fetch_add(1, AcqRel);

        Ok(())
    }

    /// Decrements the refcount of `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is not registered and
    /// `RefcountUnderflow` if the count is already zero.
    pub fn unlink(&self, id: &str) -> crate::Result<()> {
        let _latch = self.latch.read().expect("lock is poisoned");

        let entry = self.counts.get(id).ok_or(Error::NotFound)?;
        entry
            .value()
            .fetch_update(AcqRel, Acquire, |count| count.checked_sub(1))
            .map_err(|_| Error::RefcountUnderflow(id.into()))?;

        Ok(())
    }

    /// Drops the entry for `id`, used after the physical file is gone.
    pub fn delete(&self, id: &str) {
        let _latch = self.latch.read().expect("lock is poisoned");
        self.counts.remove(id);
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn exists(&self, id: &str) -> bool {
        let _latch = self.latch.read().expect("lock is poisoned");
        self.counts.get(id).is_some()
    }

    /// Number of registered blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no blob is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sweeps all ids whose count is zero.
    ///
    /// Runs under the exclusive latch, excluding every count mutation for
    /// the duration. For each zero-count id in the snapshot, `sweep` is
    /// invoked; on success the entry is removed. The first sweep failure
    /// short-circuits, retaining the failing id (and everything after it)
    /// for the next pass.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `sweep`.
    pub fn gc<F: FnMut(&str) -> crate::Result<()>>(&self, mut sweep: F) -> crate::Result<()> {
        let _latch = self.latch.write().expect("lock is poisoned");

        let dead = self
            .counts
            .iter()
            .filter(|entry| entry.value().load(Acquire) == 0)
            .map(|entry| entry.key().clone())
            .collect::<Vec<_>>();

        for id in dead {
            sweep(&id)?;
            self.counts.remove(&id);
        }

        Ok(())
    }
}
