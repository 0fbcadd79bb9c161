// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use rustc_hash::FxHashMap;
use std::sync::{Arc, Condvar, Mutex};

/// On-demand table of reader/writer locks keyed by string.
///
/// Handles are not reference counted. [`LockGroup::delete`] retires the
/// table entry so the next [`LockGroup::open`] allocates a fresh primitive,
/// while guards acquired from the retired handle stay valid until released.
/// The controlling component deletes entries at an operation's natural
/// terminus to keep the table from growing without bound.
#[derive(Default)]
pub struct LockGroup {
    group: Mutex<FxHashMap<String, KeyedRwLock>>,
}

impl LockGroup {
    /// Returns the shared lock handle for `key`, allocating it on first use.
    ///
    /// Handles for the same key share the same primitive.
    pub fn open(&self, key: &str) -> KeyedRwLock {
        let mut group = self.group.lock().expect("lock is poisoned");
        group.entry(key.into()).or_default().clone()
    }

    /// Retires the handle for `key`.
    pub fn delete(&self, key: &str) {
        let mut group = self.group.lock().expect("lock is poisoned");
        group.remove(key);
    }
}

/// A reader/writer lock whose guards can be released on another thread.
///
/// Built on `Mutex` + `Condvar` instead of `std::sync::RwLock` because the
/// guards must travel across threads (a tee acquires on the caller thread
/// and releases wherever the consumer is closed).
///
/// Acquisition is serialized through a mode-switch mutex at the acquire
/// boundary only; concurrent readers proceed in parallel once past it.
#[derive(Clone, Default)]
pub struct KeyedRwLock(Arc<LockInner>);

#[derive(Default)]
struct LockInner {
    state: Mutex<LockState>,
    cond: Condvar,
    switch: Mutex<()>,
}

#[derive(Default)]
struct LockState {
    readers: usize,
    writer: bool,
}

impl KeyedRwLock {
    /// Acquires the lock in shared (`true`) or exclusive (`false`) mode.
    ///
    /// Blocks until the requested mode is admissible.
    pub fn lock(&self, shared: bool) -> LockGuard {
        let _switch = self.0.switch.lock().expect("lock is poisoned");
        let mut state = self.0.state.lock().expect("lock is poisoned");

        if shared {
            while state.writer {
                state = self.0.cond.wait(state).expect("lock is poisoned");
            }
            state.readers += 1;
        } else {
            while state.writer || state.readers > 0 {
                state = self.0.cond.wait(state).expect("lock is poisoned");
            }
            state.writer = true;
        }

        LockGuard {
            lock: self.clone(),
            shared,
            released: false,
        }
    }

    /// Non-blocking variant of [`KeyedRwLock::lock`].
    pub fn try_lock(&self, shared: bool) -> Option<LockGuard> {
        let _switch = self.0.switch.try_lock().ok()?;
        let mut state = self.0.state.lock().expect("lock is poisoned");

        if state.writer || (!shared && state.readers > 0) {
            return None;
        }

        if shared {
            state.readers += 1;
        } else {
            state.writer = true;
        }

        Some(LockGuard {
            lock: self.clone(),
            shared,
            released: false,
        })
    }

    fn unlock(&self, shared: bool) {
        {
            let mut state = self.0.state.lock().expect("lock is poisoned");

            if shared {
                debug_assert!(state.readers > 0, "reader count underflow");
                state.readers = state.readers.saturating_sub(1);
            } else {
                debug_assert!(state.writer, "writer flag already cleared");
                state.writer = false;
            }
        }
        self.0.cond.notify_all();
    }
}

/// Guard for one acquisition of a [`KeyedRwLock`].
///
/// Dropping the guard releases the lock as well.
pub struct LockGuard {
    lock: KeyedRwLock,
    shared: bool,
    released: bool,
}

impl LockGuard {
    /// Releases the held mode.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if !self.released {
            self.released = true;
            self.lock.unlock(self.shared);
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.release_inner();
    }
}
