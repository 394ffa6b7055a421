// Copyright 2022 Ryan Seipp
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A reader/writer lock with a choice of fairness policy.
//!
//! `std::sync::RwLock` makes no fairness guarantees between readers and writers, which is exactly
//! the knob this server needs to turn: per-URI contention must alternate fairly between `GET`
//! readers and `PUT` writers rather than let either side starve the other. This module
//! reimplements the lock directly on a [`Mutex`] + [`Condvar`] so the admission policy is
//! explicit and testable.

use std::sync::{Condvar, Mutex};

/// Fairness policy governing admission when both readers and a writer are contending.
#[derive(Debug, Clone, Copy)]
pub enum Policy {
    /// Readers are admitted whenever no writer holds the lock; writers wait out any reader
    /// activity, so sustained read load can starve writers indefinitely.
    ReadersPreferred,
    /// A reader waits if any writer is waiting; writers are admitted as soon as the last active
    /// reader releases, so sustained write load can starve readers indefinitely.
    WritersPreferred,
    /// Caps consecutive reader admissions at `n` while a writer is waiting. Once `n` readers
    /// have been let in since the last writer released, the next admission goes to the writer
    /// if one is waiting, and the counter resets. With `n == 1`, readers and writers strictly
    /// alternate under contention.
    NWay(u32),
}

#[derive(Debug, Default)]
struct State {
    active_readers: u32,
    active_writer: bool,
    waiting_writers: u32,
    /// Consecutive reader admissions since a writer last ran, used by [`Policy::NWay`].
    readers_since_writer: u32,
}

/// A reader/writer lock protecting no data of its own — callers already hold the resource (here,
/// a filesystem path) and use this purely to serialize access to it.
///
/// Unlike `std::sync::RwLock<T>`, this type does not wrap a value: the invariant it enforces is
/// about *access*, not about a guarded payload, and the caller's critical section is arbitrary
/// I/O rather than a borrow of `T`. Acquire/release are explicit so the admission bookkeeping in
/// [`State`] stays a single, auditable state machine rather than being smeared across a guard's
/// `Drop` for every policy.
#[derive(Debug)]
pub struct RwLock {
    policy: Policy,
    state: Mutex<State>,
    condvar: Condvar,
}

impl RwLock {
    /// Creates a new lock under the given fairness policy.
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            state: Mutex::new(State::default()),
            condvar: Condvar::new(),
        }
    }

    /// Blocks until a reader may enter, then marks one as active.
    pub fn reader_lock(&self) {
        let mut state = self.state.lock().unwrap();
        loop {
            if self.reader_may_enter(&state) {
                state.active_readers += 1;
                state.readers_since_writer += 1;
                return;
            }
            state = self.condvar.wait(state).unwrap();
        }
    }

    /// Releases a previously acquired reader admission.
    ///
    /// Must be called exactly once per successful [`RwLock::reader_lock`] call; calling it
    /// without a matching acquisition corrupts the reader count for every subsequent caller.
    pub fn reader_unlock(&self) {
        let mut state = self.state.lock().unwrap();
        debug_assert!(state.active_readers > 0, "reader_unlock without a matching reader_lock");
        state.active_readers = state.active_readers.saturating_sub(1);
        if state.active_readers == 0 {
            self.condvar.notify_all();
        }
    }

    /// Blocks until the writer may enter, then marks it active.
    pub fn writer_lock(&self) {
        let mut state = self.state.lock().unwrap();
        state.waiting_writers += 1;
        loop {
            if state.active_readers == 0 && !state.active_writer {
                state.waiting_writers -= 1;
                state.active_writer = true;
                state.readers_since_writer = 0;
                return;
            }
            state = self.condvar.wait(state).unwrap();
        }
    }

    /// Releases a previously acquired writer admission.
    ///
    /// Must be called exactly once per successful [`RwLock::writer_lock`] call.
    pub fn writer_unlock(&self) {
        let mut state = self.state.lock().unwrap();
        debug_assert!(state.active_writer, "writer_unlock without a matching writer_lock");
        state.active_writer = false;
        state.readers_since_writer = 0;
        self.condvar.notify_all();
    }

    fn reader_may_enter(&self, state: &State) -> bool {
        if state.active_writer {
            return false;
        }
        match self.policy {
            Policy::ReadersPreferred => true,
            Policy::WritersPreferred => state.waiting_writers == 0,
            Policy::NWay(n) => state.waiting_writers == 0 || state.readers_since_writer < n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn uncontended_reader_does_not_block() {
        let lock = RwLock::new(Policy::NWay(1));
        lock.reader_lock();
        lock.reader_unlock();
    }

    #[test]
    fn uncontended_writer_does_not_block() {
        let lock = RwLock::new(Policy::NWay(1));
        lock.writer_lock();
        lock.writer_unlock();
    }

    #[test]
    fn multiple_readers_run_concurrently() {
        let lock = Arc::new(RwLock::new(Policy::NWay(1)));
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_concurrent = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock = lock.clone();
                let concurrent = concurrent.clone();
                let max_concurrent = max_concurrent.clone();
                thread::spawn(move || {
                    lock.reader_lock();
                    let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                    max_concurrent.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    concurrent.fetch_sub(1, Ordering::SeqCst);
                    lock.reader_unlock();
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert!(max_concurrent.load(Ordering::SeqCst) > 1);
    }

    #[test]
    fn writer_excludes_readers_and_other_writers() {
        let lock = Arc::new(RwLock::new(Policy::NWay(1)));
        let active = Arc::new(AtomicUsize::new(0));
        let violations = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..6 {
            let lock = lock.clone();
            let active = active.clone();
            let violations = violations.clone();
            handles.push(thread::spawn(move || {
                if i % 2 == 0 {
                    lock.writer_lock();
                    if active.fetch_add(1, Ordering::SeqCst) != 0 {
                        violations.fetch_add(1, Ordering::SeqCst);
                    }
                    thread::sleep(Duration::from_millis(5));
                    active.fetch_sub(1, Ordering::SeqCst);
                    lock.writer_unlock();
                } else {
                    lock.reader_lock();
                    thread::sleep(Duration::from_millis(1));
                    lock.reader_unlock();
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(violations.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn n_way_one_alternates_strictly_under_contention() {
        // With N=1, a single waiting writer is admitted no later than the very next
        // admission after it starts waiting; readers cannot pile up indefinitely ahead of it.
        let lock = Arc::new(RwLock::new(Policy::NWay(1)));
        lock.reader_lock();

        let writer_lock = lock.clone();
        let writer_done = Arc::new(AtomicUsize::new(0));
        let writer_done_clone = writer_done.clone();
        let writer = thread::spawn(move || {
            writer_lock.writer_lock();
            writer_done_clone.store(1, Ordering::SeqCst);
            writer_lock.writer_unlock();
        });

        // give the writer time to register as waiting
        thread::sleep(Duration::from_millis(20));

        // A second reader must now be blocked behind the waiting writer (N=1).
        let second_reader_lock = lock.clone();
        let second_reader_entered = Arc::new(AtomicUsize::new(0));
        let second_reader_entered_clone = second_reader_entered.clone();
        let second_reader = thread::spawn(move || {
            second_reader_lock.reader_lock();
            second_reader_entered_clone.store(1, Ordering::SeqCst);
            second_reader_lock.reader_unlock();
        });

        thread::sleep(Duration::from_millis(20));
        assert_eq!(writer_done.load(Ordering::SeqCst), 0);
        assert_eq!(second_reader_entered.load(Ordering::SeqCst), 0);

        lock.reader_unlock();
        writer.join().unwrap();
        second_reader.join().unwrap();
        assert_eq!(writer_done.load(Ordering::SeqCst), 1);
        assert_eq!(second_reader_entered.load(Ordering::SeqCst), 1);
    }
}
