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

//! Maps each URI ever touched by this server to a stable, dedicated [`RwLock`].
//!
//! The original source keeps this as a doubly-linked list walked linearly on every lookup; a hash
//! map keyed by URI gives the same external contract (one lock per URI, created on first touch,
//! never evicted) with O(1) average lookup instead. Entries are never removed: lock identity must
//! outlive any single request, since a handler may still be holding the `Arc` after the registry
//! has handed out a new reference to a different caller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::rwlock::{Policy, RwLock};

/// `N` for the `N-way` fairness policy every per-URI lock is created with.
///
/// `N = 1` makes readers and writers strictly alternate under contention, the strongest
/// starvation-freedom guarantee the policy can express (§8, property 3).
const N_WAY: u32 = 1;

/// Registry of per-URI locks, shared by every worker thread.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<String, Arc<RwLock>>>,
}

impl LockRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for `uri`, creating it if this is the first time `uri` has been seen.
    ///
    /// The registry's mutex is held only for the duration of the lookup/insert; it is released
    /// before this function returns, so the caller's subsequent `reader_lock`/`writer_lock` on the
    /// returned `Arc` never happens while the registry mutex is held. This ordering — registry
    /// mutex, then per-URI lock, never the reverse — is what rules out deadlock between the two
    /// and lets unrelated URIs proceed fully in parallel.
    pub fn find_or_create(&self, uri: &str) -> Arc<RwLock> {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry(uri.to_owned())
            .or_insert_with(|| Arc::new(RwLock::new(Policy::NWay(N_WAY))))
            .clone()
    }
}
