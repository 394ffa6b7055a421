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

//! Bounded, blocking FIFO handing accepted connections from the dispatcher to the worker pool.
//!
//! The queue's capacity equals the worker count: once every worker is busy and the queue is
//! full, `push` blocks the dispatcher, which in turn stops calling `accept()`, which is the
//! backpressure mechanism described in §4.F/§5 of the spec. `crossbeam_channel`'s bounded channel
//! already provides exactly this push/pop-blocks contract, so `JobQueue` is a thin named wrapper
//! rather than a hand-rolled mutex/condvar queue.

use crossbeam_channel::{Receiver, Sender};

/// One accepted, connected socket, owned by the queue until a worker pops it.
pub type Job = std::net::TcpStream;

/// Producer half of the queue, held by the dispatcher's accept loop.
#[derive(Debug, Clone)]
pub struct JobSender(Sender<Job>);

/// Consumer half of the queue, cloned into every worker thread.
#[derive(Debug, Clone)]
pub struct JobReceiver(Receiver<Job>);

/// Creates a bounded queue of the given capacity, returning its producer and consumer halves.
pub fn bounded(capacity: usize) -> (JobSender, JobReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (JobSender(tx), JobReceiver(rx))
}

impl JobSender {
    /// Blocks until there is room in the queue, then enqueues `job`.
    ///
    /// Returns an error only if every worker has exited (the receiver half was dropped), which
    /// cannot happen in normal operation since workers loop forever.
    pub fn push(&self, job: Job) -> Result<(), Job> {
        self.0.send(job).map_err(|e| e.into_inner())
    }
}

impl JobReceiver {
    /// Blocks until a job is available, then dequeues it.
    ///
    /// Returns `None` only once the dispatcher has dropped its sender, which signals workers to
    /// exit their loop.
    pub fn pop(&self) -> Option<Job> {
        self.0.recv().ok()
    }
}
