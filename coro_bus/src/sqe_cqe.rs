/*
 *   Copyright (c) 2022 R3BL LLC
 *   All rights reserved.
 *
 *   Licensed under the Apache License, Version 2.0 (the "License");
 *   you may not use this file except in compliance with the License.
 *   You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 *   Unless required by applicable law or agreed to in writing, software
 *   distributed under the License is distributed on an "AS IS" BASIS,
 *   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *   See the License for the specific language governing permissions and
 *   limitations under the License.
 */

//! Submission/completion queue entries and the subsystem contract.

use crate::{any::AnyError, submission::{Completion, Kind, Submission}};

/// Result carried by a [`Cqe`]: the completed value, or why it failed.
pub type CompletionResult = Result<Completion, AnyError>;

/// A Submission Queue Entry.
///
/// Carries only the originating IPC's id, not a callback closure: the
/// scheduler is the sole interpreter of completions, so the bus and its
/// subsystems need only ferry an id and a typed payload across thread
/// boundaries, never a closure that reaches back into scheduler-owned state.
pub struct Sqe {
    pub id: u64,
    pub value: Submission,
}

impl Sqe {
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.value.kind()
    }
}

/// A Completion Queue Entry: the originating IPC's id plus the outcome.
pub struct Cqe {
    pub id: u64,
    pub value: CompletionResult,
}

/// What the bus requires of every pluggable I/O subsystem.
///
/// `enqueue`/`process` are split so the same subsystem can be driven either by
/// its own worker threads (via `enqueue` + an internal loop calling `process`)
/// or synchronously by a deterministic test driver (calling `process`
/// directly, bypassing the worker queue entirely).
pub trait Subsystem: Send {
    /// The kind string this subsystem is registered and routed under.
    fn kind(&self) -> Kind;

    /// The bound on this subsystem's own input queue.
    fn size(&self) -> usize;

    /// Spin up worker threads.
    fn start(&mut self);

    /// Signal workers to drain and exit, then join them.
    fn stop(&mut self);

    /// A tick signal; reference subsystems ignore it (they have no internal
    /// clock), but the contract exists for subsystems that batch on a timer.
    fn flush(&mut self, time: i64);

    /// Attempt to enqueue `sqe` onto this subsystem's own bounded queue.
    /// Non-blocking; on a full queue, hands `sqe` back so the caller can
    /// surface a "queue full" error for its originating IPC.
    fn enqueue(&self, sqe: Sqe) -> Result<(), Sqe>;

    /// Synchronously process a batch of submissions into completions. Used by
    /// worker threads and by the deterministic driver alike.
    fn process(&self, sqes: Vec<Sqe>) -> Vec<Cqe>;
}
