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

//! The external awaitable returned by [`crate::Scheduler::add`].

use std::{sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, sync_channel}, time::Duration};

use crate::coroutine::FinalValue;

/// Sink the scheduler resolves exactly once when an admitted computation's
/// final value is set.
pub(crate) struct ExternalFuture(SyncSender<FinalValue>);

impl ExternalFuture {
    pub(crate) fn resolve(self, value: FinalValue) {
        // The receiving `Handle` may already have been dropped by a caller
        // that gave up waiting; there is nothing to do about that here.
        let _ = self.0.send(value);
    }
}

/// An external caller's awaitable for a computation admitted via `add`.
#[must_use]
pub struct Handle(Receiver<FinalValue>);

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle").finish_non_exhaustive()
    }
}

impl Handle {
    pub(crate) fn new_pair() -> (ExternalFuture, Self) {
        let (tx, rx) = sync_channel(1);
        (ExternalFuture(tx), Handle(rx))
    }

    /// Blocks up to `timeout` for the final value.
    pub fn result(&self, timeout: Duration) -> Result<FinalValue, RecvTimeoutError> {
        self.0.recv_timeout(timeout)
    }

    /// Blocks indefinitely for the final value.
    ///
    /// # Panics
    ///
    /// Panics if the scheduler was dropped without ever resolving this
    /// handle (a programming error: every admitted IPC is guaranteed exactly
    /// one resolution).
    pub fn result_blocking(&self) -> FinalValue {
        self.0.recv().expect("scheduler dropped without resolving this handle")
    }
}
