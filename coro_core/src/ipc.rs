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

//! The in-process computation record: the scheduler's unit of bookkeeping.

use crate::{coroutine::{Coroutine, FinalValue, PromiseHandle, Resume},
            handle::ExternalFuture};

/// One live computation inside a [`crate::Scheduler`]'s arena.
///
/// Mirrors the IPC attributes: a body, the value to feed into its next
/// resumption, an optional published final value, the stack of promises it
/// has spawned but not yet awaited (drained after it returns), and an
/// optional sink for an external caller's [`crate::Handle`].
///
/// `body` is `None` for a *leaf*: an admitted bare work unit, or a submission
/// dispatched on a coroutine's behalf. A leaf never resumes; it exists only
/// so the promise/awaiting machinery has somewhere to record its eventual
/// completion.
pub(crate) struct Ipc {
    pub(crate) body: Option<Box<dyn Coroutine>>,
    pub(crate) next: Resume,
    /// The coroutine's own outcome, recorded the moment it stops running but
    /// not yet visible to awaiters until `pending` has fully drained.
    pub(crate) own_final: Option<FinalValue>,
    /// Published outcome: what an `Await` of this IPC's promise actually sees.
    pub(crate) final_value: Option<FinalValue>,
    pub(crate) pending: Vec<PromiseHandle>,
    pub(crate) external_future: Option<ExternalFuture>,
}

impl Ipc {
    pub(crate) fn coroutine(body: Box<dyn Coroutine>) -> Self {
        Self {
            body: Some(body),
            next: Resume::Start,
            own_final: None,
            final_value: None,
            pending: Vec::new(),
            external_future: None,
        }
    }

    pub(crate) fn leaf() -> Self {
        Self {
            body: None,
            next: Resume::Start,
            own_final: None,
            final_value: None,
            pending: Vec::new(),
            external_future: None,
        }
    }

    pub(crate) fn with_external_future(mut self, future: ExternalFuture) -> Self {
        self.external_future = Some(future);
        self
    }
}
