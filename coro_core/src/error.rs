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

//! Errors the scheduler surfaces synchronously to a caller.

/// Conditions the scheduler reports directly, as opposed to delivering
/// through a coroutine's own final value (see [`crate::coroutine::FinalValue`]
/// for those).
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum SchedulerError {
    /// `add` was called while the admission queue was at capacity.
    #[error("admission queue full (capacity {capacity})")]
    #[diagnostic(
        code(coro::scheduler::admission_queue_full),
        help("raise the scheduler's admission queue size, or apply backpressure upstream")
    )]
    AdmissionQueueFull { capacity: usize },

    /// `add` was called after `shutdown()`.
    #[error("scheduler is shutting down")]
    #[diagnostic(
        code(coro::scheduler::shutting_down),
        help("no further computations are accepted once shutdown has started")
    )]
    ShuttingDown,
}
