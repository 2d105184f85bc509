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

//! The facade's own error type, composed from each crate's own enum.

/// Everything this facade can fail with synchronously.
///
/// Coroutine/submission failures never appear here — they travel as
/// [`coro_core::FinalValue::Err`] payloads and are the caller's concern, not
/// the facade's.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CoroError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Scheduler(#[from] coro_core::SchedulerError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Bus(#[from] coro_bus::BusError),
}
