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

//! The explicit resume protocol that stands in for a host generator.
//!
//! The source drives user coroutines with a language generator's
//! `send`/`throw`/`StopIteration` protocol. There is no such protocol here:
//! a [`Coroutine`] is a hand-written, restartable state machine that the
//! scheduler polls by calling [`Coroutine::resume`] with the outcome of
//! whatever it last yielded.

use coro_bus::{AnyError, AnyValue, Submission};

/// The value fed into a coroutine's next transition.
///
/// Mirrors the shapes an IPC's `next` field can hold: nothing (first
/// resumption), a plain value, the handle just produced by spawning a child
/// or dispatching a submission, an error propagated from a failed awaitee, or
/// the current logical time answering a `Now` yield.
pub enum Resume {
    Start,
    Value(AnyValue),
    Promise(PromiseHandle),
    Error(AnyError),
    Time(i64),
}

/// An opaque token identifying a pending computation.
///
/// Distinguished by identity (its id), never by content. Minted by the
/// scheduler when a child computation or submission is created; consumed the
/// moment it is awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PromiseHandle(pub(crate) u64);

/// Everything a coroutine may yield.
pub enum Yielded {
    /// Spawn a nested coroutine.
    Child(Box<dyn Coroutine>),
    /// Suspend until the referenced computation/submission has a final value.
    Await(PromiseHandle),
    /// Dispatch an I/O request.
    Submit(Submission),
    /// Ask for the current logical time.
    Now,
}

/// The terminal outcome of a computation: a success value or an error.
pub type FinalValue = Result<AnyValue, AnyError>;

impl From<FinalValue> for Resume {
    /// Feeds a resolved blocker's outcome back into its waiter: a success
    /// value resumes normally, a failure resumes via `Error` so the waiting
    /// coroutine can catch it around the `Await`.
    fn from(fv: FinalValue) -> Self {
        match fv {
            Ok(v) => Resume::Value(v),
            Err(e) => Resume::Error(e),
        }
    }
}

/// The outcome of one coroutine transition.
pub enum Step {
    Yielded(Yielded),
    Finished(FinalValue),
}

/// A restartable, resumable computation with internal suspension points.
///
/// Implementations drive their own state across calls to `resume`; the
/// scheduler never inspects or stores state beyond what `resume` returns.
pub trait Coroutine: Send {
    fn resume(&mut self, resume: Resume) -> Step;
}

/// What the scheduler admits and schedules: either a coroutine, or a bare
/// unit of work with no internal suspension points (a thunk/submission
/// dispatched directly, with no yields of its own).
pub enum Computation {
    Coroutine(Box<dyn Coroutine>),
    BareWork(Submission),
}

impl Computation {
    #[must_use]
    pub fn coroutine(c: impl Coroutine + 'static) -> Self {
        Computation::Coroutine(Box::new(c))
    }

    #[must_use]
    pub fn bare_work(submission: Submission) -> Self {
        Computation::BareWork(submission)
    }
}
