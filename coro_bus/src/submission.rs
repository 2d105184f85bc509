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

//! Submission/completion value model — the "wire" of the bus.
//!
//! There is no persisted wire format here, only a closed tagged union routed by
//! a short `kind` string. [`Submission`] and [`Completion`] are closed sums
//! rather than an open trait-object plugin surface: the two reference
//! subsystems (echo, function) are the entire in-scope "wire", and a closed
//! `match` at the bus's dispatch site is cheaper and more obviously exhaustive
//! than downcasting a `dyn Any` at every hop.

use crate::any::AnyValue;

/// A string identifying which subsystem a submission/completion belongs to.
pub type Kind = &'static str;

/// An echo submission: the payload to be echoed back.
#[derive(Debug, Clone)]
pub struct EchoSubmission {
    pub data: String,
}

/// An echo completion: the payload that was echoed.
#[derive(Debug, Clone)]
pub struct EchoCompletion {
    pub data: String,
}

/// A zero-argument callable dispatched to the function subsystem.
///
/// Boxed as `FnOnce` since a submission is consumed exactly once by whichever
/// worker thread picks it up.
pub struct FunctionSubmission {
    pub f: Box<dyn FnOnce() -> Result<AnyValue, crate::any::AnyError> + Send>,
}

impl std::fmt::Debug for FunctionSubmission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionSubmission").finish_non_exhaustive()
    }
}

/// A function completion: the thunk's return value, type-erased.
#[derive(Debug, Clone)]
pub struct FunctionCompletion {
    pub value: AnyValue,
}

/// Everything a coroutine may submit to the bus.
#[derive(Debug)]
pub enum Submission {
    Echo(EchoSubmission),
    Function(FunctionSubmission),
}

impl Submission {
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Submission::Echo(_) => "echo",
            Submission::Function(_) => "function",
        }
    }
}

/// Everything a subsystem may complete a submission with.
#[derive(Debug, Clone)]
pub enum Completion {
    Echo(EchoCompletion),
    Function(FunctionCompletion),
}

impl Completion {
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Completion::Echo(_) => "echo",
            Completion::Function(_) => "function",
        }
    }
}
