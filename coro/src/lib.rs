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

//! Facade over `coro_core`, `coro_bus`, and `coro_subsystems`: re-exports the
//! pieces an embedding application needs and wires them together for the
//! common case of a real, worker-thread-backed bus.

mod error;
mod runtime;

pub use coro_bus::{AioDst, AioSystem, AnyError, AnyValue, Bus, BusError, Completion,
                    CompletionResult, CompletionSink, Cqe, EchoCompletion, EchoSubmission,
                    FunctionCompletion, FunctionSubmission, Kind, SimulatedFailure, Sqe,
                    Submission, Subsystem};
pub use coro_core::{Computation, Coroutine, FinalValue, Handle, PromiseHandle, Resume,
                     Scheduler, SchedulerError, Step, Yielded};
pub use coro_subsystems::{Echo, Function};
pub use error::CoroError;
pub use runtime::{build, Config};
