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

//! Submission/completion bus: a bounded, thread-safe conduit between the
//! scheduler and pluggable I/O subsystems.
//!
//! Two bus implementations share the [`Subsystem`] contract:
//! - [`AioSystem`] dispatches to real worker threads and is used in production.
//! - [`AioDst`] processes synchronously under a seeded PRNG, injecting
//!   deterministic failures, for reproducible scheduler tests.

pub mod any;
mod bus;
mod dst;
mod error;
mod iface;
mod sqe_cqe;
mod submission;

pub use any::{AnyError, AnyValue};
pub use bus::{AioSystem, CompletionSink};
pub use dst::{AioDst, SimulatedFailure};
pub use error::BusError;
pub use iface::Bus;
pub use sqe_cqe::{CompletionResult, Cqe, Sqe, Subsystem};
pub use submission::{Completion, EchoCompletion, EchoSubmission, FunctionCompletion,
                      FunctionSubmission, Kind, Submission};
