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

//! Cooperative, single-threaded coroutine scheduler.
//!
//! Drives user-supplied [`Coroutine`]s through an explicit resume protocol,
//! mediating promise creation/resolution and I/O submission via a
//! [`coro_bus::Bus`]. See [`Scheduler`] for the public entry point.

mod coroutine;
mod error;
mod handle;
mod ids;
mod ipc;
mod scheduler;

pub use coroutine::{Computation, Coroutine, FinalValue, PromiseHandle, Resume, Step, Yielded};
pub use error::SchedulerError;
pub use handle::Handle;
pub use scheduler::{Config, Scheduler};
