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

//! Reference subsystems that plug into [`coro_bus::Bus`].
//!
//! These are the two subsystems the scheduler's own tests and examples lean
//! on: [`Echo`], which does nothing but hand back what it was given, and
//! [`Function`], which runs an arbitrary thunk on a worker thread. Neither
//! is required by `coro_core` itself — any [`coro_bus::Subsystem`]
//! implementation plugs into the same bus.

mod config;
mod echo;
mod function;

pub use config::Config;
pub use echo::Echo;
pub use function::Function;
