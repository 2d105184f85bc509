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

//! Wires a [`coro_core::Scheduler`] to a real, worker-thread-backed bus with
//! the two reference subsystems attached.
//!
//! This is wiring, not a driver loop: the embedding application still owns
//! calling `run_until_blocked`/`tick`/`shutdown` on whatever schedule it
//! likes. Nothing here loops on its own.

use coro_bus::{AioSystem, Bus};
use coro_subsystems::{Echo, Function};

use crate::error::CoroError;

/// Tunables for [`build`]. Each field mirrors a `Config` one layer down;
/// nothing here is loaded from a file or environment variable.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub scheduler: coro_core::Config,
    pub bus_size: usize,
    pub echo: coro_subsystems::Config,
    pub function: coro_subsystems::Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheduler: coro_core::Config::default(),
            bus_size: 100,
            echo: coro_subsystems::Config::default(),
            function: coro_subsystems::Config::default(),
        }
    }
}

/// Builds a [`coro_core::Scheduler`] over an [`AioSystem`] with the echo and
/// function subsystems attached, and starts the bus's worker threads.
///
/// # Errors
///
/// Returns an error if either subsystem's own bound exceeds `config.bus_size`.
pub fn build(config: &Config) -> Result<coro_core::Scheduler, CoroError> {
    let mut system = AioSystem::new(config.bus_size);
    let sink = system.completion_sink();
    system.attach_subsystem(Box::new(Echo::new(config.echo, sink.clone())))?;
    system.attach_subsystem(Box::new(Function::new(config.function, sink)))?;

    let mut bus: Box<dyn Bus> = Box::new(system);
    bus.start();

    Ok(coro_core::Scheduler::new(bus, config.scheduler))
}
