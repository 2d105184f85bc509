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

//! Tunables shared by every reference subsystem.

/// Bounds a subsystem's own input queue and worker pool.
///
/// Every subsystem in this crate takes one of these; the bus and scheduler
/// take their own differently-shaped configs, but follow the same plain
/// struct, no-builtin-loader convention.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Capacity of the subsystem's bounded input queue.
    pub queue_size: usize,
    /// Number of worker threads pulling from that queue.
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { queue_size: 100, workers: 1 }
    }
}
