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

//! Monotonic id spaces replacing the source's identity-keyed maps.
//!
//! Promise↔IPC and IPC↔external-future mappings there rely on object
//! identity. Here every IPC and every promise gets a `u64` minted from its
//! own per-scheduler counter, and the maps key on those ids: an arena +
//! index pattern with no cyclic strong references.

/// Identifies one in-process computation inside a [`crate::Scheduler`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpcId(pub(crate) u64);

/// Mints strictly increasing ids from a single counter.
#[derive(Debug, Default)]
pub struct IdSource(u64);

impl IdSource {
    pub fn next(&mut self) -> u64 {
        let id = self.0;
        self.0 += 1;
        id
    }
}
