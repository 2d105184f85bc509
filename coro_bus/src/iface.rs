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

//! The bus surface the scheduler drives, shared by the real, threaded
//! [`crate::AioSystem`] and the deterministic [`crate::AioDst`].

use crate::{error::BusError, sqe_cqe::{Cqe, Sqe}};

pub trait Bus: Send {
    fn start(&mut self);
    fn stop(&mut self);
    fn flush(&mut self, time: i64);
    fn dispatch(&mut self, sqe: Sqe) -> Result<(), BusError>;
    #[must_use]
    fn dequeue(&mut self, n: usize) -> Vec<Cqe>;
    fn shutdown(&mut self);
}
