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

//! Error taxonomy for the bus surface.

/// Errors the bus surfaces synchronously to a caller (never to a subsystem).
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum BusError {
    /// A subsystem's own bounded queue was full when `dispatch` tried to enqueue.
    #[error("submission queue full for subsystem {kind}")]
    #[diagnostic(
        code(coro::bus::submission_queue_full),
        help("the {kind} subsystem's queue is saturated; slow down submissions or raise its configured size")
    )]
    SubmissionQueueFull { kind: &'static str },

    /// `dispatch` named a kind with no attached subsystem.
    #[error("no subsystem attached for kind {kind}")]
    #[diagnostic(code(coro::bus::unknown_subsystem))]
    UnknownSubsystem { kind: &'static str },

    /// An operation was attempted after `shutdown()`.
    #[error("bus is shutting down")]
    #[diagnostic(
        code(coro::bus::shutting_down),
        help("no further submissions are accepted once shutdown has started")
    )]
    ShuttingDown,

    /// Two subsystems registered the same kind.
    #[error("subsystem {kind} is already registered")]
    #[diagnostic(code(coro::bus::duplicate_subsystem))]
    DuplicateSubsystem { kind: &'static str },

    /// A subsystem's bounded size exceeds the bus's own completion-queue size.
    #[error("subsystem {kind} size {subsystem_size} exceeds bus completion queue size {bus_size}")]
    #[diagnostic(code(coro::bus::subsystem_too_large))]
    SubsystemTooLarge {
        kind: &'static str,
        subsystem_size: usize,
        bus_size: usize,
    },
}
