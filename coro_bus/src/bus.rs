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

//! The real, worker-thread-backed bus: [`AioSystem`].

use std::{collections::HashMap,
          sync::{mpsc::{Receiver, SyncSender, sync_channel},
                 Mutex}};

use tracing::{debug, info, warn};

use crate::{error::BusError,
            iface::Bus,
            sqe_cqe::{Cqe, Sqe, Subsystem},
            submission::Kind};

/// A cloneable handle subsystem worker threads use to push completions back
/// onto the bus's completion queue. Handed out by [`AioSystem::completion_sink`]
/// at wiring time, so subsystems never hold a reference to the bus itself.
#[derive(Clone)]
pub struct CompletionSink(SyncSender<Cqe>);

impl CompletionSink {
    /// Pushes a completion. Blocks if the bus's completion queue is full,
    /// mirroring the upstream queue's blocking `put`.
    pub fn push(&self, cqe: Cqe) {
        // A send error means the bus was dropped; there is no one left to
        // observe the completion, so there is nothing more useful to do than
        // drop it silently (the scheduler that owned this IPC is gone too).
        let _ = self.0.send(cqe);
    }
}

impl std::fmt::Debug for CompletionSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionSink").finish_non_exhaustive()
    }
}

/// The submission/completion bus: routes [`Sqe`]s to attached subsystems by
/// kind and collects their [`Cqe`]s into a bounded completion queue.
pub struct AioSystem {
    size: usize,
    cq_tx: SyncSender<Cqe>,
    cq_rx: Mutex<Receiver<Cqe>>,
    subsystems: HashMap<Kind, Box<dyn Subsystem>>,
    shutting_down: bool,
}

impl std::fmt::Debug for AioSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AioSystem")
            .field("size", &self.size)
            .field("subsystems", &self.subsystems.keys().collect::<Vec<_>>())
            .field("shutting_down", &self.shutting_down)
            .finish()
    }
}

impl AioSystem {
    #[must_use]
    pub fn new(size: usize) -> Self {
        let (cq_tx, cq_rx) = sync_channel(size.max(1));
        Self { size, cq_tx, cq_rx: Mutex::new(cq_rx), subsystems: HashMap::new(), shutting_down: false }
    }

    /// A handle subsystems use to push completions back. Clone freely; every
    /// clone feeds the same bounded channel.
    #[must_use]
    pub fn completion_sink(&self) -> CompletionSink {
        CompletionSink(self.cq_tx.clone())
    }

    /// Registers a subsystem. Errors if its kind is already registered or its
    /// own bound exceeds this bus's completion queue size.
    pub fn attach_subsystem(&mut self, subsystem: Box<dyn Subsystem>) -> Result<(), BusError> {
        let kind = subsystem.kind();
        if subsystem.size() > self.size {
            return Err(BusError::SubsystemTooLarge {
                kind,
                subsystem_size: subsystem.size(),
                bus_size: self.size,
            });
        }
        if self.subsystems.contains_key(kind) {
            return Err(BusError::DuplicateSubsystem { kind });
        }
        info!(kind, "attaching subsystem");
        self.subsystems.insert(kind, subsystem);
        Ok(())
    }
}

impl Bus for AioSystem {
    fn start(&mut self) {
        for (kind, subsystem) in &mut self.subsystems {
            debug!(kind = *kind, "starting subsystem");
            subsystem.start();
        }
    }

    fn stop(&mut self) {
        for (kind, subsystem) in &mut self.subsystems {
            debug!(kind = *kind, "stopping subsystem");
            subsystem.stop();
        }
    }

    fn flush(&mut self, time: i64) {
        for subsystem in self.subsystems.values_mut() {
            subsystem.flush(time);
        }
    }

    /// Routes `sqe` to the subsystem named by its kind. On queue-full, returns
    /// the error synchronously instead of enqueuing; dispatch never blocks.
    fn dispatch(&mut self, sqe: Sqe) -> Result<(), BusError> {
        if self.shutting_down {
            return Err(BusError::ShuttingDown);
        }
        let kind = sqe.kind();
        let Some(subsystem) = self.subsystems.get(kind) else {
            warn!(kind, "no subsystem attached for this kind");
            return Err(BusError::UnknownSubsystem { kind });
        };
        if let Err(_sqe) = subsystem.enqueue(sqe) {
            warn!(kind, "submission queue full");
            return Err(BusError::SubmissionQueueFull { kind });
        }
        Ok(())
    }

    /// Removes up to `n` completions, non-blocking.
    fn dequeue(&mut self, n: usize) -> Vec<Cqe> {
        let rx = self.cq_rx.lock().expect("completion queue mutex poisoned");
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            match rx.try_recv() {
                Ok(cqe) => out.push(cqe),
                Err(_) => break,
            }
        }
        out
    }

    fn shutdown(&mut self) {
        self.shutting_down = true;
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{AioSystem, Bus};
    use crate::{error::BusError, submission::{Completion, EchoCompletion, EchoSubmission, Kind, Submission}};

    /// A minimal in-test subsystem: completes synchronously on `enqueue`
    /// rather than via a worker thread, just enough to exercise the bus's
    /// own routing and bookkeeping.
    struct Loopback(super::CompletionSink);

    impl crate::sqe_cqe::Subsystem for Loopback {
        fn kind(&self) -> Kind {
            "echo"
        }
        fn size(&self) -> usize {
            1
        }
        fn start(&mut self) {}
        fn stop(&mut self) {}
        fn flush(&mut self, _time: i64) {}
        fn enqueue(&self, sqe: crate::sqe_cqe::Sqe) -> Result<(), crate::sqe_cqe::Sqe> {
            let Submission::Echo(EchoSubmission { data }) = sqe.value else { unreachable!() };
            self.0.push(crate::sqe_cqe::Cqe { id: sqe.id, value: Ok(Completion::Echo(EchoCompletion { data })) });
            Ok(())
        }
        fn process(&self, _sqes: Vec<crate::sqe_cqe::Sqe>) -> Vec<crate::sqe_cqe::Cqe> {
            Vec::new()
        }
    }

    #[test]
    fn dispatch_routes_by_kind_and_dequeue_drains_completions() {
        let mut bus = AioSystem::new(4);
        let sink = bus.completion_sink();
        bus.attach_subsystem(Box::new(Loopback(sink))).unwrap();

        bus.dispatch(crate::sqe_cqe::Sqe { id: 1, value: Submission::Echo(EchoSubmission { data: "x".into() }) })
            .unwrap();

        let cqes = bus.dequeue(10);
        assert_eq!(cqes.len(), 1);
        assert_eq!(cqes[0].id, 1);
    }

    #[test]
    fn attaching_a_duplicate_kind_is_rejected() {
        let mut bus = AioSystem::new(4);
        let sink = bus.completion_sink();
        bus.attach_subsystem(Box::new(Loopback(sink.clone()))).unwrap();
        let err = bus.attach_subsystem(Box::new(Loopback(sink))).unwrap_err();
        assert!(matches!(err, BusError::DuplicateSubsystem { kind: "echo" }));
    }

    #[test]
    fn dispatch_to_an_unknown_kind_is_rejected() {
        let mut bus = AioSystem::new(4);
        let err = bus
            .dispatch(crate::sqe_cqe::Sqe { id: 1, value: Submission::Echo(EchoSubmission { data: "x".into() }) })
            .unwrap_err();
        assert!(matches!(err, BusError::UnknownSubsystem { kind: "echo" }));
    }

    #[test]
    fn dispatch_after_shutdown_is_rejected() {
        let mut bus = AioSystem::new(4);
        let sink = bus.completion_sink();
        bus.attach_subsystem(Box::new(Loopback(sink))).unwrap();
        bus.shutdown();
        let err = bus
            .dispatch(crate::sqe_cqe::Sqe { id: 1, value: Submission::Echo(EchoSubmission { data: "x".into() }) })
            .unwrap_err();
        assert!(matches!(err, BusError::ShuttingDown));
    }
}
