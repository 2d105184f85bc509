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

//! Deterministic simulation bus: [`AioDst`].
//!
//! Replaces worker threads with synchronous, seeded-random processing so
//! scheduler tests can inject reproducible subsystem failures without
//! spawning real threads.

use std::collections::HashMap;

use rand::{Rng, rngs::StdRng};

use crate::{any::error,
            error::BusError,
            iface::Bus,
            sqe_cqe::{Cqe, Sqe, Subsystem},
            submission::Kind};

/// A bus that processes submissions synchronously on `flush`, injecting
/// simulated pre- and post-processing failures with probability `p`.
pub struct AioDst {
    rng: StdRng,
    p: f64,
    sqes: Vec<Sqe>,
    cqes: Vec<Cqe>,
    subsystems: HashMap<Kind, Box<dyn Subsystem>>,
    last_flush: i64,
}

impl std::fmt::Debug for AioDst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AioDst")
            .field("p", &self.p)
            .field("pending_sqes", &self.sqes.len())
            .field("pending_cqes", &self.cqes.len())
            .finish_non_exhaustive()
    }
}

impl AioDst {
    /// `rng` seeds both the failure coin flips and the dispatch reordering,
    /// so a fixed seed reproduces an identical run.
    #[must_use]
    pub fn new(rng: StdRng, p: f64) -> Self {
        Self { rng, p, sqes: Vec::new(), cqes: Vec::new(), subsystems: HashMap::new(), last_flush: -1 }
    }

    pub fn attach_subsystem(&mut self, subsystem: Box<dyn Subsystem>) -> Result<(), BusError> {
        let kind = subsystem.kind();
        if self.subsystems.contains_key(kind) {
            return Err(BusError::DuplicateSubsystem { kind });
        }
        self.subsystems.insert(kind, subsystem);
        Ok(())
    }

    /// Runs one submission through its subsystem's `process` synchronously,
    /// for focused subsystem contract tests. Panics on an error result, since
    /// this is a test-only convenience, not a reachable runtime path.
    #[must_use]
    pub fn check(&self, sqe: Sqe) -> Cqe {
        let kind = sqe.kind();
        let subsystem = self.subsystems.get(kind).expect("no subsystem attached for kind");
        let cqe = subsystem.process(vec![sqe]).into_iter().next().expect("process returned no completion");
        assert!(cqe.value.is_ok(), "unexpected subsystem failure in check()");
        cqe
    }
}

impl Bus for AioDst {
    fn start(&mut self) {
        for s in self.subsystems.values_mut() {
            s.start();
        }
    }

    fn stop(&mut self) {
        for s in self.subsystems.values_mut() {
            s.stop();
        }
    }

    fn shutdown(&mut self) {}

    /// Dispatch never blocks here: the submission is simply recorded at a
    /// random position in the pending list, to be resolved on the next
    /// `flush`.
    fn dispatch(&mut self, sqe: Sqe) -> Result<(), BusError> {
        let i = self.rng.random_range(0..=self.sqes.len());
        self.sqes.insert(i, sqe);
        Ok(())
    }

    /// Partitions queued submissions by kind, injects simulated failures, and
    /// runs each surviving batch through its subsystem's `process`.
    fn flush(&mut self, time: i64) {
        assert!(self.last_flush < time, "flush called with non-increasing time");
        self.last_flush = time;

        let mut by_kind: HashMap<Kind, Vec<Sqe>> = HashMap::new();
        for sqe in self.sqes.drain(..) {
            by_kind.entry(sqe.kind()).or_default().push(sqe);
        }

        for (kind, sqes) in by_kind {
            let subsystem = self.subsystems.get(&kind).expect("invalid aio submission");

            let mut to_process = Vec::with_capacity(sqes.len());
            let mut post_failure = Vec::new();
            for sqe in sqes {
                if self.rng.random::<f64>() < self.p {
                    if self.rng.random_range(0..=1) == 0 {
                        self.cqes.push(Cqe { id: sqe.id, value: Err(error(SimulatedFailure::Pre)) });
                        continue;
                    }
                    post_failure.push(true);
                } else {
                    post_failure.push(false);
                }
                to_process.push(sqe);
            }

            if to_process.is_empty() {
                continue;
            }

            for (cqe, failed) in subsystem.process(to_process).into_iter().zip(post_failure) {
                if failed {
                    self.cqes.push(Cqe { id: cqe.id, value: Err(error(SimulatedFailure::Post)) });
                } else {
                    self.cqes.push(cqe);
                }
            }
        }
    }

    fn dequeue(&mut self, n: usize) -> Vec<Cqe> {
        let n = n.min(self.cqes.len());
        self.cqes.drain(..n).collect()
    }
}

/// Deterministic-mode injected failures, indistinguishable from genuine
/// subsystem failures from the scheduler's point of view.
#[derive(Debug, thiserror::Error)]
pub enum SimulatedFailure {
    #[error("simulated failure before processing")]
    Pre,
    #[error("simulated failure after processing")]
    Post,
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::{AioDst, Bus};
    use crate::{sqe_cqe::{Cqe, Sqe, Subsystem},
                submission::{Completion, EchoCompletion, EchoSubmission, Kind, Submission}};

    struct Echo;

    impl Subsystem for Echo {
        fn kind(&self) -> Kind {
            "echo"
        }
        fn size(&self) -> usize {
            8
        }
        fn start(&mut self) {}
        fn stop(&mut self) {}
        fn flush(&mut self, _time: i64) {}
        fn enqueue(&self, _sqe: Sqe) -> Result<(), Sqe> {
            unreachable!("AioDst drives subsystems through process(), never enqueue()")
        }
        fn process(&self, sqes: Vec<Sqe>) -> Vec<Cqe> {
            sqes.into_iter()
                .map(|sqe| {
                    let Submission::Echo(EchoSubmission { data }) = sqe.value else { unreachable!() };
                    Cqe { id: sqe.id, value: Ok(Completion::Echo(EchoCompletion { data })) }
                })
                .collect()
        }
    }

    #[test]
    fn zero_failure_probability_always_succeeds() {
        let mut bus = AioDst::new(rand::rngs::StdRng::seed_from_u64(1), 0.0);
        bus.attach_subsystem(Box::new(Echo)).unwrap();

        bus.dispatch(Sqe { id: 1, value: Submission::Echo(EchoSubmission { data: "a".into() }) }).unwrap();
        bus.dispatch(Sqe { id: 2, value: Submission::Echo(EchoSubmission { data: "b".into() }) }).unwrap();
        bus.flush(0);

        let cqes = bus.dequeue(10);
        assert_eq!(cqes.len(), 2);
        assert!(cqes.iter().all(|c| c.value.is_ok()));
    }

    #[test]
    fn certain_failure_probability_always_fails() {
        let mut bus = AioDst::new(rand::rngs::StdRng::seed_from_u64(2), 1.0);
        bus.attach_subsystem(Box::new(Echo)).unwrap();

        bus.dispatch(Sqe { id: 1, value: Submission::Echo(EchoSubmission { data: "a".into() }) }).unwrap();
        bus.flush(0);

        let cqes = bus.dequeue(10);
        assert_eq!(cqes.len(), 1);
        assert!(cqes[0].value.is_err());
    }

    #[test]
    #[should_panic(expected = "non-increasing")]
    fn flush_requires_strictly_increasing_time() {
        let mut bus = AioDst::new(rand::rngs::StdRng::seed_from_u64(3), 0.0);
        bus.attach_subsystem(Box::new(Echo)).unwrap();
        bus.flush(5);
        bus.flush(5);
    }
}
