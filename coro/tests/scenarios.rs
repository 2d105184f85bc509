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

//! End-to-end scenarios covering admission, the recursive echo/join pattern,
//! function thunks, deterministic failure injection, and backpressure.

use std::time::Duration;

use coro::{AioDst, AnyValue, Completion, Computation, Coroutine, EchoSubmission, Function,
           FunctionSubmission, Resume, Scheduler, SchedulerError, Step, Submission, Yielded};
use pretty_assertions::assert_eq;
use rand::SeedableRng;

fn value(v: impl std::any::Any + Send + Sync + 'static) -> AnyValue {
    coro_bus::any::value(v)
}

fn downcast_completion(v: &AnyValue) -> &Completion {
    coro_bus::any::downcast::<Completion>(v).expect("expected a Completion payload")
}

#[derive(Debug, thiserror::Error)]
#[error("thunk raised")]
struct ThunkRaised;

/// Scenario 1: for `n > 0`, spawns itself on `n - 1`, echoes `"foo.n"` and
/// `"bar.n"`, and joins the three as `"{foo}:{bar}:{baz}"`.
struct RecursiveEcho {
    n: u32,
    stage: Stage,
}

enum Stage {
    Start,
    AwaitingChildPromise,
    AwaitingChild,
    AwaitingFooPromise { baz: String },
    AwaitingFoo { baz: String },
    AwaitingBarPromise { baz: String, foo: String },
    AwaitingBar { baz: String, foo: String },
}

impl RecursiveEcho {
    fn new(n: u32) -> Self {
        Self { n, stage: Stage::Start }
    }
}

impl Coroutine for RecursiveEcho {
    fn resume(&mut self, resume: Resume) -> Step {
        match (&self.stage, resume) {
            (Stage::Start, Resume::Start) if self.n == 0 => Step::Finished(Ok(value(String::new()))),
            (Stage::Start, Resume::Start) => {
                self.stage = Stage::AwaitingChildPromise;
                Step::Yielded(Yielded::Child(Box::new(RecursiveEcho::new(self.n - 1))))
            }
            (Stage::AwaitingChildPromise, Resume::Promise(p)) => {
                self.stage = Stage::AwaitingChild;
                Step::Yielded(Yielded::Await(p))
            }
            (Stage::AwaitingChild, Resume::Value(v)) => {
                let baz = v.downcast_ref::<String>().expect("child did not return a String").clone();
                self.stage = Stage::AwaitingFooPromise { baz };
                Step::Yielded(Yielded::Submit(Submission::Echo(EchoSubmission { data: format!("foo.{}", self.n) })))
            }
            (Stage::AwaitingFooPromise { baz }, Resume::Promise(p)) => {
                let baz = baz.clone();
                self.stage = Stage::AwaitingFoo { baz };
                Step::Yielded(Yielded::Await(p))
            }
            (Stage::AwaitingFoo { baz }, Resume::Value(v)) => {
                let foo = match downcast_completion(&v) {
                    Completion::Echo(c) => c.data.clone(),
                    Completion::Function(_) => panic!("expected an echo completion"),
                };
                let baz = baz.clone();
                self.stage = Stage::AwaitingBarPromise { baz, foo };
                Step::Yielded(Yielded::Submit(Submission::Echo(EchoSubmission { data: format!("bar.{}", self.n) })))
            }
            (Stage::AwaitingBarPromise { baz, foo }, Resume::Promise(p)) => {
                let (baz, foo) = (baz.clone(), foo.clone());
                self.stage = Stage::AwaitingBar { baz, foo };
                Step::Yielded(Yielded::Await(p))
            }
            (Stage::AwaitingBar { baz, foo }, Resume::Value(v)) => {
                let bar = match downcast_completion(&v) {
                    Completion::Echo(c) => c.data.clone(),
                    Completion::Function(_) => panic!("expected an echo completion"),
                };
                Step::Finished(Ok(value(format!("{foo}:{bar}:{baz}"))))
            }
            _ => panic!("unexpected resume for the current stage of RecursiveEcho"),
        }
    }
}

/// Ticks `scheduler` with a strictly increasing logical clock until no IPC
/// remains live. `run_until_blocked` itself already drains one tick fully
/// (admission + step loop); repeating it lets I/O completions that arrived
/// mid-tick get picked up on the next pass.
fn run_to_quiescence(scheduler: &mut Scheduler) {
    let mut time = 0_i64;
    loop {
        scheduler.run_until_blocked(time);
        if scheduler.size() == 0 {
            return;
        }
        time += 1;
        assert!(time < 10_000, "scheduler did not quiesce within the tick budget");
    }
}

#[test]
fn recursive_echo_joins_in_the_expected_order() {
    let config = coro::Config::default();
    let mut scheduler = coro::build(&config).unwrap();

    let handle = scheduler.add(Computation::coroutine(RecursiveEcho::new(5))).unwrap();
    run_to_quiescence(&mut scheduler);

    let fv = handle.result(Duration::from_secs(5)).unwrap();
    let result = fv.unwrap();
    let s = result.downcast_ref::<String>().unwrap();
    assert_eq!(s, "foo.5:bar.5:foo.4:bar.4:foo.3:bar.3:foo.2:bar.2:foo.1:bar.1:");
}

#[test]
fn bare_function_work_resolves_to_its_return_value() {
    let config = coro::Config::default();
    let mut scheduler = coro::build(&config).unwrap();

    let handle = scheduler
        .add(Computation::bare_work(Submission::Function(FunctionSubmission {
            f: Box::new(|| Ok(value("hi!".to_string()))),
        })))
        .unwrap();
    run_to_quiescence(&mut scheduler);

    let fv = handle.result(Duration::from_secs(5)).unwrap();
    let completion = downcast_completion(&fv.unwrap());
    match completion {
        Completion::Function(c) => assert_eq!(c.value.downcast_ref::<String>().unwrap(), "hi!"),
        Completion::Echo(_) => panic!("expected a function completion"),
    }
}

/// Scenario 3: catches a thunk's failure around its await and substitutes a
/// default, rather than ever propagating the error to the external future.
struct CatchAndSubstitute {
    n: u32,
    awaited: bool,
}

impl Coroutine for CatchAndSubstitute {
    fn resume(&mut self, resume: Resume) -> Step {
        match (self.awaited, resume) {
            (false, Resume::Start) => {
                self.awaited = true;
                Step::Yielded(Yielded::Submit(Submission::Function(FunctionSubmission {
                    f: Box::new(|| Err(coro_bus::any::error(ThunkRaised))),
                })))
            }
            (true, Resume::Promise(p)) => Step::Yielded(Yielded::Await(p)),
            (true, Resume::Error(_)) => Step::Finished(Ok(value(format!("foo.{}", self.n)))),
            _ => panic!("the thunk was expected to fail"),
        }
    }
}

#[test]
fn a_coroutine_may_catch_a_failed_submission_and_recover() {
    let config = coro::Config::default();
    let mut scheduler = coro::build(&config).unwrap();

    let handle = scheduler.add(Computation::coroutine(CatchAndSubstitute { n: 7, awaited: false })).unwrap();
    run_to_quiescence(&mut scheduler);

    let fv = handle.result(Duration::from_secs(5)).unwrap();
    let result = fv.unwrap();
    assert_eq!(result.downcast_ref::<String>().unwrap(), "foo.7");
}

#[test]
fn backpressure_rejects_admission_past_capacity_without_changing_scheduler_state() {
    let mut config = coro::Config::default();
    config.scheduler.admission_queue_size = 2;
    let scheduler = coro::build(&config).unwrap();

    let _h1 = scheduler.add(Computation::bare_work(Submission::Echo(EchoSubmission { data: "a".into() }))).unwrap();
    let _h2 = scheduler.add(Computation::bare_work(Submission::Echo(EchoSubmission { data: "b".into() }))).unwrap();

    let err = scheduler.add(Computation::bare_work(Submission::Echo(EchoSubmission { data: "c".into() })));
    assert!(matches!(err, Err(SchedulerError::AdmissionQueueFull { capacity: 2 })));
}

/// Scenario 6: yields three submissions and returns before awaiting any of
/// them; every one must still deliver a completion once the scheduler drains
/// the pending stack after the coroutine has already finished.
struct ThreeUnawaitedSubmits {
    stage: u8,
}

impl Coroutine for ThreeUnawaitedSubmits {
    fn resume(&mut self, resume: Resume) -> Step {
        match (self.stage, resume) {
            (0, Resume::Start) => {
                self.stage = 1;
                Step::Yielded(Yielded::Submit(Submission::Echo(EchoSubmission { data: "one".into() })))
            }
            (1, Resume::Promise(_)) => {
                self.stage = 2;
                Step::Yielded(Yielded::Submit(Submission::Echo(EchoSubmission { data: "two".into() })))
            }
            (2, Resume::Promise(_)) => {
                self.stage = 3;
                Step::Yielded(Yielded::Submit(Submission::Echo(EchoSubmission { data: "three".into() })))
            }
            (3, Resume::Promise(_)) => Step::Finished(Ok(value(()))),
            _ => unreachable!("ThreeUnawaitedSubmits only ever receives Start or Promise resumes"),
        }
    }
}

#[test]
fn post_return_drain_resolves_every_unawaited_submission() {
    let config = coro::Config::default();
    let mut scheduler = coro::build(&config).unwrap();

    let handle = scheduler.add(Computation::coroutine(ThreeUnawaitedSubmits { stage: 0 })).unwrap();
    run_to_quiescence(&mut scheduler);

    handle.result(Duration::from_secs(5)).unwrap().unwrap();
}

/// Scenario 4: under seeded failure injection, a batch of admitted bare
/// work must all reach a resolved state — success or simulated failure,
/// never a hang.
#[test]
fn deterministic_fuzz_resolves_every_admitted_submission() {
    let mut dst = AioDst::new(rand::rngs::StdRng::seed_from_u64(42), 0.2);
    let throwaway_sink = coro_bus::AioSystem::new(8).completion_sink();
    dst.attach_subsystem(Box::new(coro::Echo::new(coro_subsystems::Config::default(), throwaway_sink.clone())))
        .unwrap();
    dst.attach_subsystem(Box::new(Function::new(coro_subsystems::Config::default(), throwaway_sink))).unwrap();

    let mut scheduler = Scheduler::new(Box::new(dst), coro_core::Config { admission_queue_size: 200 });

    let handles: Vec<_> = (0..100)
        .map(|i| {
            scheduler
                .add(Computation::bare_work(Submission::Echo(EchoSubmission { data: format!("job-{i}") })))
                .unwrap()
        })
        .collect();

    run_to_quiescence(&mut scheduler);

    for handle in handles {
        let fv = handle.result(Duration::from_secs(5)).expect("every handle must resolve, never time out");
        if let Ok(v) = fv {
            downcast_completion(&v);
        }
    }
}
