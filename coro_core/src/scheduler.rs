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

//! The cooperative scheduler: admits computations, steps them via the
//! explicit resume protocol, and mediates promise creation/resolution.

use std::{collections::{HashMap, HashSet, VecDeque},
          sync::{atomic::{AtomicUsize, Ordering},
                 mpsc::{Receiver, SyncSender, TryRecvError, TrySendError, sync_channel}}};

use coro_bus::Bus;
use tracing::{debug, trace, warn};

use crate::{coroutine::{Computation, FinalValue, PromiseHandle, Resume, Step, Yielded},
            error::SchedulerError,
            handle::{ExternalFuture, Handle},
            ids::{IdSource, IpcId},
            ipc::Ipc};

/// Tunable bounds for one [`Scheduler`] instance.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Capacity of the bounded admission queue `add` pushes onto.
    pub admission_queue_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { admission_queue_size: 100 }
    }
}

/// Drives user computations to completion, one logical tick at a time.
///
/// Owns every scheduler-local structure (ready deque, awaiting map, promise
/// map, IPC arena); the only synchronization surface it exposes to other
/// threads is the bounded admission queue that backs [`Scheduler::add`].
pub struct Scheduler {
    bus: Box<dyn Bus>,
    admission_tx: SyncSender<(Computation, ExternalFuture)>,
    admission_rx: Receiver<(Computation, ExternalFuture)>,
    admission_capacity: usize,
    /// Count of accepted-but-not-yet-`admit`ted computations sitting in the
    /// admission channel. `Add` can race `admit` from another thread, so this
    /// is an atomic rather than a plain field.
    pending_admissions: AtomicUsize,
    ipc_ids: IdSource,
    promise_ids: IdSource,
    arena: HashMap<IpcId, Ipc>,
    running: VecDeque<IpcId>,
    awaiting: HashMap<IpcId, Option<IpcId>>,
    promise_to_ipc: HashMap<PromiseHandle, IpcId>,
    /// IPCs with a live, not-yet-consumed promise pointing at them (minted by
    /// `new_promise`, cleared by whichever of `handle_await`/`drain` consumes
    /// that promise). An id is only safe to retire from `arena` once it is
    /// published, not referenced here, and not a key in `awaiting`.
    referenced: HashSet<IpcId>,
    shutting_down: bool,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("running", &self.running.len())
            .field("awaiting", &self.awaiting.len())
            .field("arena", &self.arena.len())
            .field("pending_admissions", &self.pending_admissions.load(Ordering::Relaxed))
            .field("shutting_down", &self.shutting_down)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    #[must_use]
    pub fn new(bus: Box<dyn Bus>, config: Config) -> Self {
        let (admission_tx, admission_rx) = sync_channel(config.admission_queue_size.max(1));
        Self {
            bus,
            admission_tx,
            admission_rx,
            admission_capacity: config.admission_queue_size,
            pending_admissions: AtomicUsize::new(0),
            ipc_ids: IdSource::default(),
            promise_ids: IdSource::default(),
            arena: HashMap::new(),
            running: VecDeque::new(),
            awaiting: HashMap::new(),
            promise_to_ipc: HashMap::new(),
            referenced: HashSet::new(),
            shutting_down: false,
        }
    }

    /// Admits `computation`, returning a [`Handle`] the caller can block or
    /// poll on for the final value. Non-blocking; fails if the admission
    /// queue is saturated or the scheduler is shutting down.
    pub fn add(&self, computation: Computation) -> Result<Handle, SchedulerError> {
        if self.shutting_down {
            return Err(SchedulerError::ShuttingDown);
        }
        let (future, handle) = Handle::new_pair();
        match self.admission_tx.try_send((computation, future)) {
            Ok(()) => {
                self.pending_admissions.fetch_add(1, Ordering::Relaxed);
                Ok(handle)
            }
            Err(TrySendError::Full(_)) => {
                warn!(capacity = self.admission_capacity, "admission queue full");
                Err(SchedulerError::AdmissionQueueFull { capacity: self.admission_capacity })
            }
            Err(TrySendError::Disconnected(_)) => Err(SchedulerError::ShuttingDown),
        }
    }

    /// Drains the admission queue onto the ready deque, then ticks.
    ///
    /// Precondition and postcondition: the ready deque is empty.
    pub fn run_until_blocked(&mut self, time: i64) {
        assert!(self.running.is_empty(), "ready deque not empty at start of run_until_blocked");

        loop {
            match self.admission_rx.try_recv() {
                Ok((computation, handle)) => {
                    self.pending_admissions.fetch_sub(1, Ordering::Relaxed);
                    self.admit(computation, handle);
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }

        self.tick(time);

        assert!(self.running.is_empty(), "ready deque not empty after run_until_blocked");
    }

    /// Flushes the bus, runs one unblock pass, then steps the ready deque to
    /// quiescence.
    ///
    /// Flushing here (rather than leaving it to the caller) keeps the bus
    /// fully encapsulated: callers driving [`AioSystem`](coro_bus::AioSystem)
    /// see a no-op, while callers driving
    /// [`AioDst`](coro_bus::AioDst) get its queued submissions turned into
    /// completions on the same cadence as every other per-tick bookkeeping
    /// step.
    pub fn tick(&mut self, time: i64) {
        trace!(time, "tick");
        self.bus.flush(time);
        self.resolve_completions();
        self.unblock();
        while self.step(time) {}
    }

    /// Count of IPCs that are live: admitted-but-not-yet-drained, ready, and
    /// awaiting. Used by drivers to decide termination (`while size() > 0 {
    /// tick() }`), so it must count every computation that still has work
    /// outstanding, not just the ones already on the ready deque.
    #[must_use]
    pub fn size(&self) -> usize {
        self.running.len() + self.awaiting.len() + self.pending_admissions.load(Ordering::Relaxed)
    }

    /// Closes the admission queue and forwards shutdown to the bus.
    ///
    /// # Panics
    ///
    /// Panics if the admission backlog, ready deque, awaiting map, or promise
    /// map are non-empty: a non-empty scheduler at shutdown means live work
    /// was abandoned, which is a driver bug, not a condition this call
    /// recovers from.
    pub fn shutdown(&mut self) {
        self.shutting_down = true;
        self.bus.shutdown();
        assert_eq!(self.pending_admissions.load(Ordering::Relaxed), 0, "admission backlog not empty at shutdown");
        assert!(self.running.is_empty(), "ready deque not empty at shutdown");
        assert!(self.awaiting.is_empty(), "awaiting map not empty at shutdown");
        assert!(self.promise_to_ipc.is_empty(), "promise map not empty at shutdown");
    }

    fn new_ipc_id(&mut self) -> IpcId {
        IpcId(self.ipc_ids.next())
    }

    fn new_promise(&mut self, target: IpcId) -> PromiseHandle {
        let promise = PromiseHandle(self.promise_ids.next());
        self.promise_to_ipc.insert(promise, target);
        self.referenced.insert(target);
        promise
    }

    /// Removes `id` from the arena once it is published and nothing still
    /// references it (no live promise, no pending `awaiting` entry).
    /// Idempotent and safe to call speculatively from every place that
    /// consumes one of those references.
    fn try_retire(&mut self, id: IpcId) {
        let retire = self.arena.get(&id).is_some_and(|ipc| ipc.final_value.is_some())
            && !self.referenced.contains(&id)
            && !self.awaiting.contains_key(&id);
        if retire {
            self.arena.remove(&id);
            trace!(ipc = id.0, "ipc retired from arena");
        }
    }

    /// Pulls one (computation, external future) admission pair onto the
    /// ready deque (coroutines) or straight to the bus (bare work).
    fn admit(&mut self, computation: Computation, future: ExternalFuture) {
        match computation {
            Computation::Coroutine(coroutine) => {
                let id = self.new_ipc_id();
                self.arena.insert(id, Ipc::coroutine(coroutine).with_external_future(future));
                debug!(ipc = id.0, "admitted coroutine");
                self.running.push_back(id);
            }
            Computation::BareWork(submission) => {
                let id = self.new_ipc_id();
                self.arena.insert(id, Ipc::leaf().with_external_future(future));
                debug!(ipc = id.0, "admitted bare work");
                // Unlike a submission dispatched on a coroutine's behalf
                // (`handle_submit`), nothing will ever `Await` this IPC's
                // promise — it has none — so it must be tracked in the
                // awaiting map itself to stay visible to `size`/`shutdown`
                // bookkeeping until `unblock` retires it.
                if self.dispatch(id, submission) {
                    self.awaiting.insert(id, None);
                }
            }
        }
    }

    /// Dispatches `submission` through the bus on behalf of `id`. Returns
    /// whether the submission was accepted; on rejection, `id`'s final value
    /// is set to the rejection error immediately.
    fn dispatch(&mut self, id: IpcId, submission: coro_bus::Submission) -> bool {
        let sqe = coro_bus::Sqe { id: id.0, value: submission };
        match self.bus.dispatch(sqe) {
            Ok(()) => true,
            Err(err) => {
                self.set_final(id, Err(coro_bus::any::error(err)));
                false
            }
        }
    }

    /// Pops one IPC off the ready deque and advances it one step. Returns
    /// `false` when the deque is empty (nothing left to do this tick).
    fn step(&mut self, time: i64) -> bool {
        let Some(id) = self.running.pop_back() else { return false };

        let has_own_final = {
            let ipc = self.arena.get(&id).expect("ready IPC missing from arena");
            ipc.own_final.is_some()
        };
        if has_own_final {
            self.drain(id);
            return true;
        }

        let next = {
            let ipc = self.arena.get_mut(&id).expect("ready IPC missing from arena");
            std::mem::replace(&mut ipc.next, Resume::Start)
        };

        let step = {
            let ipc = self.arena.get_mut(&id).expect("ready IPC missing from arena");
            let coroutine = ipc.body.as_deref_mut().expect("stepping a leaf IPC");
            coroutine.resume(next)
        };

        match step {
            Step::Finished(fv) => self.set_final(id, fv),
            Step::Yielded(Yielded::Now) => {
                let ipc = self.arena.get_mut(&id).expect("ipc vanished mid-step");
                ipc.next = Resume::Time(time);
                self.running.push_back(id);
            }
            Step::Yielded(Yielded::Await(promise)) => self.handle_await(id, promise),
            Step::Yielded(Yielded::Child(child)) => self.handle_child(id, child),
            Step::Yielded(Yielded::Submit(submission)) => self.handle_submit(id, submission),
        }

        true
    }

    fn handle_await(&mut self, id: IpcId, promise: PromiseHandle) {
        let target = self.promise_to_ipc.remove(&promise).expect("awaited promise has no target");
        self.referenced.remove(&target);
        {
            let ipc = self.arena.get_mut(&id).expect("awaiting ipc vanished");
            ipc.pending.retain(|p| *p != promise);
        }
        let target_final = self.arena.get(&target).and_then(|t| t.final_value.clone());
        match target_final {
            Some(final_value) => {
                let ipc = self.arena.get_mut(&id).expect("awaiting ipc vanished");
                ipc.next = Resume::from(final_value);
                self.running.push_back(id);
                self.try_retire(target);
            }
            None => {
                self.awaiting.insert(target, Some(id));
            }
        }
    }

    fn handle_child(&mut self, id: IpcId, child: Box<dyn crate::coroutine::Coroutine>) {
        let child_id = self.new_ipc_id();
        self.arena.insert(child_id, Ipc::coroutine(child));
        self.running.push_back(child_id);

        let promise = self.new_promise(child_id);
        let ipc = self.arena.get_mut(&id).expect("parent ipc vanished");
        ipc.pending.push(promise);
        ipc.next = Resume::Promise(promise);
        self.running.push_back(id);
    }

    fn handle_submit(&mut self, id: IpcId, submission: coro_bus::Submission) {
        let child_id = self.new_ipc_id();
        self.arena.insert(child_id, Ipc::leaf());
        self.dispatch(child_id, submission);

        let promise = self.new_promise(child_id);
        let ipc = self.arena.get_mut(&id).expect("parent ipc vanished");
        ipc.pending.push(promise);
        ipc.next = Resume::Promise(promise);
        self.running.push_back(id);
    }

    /// Publishes `fv` as `id`'s own outcome and attempts to drain its
    /// pending promises, as if `id` had just finished running.
    fn set_final(&mut self, id: IpcId, fv: FinalValue) {
        {
            let ipc = self.arena.get_mut(&id).expect("finishing ipc vanished");
            assert!(ipc.own_final.is_none(), "final set twice for the same IPC");
            ipc.own_final = Some(fv);
        }
        self.drain(id);
    }

    /// Pops pending promises off `id` until either one is unresolved (in
    /// which case `id` waits on it) or the stack is empty (in which case
    /// `id`'s own final value is published).
    fn drain(&mut self, id: IpcId) {
        loop {
            let next_pending = {
                let ipc = self.arena.get_mut(&id).expect("draining ipc vanished");
                ipc.pending.pop()
            };
            let Some(promise) = next_pending else {
                self.publish(id);
                return;
            };
            let target = *self.promise_to_ipc.get(&promise).expect("pending promise has no target");
            let resolved = self.arena.get(&target).is_some_and(|t| t.final_value.is_some());
            if resolved {
                self.promise_to_ipc.remove(&promise);
                self.referenced.remove(&target);
                self.try_retire(target);
                continue;
            }
            let ipc = self.arena.get_mut(&id).expect("draining ipc vanished");
            ipc.pending.push(promise);
            self.awaiting.insert(target, Some(id));
            return;
        }
    }

    fn publish(&mut self, id: IpcId) {
        let ipc = self.arena.get_mut(&id).expect("publishing ipc vanished");
        let fv = ipc.own_final.take().expect("publish called before own_final was set");
        ipc.final_value = Some(fv.clone());
        if let Some(future) = ipc.external_future.take() {
            future.resolve(fv);
        }
        debug!(ipc = id.0, "ipc published");
        self.try_retire(id);
    }

    /// Drains completions off the bus and publishes each one onto the IPC
    /// that originated it.
    fn resolve_completions(&mut self) {
        const BATCH: usize = 256;
        loop {
            let batch = self.bus.dequeue(BATCH);
            if batch.is_empty() {
                return;
            }
            for cqe in batch {
                let id = IpcId(cqe.id);
                let fv = cqe.value.map(coro_bus::any::value);
                if self.arena.contains_key(&id) {
                    self.set_final(id, fv);
                }
            }
        }
    }

    /// Requeues every blocked IPC whose blocker now has a published final
    /// value.
    fn unblock(&mut self) {
        let ready: Vec<IpcId> = self
            .awaiting
            .iter()
            .filter(|(blocker, _)| self.arena.get(blocker).is_some_and(|ipc| ipc.final_value.is_some()))
            .map(|(blocker, _)| *blocker)
            .collect();

        for blocker in ready {
            let final_value = self.arena.get(&blocker).and_then(|ipc| ipc.final_value.clone());
            if let Some(blocked) = self.awaiting.remove(&blocker).flatten() {
                let ipc = self.arena.get_mut(&blocked).expect("blocked ipc vanished");
                ipc.next = Resume::from(final_value.expect("checked above"));
                self.running.push_back(blocked);
            }
            self.try_retire(blocker);
        }
    }
}

#[cfg(test)]
mod tests {
    use coro_bus::{AioDst, Bus, EchoSubmission, Submission};
    use coro_subsystems::Echo;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;

    use super::{Config, Scheduler};
    use crate::Computation;

    /// `AioDst` never calls `enqueue`, only `process`, so the `Echo`
    /// subsystem's completion sink is never exercised directly; a throwaway
    /// `AioSystem` is the cheapest place to mint one.
    fn dst_scheduler(p: f64, seed: u64) -> Scheduler {
        let mut aiodst = AioDst::new(rand::rngs::StdRng::seed_from_u64(seed), p);
        aiodst
            .attach_subsystem(Box::new(Echo::new(coro_subsystems::Config::default(), coro_bus::AioSystem::new(8).completion_sink())))
            .unwrap();
        let mut bus: Box<dyn Bus> = Box::new(aiodst);
        bus.start();
        Scheduler::new(bus, Config::default())
    }

    #[test]
    fn bare_echo_work_resolves_within_one_tick_under_zero_failure_dst() {
        let mut scheduler = dst_scheduler(0.0, 1);
        let handle =
            scheduler.add(Computation::bare_work(Submission::Echo(EchoSubmission { data: "hi".into() }))).unwrap();
        scheduler.run_until_blocked(0);

        let fv = handle.result(std::time::Duration::from_millis(0)).unwrap();
        let value = fv.unwrap();
        let completion = coro_bus::any::downcast::<coro_bus::Completion>(&value).unwrap();
        match completion {
            coro_bus::Completion::Echo(c) => assert_eq!(c.data, "hi"),
            other => panic!("unexpected completion: {other:?}"),
        }
    }

    #[test]
    fn size_is_zero_once_quiescent() {
        let mut scheduler = dst_scheduler(0.0, 2);
        let handle =
            scheduler.add(Computation::bare_work(Submission::Echo(EchoSubmission { data: "x".into() }))).unwrap();
        scheduler.run_until_blocked(0);
        assert_eq!(scheduler.size(), 0);
        handle.result(std::time::Duration::from_millis(0)).unwrap().unwrap();
    }

    #[test]
    fn admission_queue_rejects_once_full() {
        let mut config = Config::default();
        config.admission_queue_size = 1;
        let mut aiodst = AioDst::new(rand::rngs::StdRng::seed_from_u64(3), 0.0);
        aiodst
            .attach_subsystem(Box::new(Echo::new(coro_subsystems::Config::default(), coro_bus::AioSystem::new(8).completion_sink())))
            .unwrap();
        let bus: Box<dyn Bus> = Box::new(aiodst);
        let scheduler = Scheduler::new(bus, config);

        scheduler.add(Computation::bare_work(Submission::Echo(EchoSubmission { data: "a".into() }))).unwrap();
        let err = scheduler.add(Computation::bare_work(Submission::Echo(EchoSubmission { data: "b".into() })));
        assert!(matches!(err, Err(crate::SchedulerError::AdmissionQueueFull { capacity: 1 })));
    }

    #[test]
    fn shutdown_asserts_emptiness_once_quiescent() {
        let mut scheduler = dst_scheduler(0.0, 4);
        let handle =
            scheduler.add(Computation::bare_work(Submission::Echo(EchoSubmission { data: "x".into() }))).unwrap();
        scheduler.run_until_blocked(0);
        handle.result(std::time::Duration::from_millis(0)).unwrap().unwrap();
        scheduler.shutdown();
    }
}
