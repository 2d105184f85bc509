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

//! Echo subsystem: completes with the data it was submitted, unchanged.
//!
//! The simplest possible reference subsystem — it anchors the contract
//! without exercising anything beyond the plumbing itself.

use std::{sync::{Arc, Mutex,
                 mpsc::{Receiver, SyncSender, TrySendError, sync_channel}},
          thread::JoinHandle};

use coro_bus::{Completion, CompletionSink, Cqe, EchoCompletion, EchoSubmission, Kind, Sqe,
               Submission, Subsystem};
use tracing::{debug, warn};

use crate::config::Config;

/// Echoes back whatever string it was handed. Kind = `"echo"`.
pub struct Echo {
    config: Config,
    tx: Mutex<Option<SyncSender<Sqe>>>,
    rx: Arc<Mutex<Receiver<Sqe>>>,
    completions: CompletionSink,
    workers: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for Echo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Echo").field("config", &self.config).field("workers", &self.workers.len()).finish()
    }
}

impl Echo {
    #[must_use]
    pub fn new(config: Config, completions: CompletionSink) -> Self {
        let (tx, rx) = sync_channel(config.queue_size.max(1));
        Self { config, tx: Mutex::new(Some(tx)), rx: Arc::new(Mutex::new(rx)), completions, workers: Vec::new() }
    }

    fn process_one(sqe: Sqe) -> Cqe {
        let Submission::Echo(EchoSubmission { data }) = sqe.value else {
            unreachable!("echo subsystem received a non-echo submission")
        };
        Cqe { id: sqe.id, value: Ok(Completion::Echo(EchoCompletion { data })) }
    }
}

impl Subsystem for Echo {
    fn kind(&self) -> Kind {
        "echo"
    }

    fn size(&self) -> usize {
        self.config.queue_size
    }

    /// # Panics
    ///
    /// Panics if a worker thread fails to spawn (OS thread limits).
    fn start(&mut self) {
        for i in 0..self.config.workers.max(1) {
            let rx = Arc::clone(&self.rx);
            let completions = self.completions.clone();
            let handle = std::thread::Builder::new()
                .name(format!("coro-echo-{i}"))
                .spawn(move || {
                    while let Ok(sqe) = { let rx = rx.lock().expect("echo queue mutex poisoned"); rx.recv() } {
                        completions.push(Self::process_one(sqe));
                    }
                })
                .expect("failed to spawn echo worker thread");
            self.workers.push(handle);
        }
        debug!(workers = self.config.workers, "echo subsystem started");
    }

    fn stop(&mut self) {
        self.tx.lock().expect("echo queue mutex poisoned").take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        debug!("echo subsystem stopped");
    }

    fn flush(&mut self, _time: i64) {}

    fn enqueue(&self, sqe: Sqe) -> Result<(), Sqe> {
        let guard = self.tx.lock().expect("echo queue mutex poisoned");
        let Some(tx) = guard.as_ref() else { return Err(sqe) };
        match tx.try_send(sqe) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(sqe)) => {
                warn!("echo queue full");
                Err(sqe)
            }
            Err(TrySendError::Disconnected(sqe)) => Err(sqe),
        }
    }

    fn process(&self, sqes: Vec<Sqe>) -> Vec<Cqe> {
        sqes.into_iter().map(Self::process_one).collect()
    }
}

#[cfg(test)]
mod tests {
    use coro_bus::{AioSystem, Sqe};
    use pretty_assertions::assert_eq;

    use super::{Completion, Echo, EchoSubmission, Submission};
    use crate::Config;

    #[test]
    fn echoes_back_what_it_was_given() {
        let bus = AioSystem::new(8);
        let echo = Echo::new(Config::default(), bus.completion_sink());
        let sqe = Sqe { id: 1, value: Submission::Echo(EchoSubmission { data: "hello".into() }) };
        let cqe = echo.process(vec![sqe]).into_iter().next().unwrap();
        assert_eq!(cqe.id, 1);
        match cqe.value.unwrap() {
            Completion::Echo(c) => assert_eq!(c.data, "hello"),
            other => panic!("unexpected completion: {other:?}"),
        }
    }
}
