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

//! Function subsystem: runs a boxed zero-argument callable to completion.

use std::{sync::{Arc, Mutex,
                 mpsc::{Receiver, SyncSender, TrySendError, sync_channel}},
          thread::JoinHandle};

use coro_bus::{Completion, CompletionSink, Cqe, FunctionCompletion, FunctionSubmission, Kind,
               Sqe, Submission, Subsystem};
use tracing::{debug, warn};

use crate::config::Config;

/// Runs a submitted thunk and completes with its return value or the error
/// it raised. Kind = `"function"`.
pub struct Function {
    config: Config,
    tx: Mutex<Option<SyncSender<Sqe>>>,
    rx: Arc<Mutex<Receiver<Sqe>>>,
    completions: CompletionSink,
    workers: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function").field("config", &self.config).field("workers", &self.workers.len()).finish()
    }
}

impl Function {
    #[must_use]
    pub fn new(config: Config, completions: CompletionSink) -> Self {
        let (tx, rx) = sync_channel(config.queue_size.max(1));
        Self { config, tx: Mutex::new(Some(tx)), rx: Arc::new(Mutex::new(rx)), completions, workers: Vec::new() }
    }

    fn process_one(sqe: Sqe) -> Cqe {
        let Submission::Function(FunctionSubmission { f }) = sqe.value else {
            unreachable!("function subsystem received a non-function submission")
        };
        let value = f().map(|value| Completion::Function(FunctionCompletion { value }));
        Cqe { id: sqe.id, value }
    }
}

impl Subsystem for Function {
    fn kind(&self) -> Kind {
        "function"
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
                .name(format!("coro-function-{i}"))
                .spawn(move || {
                    while let Ok(sqe) = { let rx = rx.lock().expect("function queue mutex poisoned"); rx.recv() } {
                        completions.push(Self::process_one(sqe));
                    }
                })
                .expect("failed to spawn function worker thread");
            self.workers.push(handle);
        }
        debug!(workers = self.config.workers, "function subsystem started");
    }

    fn stop(&mut self) {
        self.tx.lock().expect("function queue mutex poisoned").take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        debug!("function subsystem stopped");
    }

    fn flush(&mut self, _time: i64) {}

    fn enqueue(&self, sqe: Sqe) -> Result<(), Sqe> {
        let guard = self.tx.lock().expect("function queue mutex poisoned");
        let Some(tx) = guard.as_ref() else { return Err(sqe) };
        match tx.try_send(sqe) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(sqe)) => {
                warn!("function queue full");
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

    use super::{Completion, Function, FunctionSubmission, Submission};
    use crate::Config;

    #[test]
    fn runs_the_thunk_and_captures_its_return_value() {
        let bus = AioSystem::new(8);
        let function = Function::new(Config::default(), bus.completion_sink());
        let sqe = Sqe {
            id: 7,
            value: Submission::Function(FunctionSubmission {
                f: Box::new(|| Ok(coro_bus::any::value("hi!".to_string()))),
            }),
        };
        let cqe = function.process(vec![sqe]).into_iter().next().unwrap();
        assert_eq!(cqe.id, 7);
        match cqe.value.unwrap() {
            Completion::Function(c) => {
                assert_eq!(coro_bus::any::downcast::<String>(&c.value).unwrap(), "hi!");
            }
            other => panic!("unexpected completion: {other:?}"),
        }
    }

    #[test]
    fn propagates_the_thunk_s_error() {
        #[derive(Debug, thiserror::Error)]
        #[error("boom")]
        struct Boom;

        let bus = AioSystem::new(8);
        let function = Function::new(Config::default(), bus.completion_sink());
        let sqe = Sqe {
            id: 9,
            value: Submission::Function(FunctionSubmission { f: Box::new(|| Err(coro_bus::any::error(Boom))) }),
        };
        let cqe = function.process(vec![sqe]).into_iter().next().unwrap();
        assert!(cqe.value.is_err());
    }
}
