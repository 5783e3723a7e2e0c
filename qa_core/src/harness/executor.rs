//! Bounded compute executor.
//!
//! Runs a calculator's compute function on one persistent worker thread and
//! waits for each call with a timeout. Elapsed time is measured inside the
//! worker, so channel latency does not inflate the statistics. A worker that
//! misses its deadline is abandoned (its channels are dropped, so it exits
//! once the stuck call returns) and the next call spawns a fresh one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::calculator::Calculator;
use crate::errors::ComputeError;
use crate::values::FieldMap;

/// Cooperative cancellation flag shared between a caller and a run.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Why a call produced no compute result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecError {
    #[error("calculation exceeded {0:?}")]
    TimedOut(Duration),

    #[error("could not start compute worker: {0}")]
    Spawn(String),

    #[error("compute worker exited unexpectedly")]
    WorkerLost,
}

/// Compute result plus time spent inside compute.
#[derive(Debug, Clone)]
pub struct TimedCall {
    pub outputs: Result<FieldMap, ComputeError>,
    pub elapsed: Duration,
}

impl TimedCall {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

struct Worker {
    jobs: Sender<FieldMap>,
    results: Receiver<TimedCall>,
}

/// Single-worker executor with a per-call timeout.
pub struct BoundedExecutor {
    calculator: Calculator,
    timeout: Duration,
    worker: Option<Worker>,
    spawned: usize,
}

impl BoundedExecutor {
    pub fn new(calculator: Calculator, timeout: Duration) -> Self {
        BoundedExecutor {
            calculator,
            timeout,
            worker: None,
            spawned: 0,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Workers started so far (one plus one per abandoned worker).
    pub fn workers_spawned(&self) -> usize {
        self.spawned
    }

    /// Run compute once on the worker, waiting at most the configured timeout.
    pub fn call(&mut self, inputs: &FieldMap) -> Result<TimedCall, ExecError> {
        let worker = match self.worker.take() {
            Some(worker) => worker,
            None => self.spawn()?,
        };

        if worker.jobs.send(inputs.clone()).is_err() {
            return Err(ExecError::WorkerLost);
        }

        match worker.results.recv_timeout(self.timeout) {
            Ok(call) => {
                self.worker = Some(worker);
                Ok(call)
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    calculator_id = %self.calculator.id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "compute timed out; abandoning worker"
                );
                Err(ExecError::TimedOut(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(ExecError::WorkerLost),
        }
    }

    fn spawn(&mut self) -> Result<Worker, ExecError> {
        let (job_tx, job_rx) = mpsc::channel::<FieldMap>();
        let (result_tx, result_rx) = mpsc::channel::<TimedCall>();
        let calculator = self.calculator.clone();

        thread::Builder::new()
            .name(format!("qa-compute-{}", self.calculator.id))
            .spawn(move || {
                for inputs in job_rx {
                    let start = Instant::now();
                    let outputs = calculator.compute(&inputs);
                    let elapsed = start.elapsed();
                    if result_tx.send(TimedCall { outputs, elapsed }).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| ExecError::Spawn(e.to_string()))?;

        self.spawned += 1;
        debug!(calculator_id = %self.calculator.id, workers = self.spawned, "spawned compute worker");

        Ok(Worker {
            jobs: job_tx,
            results: result_rx,
        })
    }
}
