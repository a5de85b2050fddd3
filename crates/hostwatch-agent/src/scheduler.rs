//! Independent periodic jobs with per-job fault isolation.
//!
//! Each registered [`Job`] runs in its own task, looping on its own
//! interval. A tick's action is awaited inside the loop, so a job never
//! overlaps itself; a slow tick simply delays the next one
//! ([`MissedTickBehavior::Delay`] — late ticks are not queued or
//! compensated). An action returning `Err` is logged and dropped: nothing
//! propagates across ticks or across jobs.
//!
//! State machine per job: `Idle → Running → (Succeeded|Failed) → Idle`,
//! until the shared cancellation token fires.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::AgentError;

type JobFuture = Pin<Box<dyn Future<Output = Result<(), AgentError>> + Send>>;
type JobAction = Box<dyn FnMut() -> JobFuture + Send>;

/// A named periodic unit of work.
pub struct Job {
    name: &'static str,
    interval: Duration,
    action: JobAction,
}

impl Job {
    pub fn new<F, Fut>(name: &'static str, interval: Duration, mut action: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), AgentError>> + Send + 'static,
    {
        Job {
            name,
            interval,
            action: Box::new(move || Box::pin(action())),
        }
    }
}

/// Spawns one task per registered job and lets them run until the
/// cancellation token fires.
pub struct JobScheduler {
    jobs: Vec<Job>,
    cancel: CancellationToken,
}

impl JobScheduler {
    #[must_use]
    pub fn new(cancel: CancellationToken) -> Self {
        JobScheduler {
            jobs: Vec::new(),
            cancel,
        }
    }

    pub fn register(&mut self, job: Job) {
        self.jobs.push(job);
    }

    /// Starts every job. The returned handles complete once the
    /// cancellation token fires.
    #[must_use]
    pub fn spawn_all(self) -> Vec<JoinHandle<()>> {
        let cancel = self.cancel;
        self.jobs
            .into_iter()
            .map(|job| {
                let cancel = cancel.clone();
                tokio::spawn(run_job(job, cancel))
            })
            .collect()
    }
}

async fn run_job(mut job: Job, cancel: CancellationToken) {
    let mut ticker = interval(job.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // discard first tick, which is instantaneous

    debug!("SCHED | Job {} started ({:?} interval)", job.name, job.interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match (job.action)().await {
                    Ok(()) => debug!("SCHED | Job {} tick completed", job.name),
                    Err(e) => error!("SCHED | Job {} tick failed: {}", job.name, e),
                }
            }
            () = cancel.cancelled() => {
                debug!("SCHED | Job {} stopped", job.name);
                break;
            }
        }
    }
}
