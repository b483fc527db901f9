//! Simulated progress for the synchronous upload
//!
//! The backend reports nothing until the whole matrix is done, so progress
//! while waiting is invented: a random walk that creeps toward a cap and never
//! reaches 100 on its own. Only the orchestrator announces completion.

use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::config::ProgressConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Idle,
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct JobProgress {
    pub percent: u8,
    pub completed: u64,
    pub total: u64,
    pub status: JobStatus,
}

impl JobProgress {
    pub fn processing(total: u64) -> Self {
        Self {
            percent: 0,
            completed: 0,
            total,
            status: JobStatus::Processing,
        }
    }

    pub fn completed(total_pairs: u64) -> Self {
        Self {
            percent: 100,
            completed: total_pairs,
            total: total_pairs,
            status: JobStatus::Completed,
        }
    }

    /// Failure keeps whatever percent was last shown
    pub fn failed(percent: u8, total: u64) -> Self {
        Self {
            percent,
            completed: 0,
            total,
            status: JobStatus::Error,
        }
    }
}

/// Where progress updates are published
pub type ProgressSink = UnboundedSender<JobProgress>;

type Increment = Box<dyn FnMut() -> f64 + Send>;

/// Handle to a running simulation. Stops the task when dropped.
#[derive(Debug)]
pub struct ProgressSimulator {
    task: Option<JoinHandle<()>>,
    last_percent: Arc<AtomicU8>,
}

impl ProgressSimulator {
    /// Start with random increments in `[0, max_increment)`
    pub fn start(total: u64, config: &ProgressConfig, sink: ProgressSink) -> Self {
        let max = config.max_increment;
        let increment: Increment = Box::new(move || {
            if max > 0.0 {
                rand::rng().random_range(0.0..max)
            } else {
                0.0
            }
        });
        Self::start_with(total, config, sink, increment)
    }

    /// Start with a caller-supplied increment per tick
    pub fn start_with(
        total: u64,
        config: &ProgressConfig,
        sink: ProgressSink,
        increment: impl FnMut() -> f64 + Send + 'static,
    ) -> Self {
        let last_percent = Arc::new(AtomicU8::new(0));
        let period = config.tick_interval();
        let cap = f64::from(config.cap_percent.min(99));

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let task = tokio::spawn(simulate(
            ticker,
            Box::new(increment),
            total,
            cap,
            sink,
            last_percent.clone(),
        ));

        Self {
            task: Some(task),
            last_percent,
        }
    }

    /// Highest percent published so far
    pub fn last_percent(&self) -> u8 {
        self.last_percent.load(Ordering::SeqCst)
    }

    /// True once the simulation reached its cap or was stopped
    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Stop the simulation and wait for the task to wind down.
    /// Returns the last published percent.
    pub async fn stop(mut self) -> u8 {
        if let Some(task) = self.task.take() {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    log::warn!("Progress simulator ended abnormally: {}", e);
                }
            }
        }
        self.last_percent()
    }
}

impl Drop for ProgressSimulator {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn simulate(
    mut ticker: tokio::time::Interval,
    mut increment: Increment,
    total: u64,
    cap: f64,
    sink: ProgressSink,
    last_percent: Arc<AtomicU8>,
) {
    let mut simulated = 0.0_f64;
    loop {
        ticker.tick().await;

        simulated = (simulated + increment().max(0.0)).min(cap);
        let percent = simulated.floor() as u8;

        if percent > last_percent.load(Ordering::SeqCst) {
            last_percent.store(percent, Ordering::SeqCst);
            let completed = (total as f64 * simulated / 100.0).floor() as u64;
            let update = JobProgress {
                percent,
                completed,
                total,
                status: JobStatus::Processing,
            };
            if sink.send(update).is_err() {
                log::debug!("Progress receiver dropped, stopping simulation");
                return;
            }
        }

        if simulated >= cap {
            log::debug!("Simulated progress reached {}%, waiting for the backend", percent);
            return;
        }
    }
}
