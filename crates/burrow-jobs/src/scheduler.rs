use crate::job::{Job, JobReport, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// `tokio::time::interval` panics on a zero period.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Registry of jobs, each run on its own interval.
#[derive(Default)]
pub struct Scheduler {
    jobs: Vec<Arc<dyn Job>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, job: impl Job) -> &mut Self {
        self.jobs.push(Arc::new(job));
        self
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Runs every job once, in registration order, and returns each outcome
    /// keyed by job name.
    pub async fn run_once(&self) -> Vec<(String, Result<JobReport>)> {
        let mut outcomes = Vec::with_capacity(self.jobs.len());
        for job in &self.jobs {
            let outcome = run_logged(job.as_ref()).await;
            outcomes.push((job.name().to_string(), outcome));
        }
        outcomes
    }

    /// Spawns one task per job. Each job runs immediately, then once per
    /// period; a run that overruns its period skips the missed ticks.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tasks = self
            .jobs
            .into_iter()
            .map(|job| tokio::spawn(job_loop(job, shutdown_rx.clone())))
            .collect();

        SchedulerHandle { shutdown_tx, tasks }
    }
}

async fn job_loop(job: Arc<dyn Job>, mut shutdown_rx: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(job.period().max(MIN_PERIOD));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let _ = run_logged(job.as_ref()).await;
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!(job = job.name(), "Job loop stopped");
                    break;
                }
            }
        }
    }
}

async fn run_logged(job: &dyn Job) -> Result<JobReport> {
    info!(job = job.name(), "Job run started");
    let outcome = job.run().await;
    match &outcome {
        Ok(report) => info!(job = job.name(), report = %report, "Job run succeeded"),
        Err(e) => error!(job = job.name(), error = %e, "Job run failed"),
    }
    outcome
}

/// Stops the tasks spawned by [`Scheduler::start`].
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Signals every job loop to stop and waits for them. A run in progress
    /// is allowed to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Job task ended abnormally");
            }
        }
    }
}
