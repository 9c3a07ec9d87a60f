use async_trait::async_trait;
use burrow_core::StorageError;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, JobError>;

#[derive(Debug, Clone, Error)]
pub enum JobError {
    #[error("job storage step failed: {0}")]
    Storage(#[from] StorageError),
}

/// Counters produced by one successful run, logged by the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport(BTreeMap<&'static str, u64>);

impl JobReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, counter: &'static str, value: u64) -> Self {
        self.0.insert(counter, value);
        self
    }

    pub fn get(&self, counter: &str) -> Option<u64> {
        self.0.get(counter).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.0.iter().map(|(name, value)| (*name, *value))
    }
}

impl Display for JobReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (name, value) in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{name}={value}")?;
            first = false;
        }
        Ok(())
    }
}

/// A unit of recurring work.
///
/// Runs must be idempotent: the scheduler gives no exactly-once guarantee,
/// and several runner processes may share one store.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Time between two runs.
    fn period(&self) -> Duration;

    async fn run(&self) -> Result<JobReport>;
}
