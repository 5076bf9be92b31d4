//! Bounded worker pool.
//!
//! A pool is created with a concurrency limit and an ordered list of jobs
//! (content file paths). [`WorkerPool::start`] dispatches jobs in list order,
//! never running more than `limit` at once, and resolves when every job has
//! produced an outcome:
//!
//! ```text
//! jobs:     a  b  c  d  e          limit = 2
//!
//! slot 1:   a────┐ c──┐ d─────────┐
//! slot 2:   b─────────┘ e───┐     │
//!                            └─────┴→ results { a, b, c, d, e }
//! ```
//!
//! A free slot is handed to the next job as soon as any job finishes, so
//! completion order is unconstrained. One job failing never cancels the
//! others; every job ends up in the results map exactly once, keyed by its
//! input path.
//!
//! How a job actually runs is a [`JobRunner`]:
//!
//! | Runner | Isolation |
//! |--------|-----------|
//! | [`ProcessRunner`] | fresh `lazysite worker` process per job, JSON over stdio |
//! | [`InProcessRunner`] | tokio task in the build process |
//!
//! With a job timeout set, a job that runs too long is recorded as a
//! protocol error and its worker process killed. Without one, a worker that
//! never replies leaves the pool pending.

use crate::imaging::DimensionProbe;
use crate::page;
use crate::protocol;
use crate::types::{BuildContext, PageOutput};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Semaphore;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("You must provide a worker pool size greater than 0")]
    Configuration,
}

/// Why a single job did not produce a page.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// The worker ran and replied with an error.
    #[error("{0}")]
    Page(String),
    /// The worker's output could not be understood, it died, or it ran out
    /// of time.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Outcome of every job, keyed by input path.
pub type JobResults = BTreeMap<PathBuf, Result<PageOutput, JobError>>;

/// Runs one page build.
pub trait JobRunner: Send + Sync + 'static {
    fn run(
        &self,
        job: &Path,
        context: &BuildContext,
    ) -> impl Future<Output = Result<PageOutput, JobError>> + Send;
}

#[derive(Debug)]
pub struct WorkerPool {
    limit: usize,
    jobs: Vec<PathBuf>,
    job_timeout: Option<Duration>,
}

impl WorkerPool {
    /// A pool running at most `limit` of `jobs` at once. Duplicate paths
    /// are dispatched once.
    pub fn new(limit: usize, jobs: Vec<PathBuf>) -> Result<Self, PoolError> {
        if limit == 0 {
            return Err(PoolError::Configuration);
        }
        let mut seen = HashSet::new();
        let jobs = jobs
            .into_iter()
            .filter(|job| seen.insert(job.clone()))
            .collect();
        Ok(Self {
            limit,
            jobs,
            job_timeout: None,
        })
    }

    pub fn with_job_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.job_timeout = timeout;
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn jobs(&self) -> &[PathBuf] {
        &self.jobs
    }

    /// Run every job and collect the outcomes.
    pub async fn start<R: JobRunner>(self, runner: Arc<R>, context: Arc<BuildContext>) -> JobResults {
        let slots = Arc::new(Semaphore::new(self.limit));
        let mut results = JobResults::new();
        let mut handles = Vec::with_capacity(self.jobs.len());

        for job in self.jobs {
            // Acquiring before spawning keeps dispatch in submission order.
            let permit = match Arc::clone(&slots).acquire_owned().await {
                Ok(permit) => permit,
                Err(err) => {
                    results.insert(job, Err(JobError::Protocol(err.to_string())));
                    continue;
                }
            };

            let runner = Arc::clone(&runner);
            let context = Arc::clone(&context);
            let timeout = self.job_timeout;
            let task_job = job.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                let started = Instant::now();
                tracing::debug!(job = %task_job.display(), "dispatched");
                let outcome = run_with_timeout(&*runner, &task_job, &context, timeout).await;
                match &outcome {
                    Ok(_) => tracing::debug!(
                        job = %task_job.display(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "completed"
                    ),
                    Err(err) => tracing::warn!(job = %task_job.display(), error = %err, "job failed"),
                }
                outcome
            });
            handles.push((job, handle));
        }

        for (job, handle) in handles {
            let outcome = handle
                .await
                .unwrap_or_else(|err| Err(JobError::Protocol(format!("job task failed: {err}"))));
            results.insert(job, outcome);
        }
        results
    }
}

async fn run_with_timeout<R: JobRunner>(
    runner: &R,
    job: &Path,
    context: &BuildContext,
    timeout: Option<Duration>,
) -> Result<PageOutput, JobError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, runner.run(job, context))
            .await
            .unwrap_or_else(|_| {
                Err(JobError::Protocol(format!(
                    "no reply within {} ms",
                    limit.as_millis()
                )))
            }),
        None => runner.run(job, context).await,
    }
}

// ============================================================================
// Runners
// ============================================================================

/// One child process per job.
///
/// Spawns `program args.. <job>`, writes the run message to its stdin, and
/// reads the reply from the last non-empty line of its stdout. Dropping the
/// future (on timeout) kills the child.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// This executable's `worker` subcommand.
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, vec!["worker".to_string()]))
    }
}

impl JobRunner for ProcessRunner {
    async fn run(&self, job: &Path, context: &BuildContext) -> Result<PageOutput, JobError> {
        let message =
            protocol::encode_run(context).map_err(|err| JobError::Protocol(err.to_string()))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(job)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                JobError::Protocol(format!(
                    "unable to start worker {}: {err}",
                    self.program.display()
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A worker that already gave up closes its end; its reply says why.
            let sent = async {
                stdin.write_all(message.as_bytes()).await?;
                stdin.write_all(b"\n").await?;
                stdin.flush().await
            };
            if let Err(err) = sent.await {
                tracing::debug!(job = %job.display(), "run message not delivered: {err}");
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|err| JobError::Protocol(format!("worker failed: {err}")))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let Some(line) = stdout.lines().rev().find(|line| !line.trim().is_empty()) else {
            return Err(JobError::Protocol(format!(
                "worker exited ({}) without a reply",
                output.status
            )));
        };

        protocol::decode_reply(line.trim())
            .map_err(|err| JobError::Protocol(err.to_string()))?
            .map_err(JobError::Page)
    }
}

/// One tokio task per job, sharing the build process.
pub struct InProcessRunner<P> {
    probe: P,
}

impl<P> InProcessRunner<P> {
    pub fn new(probe: P) -> Self {
        Self { probe }
    }
}

impl<P: DimensionProbe + 'static> JobRunner for InProcessRunner<P> {
    async fn run(&self, job: &Path, context: &BuildContext) -> Result<PageOutput, JobError> {
        page::build_page(job, context, &self.probe)
            .await
            .map_err(|err| JobError::Page(err.to_string()))
    }
}
