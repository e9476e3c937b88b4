use std::future::Future;
use std::io::{self, Write};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::abort::AbortSignal;
use crate::executor::{ExecutorError, Supervisor};
use crate::report;
use crate::scheduler::artifacts::{ArtifactsManager, ChunkResult, RunState};
use crate::scheduler::Chunk;

/// Wall clock the runner sleeps against.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        tokio::time::sleep(duration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    WaitingForStart,
    Running,
    WaitingForEnd,
    Terminated,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed { chunks: usize },
    Aborted(AbortSignal),
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

type RunnerResult<T> = Result<T, RunnerError>;

/// Runs one command per chunk, from the chunk's first AOS to its last LOS.
pub struct Runner<C, S, W> {
    clock: C,
    supervisor: S,
    out: W,
    command: Vec<String>,
    artifacts: Option<ArtifactsManager>,
}

impl<C, S, W> Runner<C, S, W>
where
    C: Clock,
    S: Supervisor,
    W: Write,
{
    pub fn new(clock: C, supervisor: S, out: W, command: Vec<String>) -> Self {
        Self {
            clock,
            supervisor,
            out,
            command,
            artifacts: None,
        }
    }

    pub fn with_artifacts(mut self, artifacts: ArtifactsManager) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// Process `chunks` strictly in order. The next chunk is not waited for
    /// until the previous chunk's process group has been signaled.
    ///
    /// A message on `abort`, or the sender going away, stops the run; a
    /// running process group is signaled first.
    pub async fn run(
        &mut self,
        chunks: &[Chunk],
        abort: &mut oneshot::Receiver<AbortSignal>,
    ) -> RunnerResult<RunOutcome> {
        for (i, chunk) in chunks.iter().enumerate() {
            let aborted = match self.run_chunk(i + 1, chunk, abort).await {
                Ok(aborted) => aborted,
                Err(e) => {
                    log::error!("Chunk {} failed: {}", i + 1, e);
                    if let Err(log_err) = self.finish(RunState::Failed) {
                        log::error!("Failed to update execution log: {}", log_err);
                    }
                    return Err(e);
                }
            };
            if let Some(signal) = aborted {
                log::warn!("Run aborted: {}", signal.reason);
                self.finish(RunState::Aborted)?;
                return Ok(RunOutcome::Aborted(signal));
            }
        }

        self.finish(RunState::Completed)?;
        Ok(RunOutcome::Completed {
            chunks: chunks.len(),
        })
    }

    async fn run_chunk(
        &mut self,
        index: usize,
        chunk: &Chunk,
        abort: &mut oneshot::Receiver<AbortSignal>,
    ) -> RunnerResult<Option<AbortSignal>> {
        enter(index, ChunkState::WaitingForStart);
        report::display(&mut self.out, chunk.windows())?;
        self.out.flush()?;

        let until_aos = self.delay_until(chunk.start());
        log::info!("Sleeping {} seconds until AOS", until_aos.as_secs());
        if let Some(signal) = self.wait(until_aos, abort).await {
            return Ok(Some(signal));
        }

        enter(index, ChunkState::Running);
        let started_at = self.clock.now();
        let handle = self.supervisor.spawn(index, &self.command)?;

        enter(index, ChunkState::WaitingForEnd);
        let until_los = self.delay_until(chunk.end());
        log::info!("Sleeping {} seconds until LOS", until_los.as_secs());
        let aborted = self.wait(until_los, abort).await;

        // Signal the whole group so children of the command go too
        let pgid = self.supervisor.group_id(&handle);
        let terminated = self.supervisor.terminate(handle);

        // Journaled even when signaling failed
        if let Some(artifacts) = self.artifacts.as_mut() {
            artifacts.add_chunk_result(ChunkResult {
                chunk_index: index,
                satellites: chunk.satellites(),
                scheduled_start: chunk.start(),
                scheduled_end: chunk.end(),
                started_at,
                terminated_at: self.clock.now(),
                pgid,
            })?;
        }

        terminated?;
        enter(index, ChunkState::Terminated);
        Ok(aborted)
    }

    /// Time left until `target`, zero when it has already passed.
    fn delay_until(&self, target: DateTime<Utc>) -> Duration {
        (target - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    async fn wait(
        &self,
        duration: Duration,
        abort: &mut oneshot::Receiver<AbortSignal>,
    ) -> Option<AbortSignal> {
        tokio::select! {
            biased;
            signal = &mut *abort => Some(
                signal.unwrap_or_else(|_| AbortSignal::new("abort channel closed")),
            ),
            _ = self.clock.sleep(duration) => None,
        }
    }

    fn finish(&mut self, state: RunState) -> RunnerResult<()> {
        let now = self.clock.now();
        if let Some(artifacts) = self.artifacts.as_mut() {
            artifacts.finish_with_state(state, now)?;
        }
        Ok(())
    }
}

fn enter(index: usize, state: ChunkState) {
    log::debug!("Chunk {}: {:?}", index, state);
}
