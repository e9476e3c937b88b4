use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Completed,
    Aborted,
    Failed,
}

/// Keeps `execution_log.yaml` in the log directory up to date.
pub struct ArtifactsManager {
    base_dir: PathBuf,
    execution_log: ExecutionLog,
}

impl ArtifactsManager {
    pub fn new(base_dir: PathBuf, started_at: DateTime<Utc>) -> io::Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir,
            execution_log: ExecutionLog::new(started_at),
        })
    }

    pub fn add_chunk_result(&mut self, result: ChunkResult) -> io::Result<()> {
        self.execution_log.chunks.push(result);
        self.execution_log.save(&self.execution_log_path())
    }

    pub fn finish_with_state(&mut self, state: RunState, at: DateTime<Utc>) -> io::Result<()> {
        self.execution_log.state = state;
        self.execution_log.completed_at = Some(at);
        self.execution_log.save(&self.execution_log_path())
    }

    fn execution_log_path(&self) -> PathBuf {
        self.base_dir.join("execution_log.yaml")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkResult {
    pub chunk_index: usize,
    pub satellites: Vec<String>,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub terminated_at: DateTime<Utc>,
    pub pgid: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub chunks: Vec<ChunkResult>,
}

impl ExecutionLog {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            state: RunState::Running,
            started_at,
            completed_at: None,
            chunks: Vec::new(),
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        fs::write(
            path,
            serde_yaml::to_string(self)
                .map_err(|e| io::Error::other(format!("Failed to serialize log: {}", e)))?,
        )
    }
}
