use std::io;

use thiserror::Error;

mod process;

pub use process::ProcessGroupSupervisor;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("no command given")]
    EmptyCommand,
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to open output log: {0}")]
    Output(#[source] io::Error),
    #[error("failed to signal process group {pgid}: {source}")]
    Signal {
        pgid: i32,
        #[source]
        source: io::Error,
    },
}

/// Starts a command in its own process group and terminates the whole group.
pub trait Supervisor {
    type Handle;

    /// Launch `argv` for the chunk with the given index.
    fn spawn(&mut self, chunk_index: usize, argv: &[String]) -> Result<Self::Handle, ExecutorError>;

    /// Signal every process in the handle's group. Does not wait for exit.
    fn terminate(&mut self, handle: Self::Handle) -> Result<(), ExecutorError>;

    /// Process group id behind a handle, when there is one.
    fn group_id(&self, handle: &Self::Handle) -> Option<i32>;
}
