use std::{
    fs::OpenOptions,
    io,
    os::unix::process::{CommandExt, ExitStatusExt},
    path::PathBuf,
    process::{Child, Command as StdCommand, ExitStatus, Stdio},
    sync::{Arc, Mutex},
    thread,
};

use crate::executor::{ExecutorError, Supervisor};

/// A spawned command, leader of its own process group.
///
/// The leader is not reaped before the group has been signaled, so the pgid
/// cannot be reused by an unrelated group in the meantime.
#[derive(Debug)]
pub struct ProcessGroup {
    pub pgid: i32,
    chunk_index: usize,
    child: Child,
    exit_status: Arc<Mutex<Option<ExitStatus>>>,
}

impl ProcessGroup {
    /// Whether the group leader has exited. The leader stays a zombie until
    /// the group is terminated.
    pub fn has_exited(&self) -> bool {
        // SAFETY: an all-zero siginfo_t is a valid out-parameter
        let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
        // SAFETY: WNOWAIT leaves the child waitable; info outlives the call
        let rc = unsafe {
            libc::waitid(
                libc::P_PID,
                self.child.id() as libc::id_t,
                &mut info,
                libc::WEXITED | libc::WNOHANG | libc::WNOWAIT,
            )
        };
        // SAFETY: si_pid is filled in for WEXITED results, zero otherwise
        rc == 0 && unsafe { info.si_pid() } != 0
    }

    #[cfg(test)]
    fn exit_status_slot(&self) -> Arc<Mutex<Option<ExitStatus>>> {
        self.exit_status.clone()
    }
}

/// Runs commands as real process groups, optionally capturing their output
/// into `log_dir`.
#[derive(Debug, Default)]
pub struct ProcessGroupSupervisor {
    log_dir: Option<PathBuf>,
}

impl ProcessGroupSupervisor {
    pub fn new(log_dir: Option<PathBuf>) -> Self {
        Self { log_dir }
    }

    fn stdio(&self, chunk_index: usize) -> io::Result<(Stdio, Stdio)> {
        let Some(dir) = &self.log_dir else {
            return Ok((Stdio::inherit(), Stdio::inherit()));
        };

        let open = |stream: &str| {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(dir.join(format!("chunk_{:03}_{}.log", chunk_index, stream)))
        };

        Ok((Stdio::from(open("stdout")?), Stdio::from(open("stderr")?)))
    }
}

impl Supervisor for ProcessGroupSupervisor {
    type Handle = ProcessGroup;

    fn spawn(
        &mut self,
        chunk_index: usize,
        argv: &[String],
    ) -> Result<ProcessGroup, ExecutorError> {
        let (program, args) = argv.split_first().ok_or(ExecutorError::EmptyCommand)?;
        let (stdout, stderr) = self.stdio(chunk_index).map_err(ExecutorError::Output)?;

        log::info!("Executing command (chunk {}): {}", chunk_index, argv.join(" "));

        let child = StdCommand::new(program)
            .args(args)
            .process_group(0)
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|source| ExecutorError::Spawn {
                command: program.clone(),
                source,
            })?;

        // Leader of a new group: pgid == pid
        let pgid = child.id() as i32;
        log::info!("Chunk {} spawned (PGID: {})", chunk_index, pgid);

        Ok(ProcessGroup {
            pgid,
            chunk_index,
            child,
            exit_status: Arc::new(Mutex::new(None)),
        })
    }

    fn terminate(&mut self, group: ProcessGroup) -> Result<(), ExecutorError> {
        if group.has_exited() {
            log::info!(
                "Command exited early, signalling remaining group {}",
                group.pgid
            );
        } else {
            log::info!("Sending SIGTERM to process group {}", group.pgid);
        }

        // SAFETY: killpg has no memory safety preconditions
        let rc = unsafe { libc::killpg(group.pgid, libc::SIGTERM) };
        let result = if rc == 0 {
            Ok(())
        } else {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::ESRCH) {
                // Every process of the group has already exited
                log::debug!("Process group {} already gone", group.pgid);
                Ok(())
            } else {
                Err(ExecutorError::Signal {
                    pgid: group.pgid,
                    source: err,
                })
            }
        };

        let ProcessGroup {
            chunk_index,
            child,
            exit_status,
            ..
        } = group;
        thread::spawn(move || {
            monitor(child, chunk_index, exit_status);
        });

        result
    }

    fn group_id(&self, handle: &ProcessGroup) -> Option<i32> {
        Some(handle.pgid)
    }
}

/// Reap the group leader after its group was signaled and record how it
/// ended. The schedule never waits on this.
fn monitor(mut child: Child, chunk_index: usize, exit_status: Arc<Mutex<Option<ExitStatus>>>) {
    match child.wait() {
        Ok(status) => {
            match (status.code(), status.signal()) {
                (Some(code), _) => {
                    log::info!("Chunk {} command exited with code {}", chunk_index, code)
                }
                (None, Some(signal)) => {
                    log::info!("Chunk {} command terminated by signal {}", chunk_index, signal)
                }
                _ => log::info!("Chunk {} command finished: {}", chunk_index, status),
            }
            if let Ok(mut slot) = exit_status.lock() {
                *slot = Some(status);
            }
        }
        Err(e) => log::error!("Chunk {} wait error: {}", chunk_index, e),
    }
}
