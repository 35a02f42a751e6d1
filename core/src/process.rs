//! The process handle and its lifecycle state machine

use crate::channel::CommunicationChannel;
use crate::descriptor::ProcessDescriptor;
use crate::error::{ProcessError, Result};
use crate::sched::{Scheduler, TokioScheduler};
use crate::spawn;
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Fixed interval between status polls in the wait loop.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Lifecycle state of a child process.
///
/// Transitions are monotonic: `Created → Running → {Signaled | Exited |
/// Unsupported}`. The three right-hand states are terminal and sticky — once
/// reached, the status never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    /// The handle exists but `launch` has not succeeded yet.
    Created,
    /// The child was spawned and has not been observed to terminate.
    Running,
    /// The child was terminated by the given signal.
    Signaled(i32),
    /// The child exited normally with the given code.
    Exited(i32),
    /// The child reported a wait condition the model does not represent
    /// (stop/continue).
    Unsupported,
}

impl Status {
    /// True for `Signaled`, `Exited`, and `Unsupported`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Signaled(_) | Status::Exited(_) | Status::Unsupported)
    }
}

/// A single child process: launch configuration, stdio bindings, and the
/// observed lifecycle state.
///
/// A handle is built by the caller, launched at most once, then queried or
/// waited on until a terminal status is reached. It is intended for
/// single-owner, sequential use; nothing happens in the background and the
/// child is never killed by this handle — dropping it leaves the child
/// running.
#[derive(Debug)]
pub struct Process {
    descriptor: ProcessDescriptor,
    /// Standard input binding, wired into the child at launch.
    pub stdin: Option<CommunicationChannel>,
    /// Standard output binding, wired into the child at launch.
    pub stdout: Option<CommunicationChannel>,
    /// Standard error binding, wired into the child at launch.
    pub stderr: Option<CommunicationChannel>,
    pid: Option<Pid>,
    status: Status,
}

impl Process {
    /// Create a handle from a launch descriptor.
    pub fn new(descriptor: ProcessDescriptor) -> Self {
        Self {
            descriptor,
            stdin: None,
            stdout: None,
            stderr: None,
            pid: None,
            status: Status::Created,
        }
    }

    /// Handle for an executable resolved through `PATH`.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self::new(ProcessDescriptor::by_name(name))
    }

    /// Handle for an executable at a concrete path.
    pub fn by_path(path: impl Into<PathBuf>) -> Self {
        Self::new(ProcessDescriptor::by_path(path))
    }

    /// The launch configuration this handle was built with.
    pub fn descriptor(&self) -> &ProcessDescriptor {
        &self.descriptor
    }

    /// Process identifier, present once a launch has succeeded.
    pub fn pid(&self) -> Option<u32> {
        self.pid.map(|pid| pid.as_raw() as u32)
    }

    /// Spawn the child process.
    ///
    /// Fails with [`ProcessError::AlreadyLaunched`] if the handle already
    /// left the `Created` state — launch is strictly at-most-once. On
    /// success the handle records the child's pid, moves to `Running`, and
    /// closes the parent's copies of the pipe ends the child now owns.
    pub fn launch(&mut self) -> Result<()> {
        if self.status != Status::Created {
            warn!(status = ?self.status, "launch refused: handle already launched");
            return Err(ProcessError::AlreadyLaunched);
        }

        let pid = spawn::spawn_process(
            &self.descriptor,
            self.stdin.as_ref(),
            self.stdout.as_ref(),
            self.stderr.as_ref(),
        )?;

        // The child holds working duplicates of these ends; dropping the
        // parent's copies makes end-of-stream observable on both sides.
        if let Some(CommunicationChannel::Pipe(pipe)) = self.stdin.as_mut() {
            pipe.close_read();
        }
        if let Some(CommunicationChannel::Pipe(pipe)) = self.stdout.as_mut() {
            pipe.close_write();
        }
        if let Some(CommunicationChannel::Pipe(pipe)) = self.stderr.as_mut() {
            pipe.close_write();
        }

        self.pid = Some(pid);
        self.status = Status::Running;
        debug!(pid = pid.as_raw(), "process launched");
        Ok(())
    }

    /// Pure read of the cached status; never performs a reap check.
    pub fn cached_status(&self) -> Status {
        self.status
    }

    /// Explicit non-blocking reap check.
    ///
    /// Returns `true` once the status is terminal, `false` while the child
    /// is still running (or was never launched). A terminal status
    /// short-circuits without touching the OS, so the check is idempotent
    /// and never re-reaps.
    pub fn refresh(&mut self) -> Result<bool> {
        if self.status.is_terminal() {
            return Ok(true);
        }
        let Some(pid) = self.pid else {
            return Ok(false);
        };
        match spawn::reap(pid)? {
            Some(status) => {
                self.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Current status, refreshing once first if the cached value is
    /// `Running`. Refresh failures leave the cache untouched; `Created` and
    /// terminal values are returned directly.
    pub fn status(&mut self) -> Status {
        if self.status == Status::Running {
            let _ = self.refresh();
        }
        self.status
    }

    /// Wait until the child reaches a terminal status, polling every
    /// [`POLL_INTERVAL`] on the tokio timer. Unbounded.
    pub async fn wait_until_exit(&mut self) -> Result<Status> {
        self.wait_with(None, &TokioScheduler).await
    }

    /// Wait like [`Process::wait_until_exit`], failing with
    /// [`ProcessError::Timeout`] if the child is still running when
    /// `timeout` elapses. A timeout never terminates the child; it keeps
    /// running and stays reapable.
    pub async fn wait_timeout(&mut self, timeout: Duration) -> Result<Status> {
        self.wait_with(Some(timeout), &TokioScheduler).await
    }

    /// Wait loop with an explicit deadline and scheduling capability.
    ///
    /// Each iteration performs one non-blocking status check, then suspends
    /// through `scheduler` — the only suspension point, so the same loop
    /// cooperates with an event loop or a blocking runtime.
    pub async fn wait_with(
        &mut self,
        timeout: Option<Duration>,
        scheduler: &dyn Scheduler,
    ) -> Result<Status> {
        if self.status == Status::Created {
            return Err(ProcessError::System(io::Error::new(
                io::ErrorKind::InvalidInput,
                "process has not been launched",
            )));
        }

        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let status = self.status();
            if status.is_terminal() {
                return Ok(status);
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(ProcessError::Timeout);
                }
            }
            scheduler.suspend(POLL_INTERVAL).await;
        }
    }
}
