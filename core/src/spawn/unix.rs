//! Unix launcher built on posix_spawn
//!
//! This module does the native-resource marshalling for a launch: the
//! null-terminated argv and envp vectors, the file-action list that wires the
//! child's descriptor table, and the spawn call itself. Everything acquired
//! here is scoped — `CString` buffers and the file-action list are released
//! by Drop on every exit path, success or failure.
//!
//! The child's working directory is set with an `addchdir` file action
//! instead of mutating the parent's process-wide cwd around the spawn, so
//! concurrent launches share no global state. The action runs before exec,
//! so a relative executable path still resolves against the new directory.

// posix_spawn and the file-action list are raw libc surface
#![allow(unsafe_code)]

use crate::channel::CommunicationChannel;
use crate::descriptor::{ProcessDescriptor, Source};
use crate::error::{ProcessError, Result};
use crate::process::Status;
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use std::ffi::{CStr, CString};
use std::io;
use std::mem::MaybeUninit;
use std::os::raw::{c_char, c_int};
use std::os::unix::ffi::OsStrExt;
use std::ptr;
use tracing::{debug, error};

/// RAII wrapper around `posix_spawn_file_actions_t`; the action list is
/// destroyed on Drop so failure paths cannot leak it.
struct FileActions {
    inner: libc::posix_spawn_file_actions_t,
}

impl FileActions {
    fn new() -> Result<Self> {
        let mut inner = MaybeUninit::uninit();
        ensure_zero(unsafe { libc::posix_spawn_file_actions_init(inner.as_mut_ptr()) })?;
        Ok(Self {
            inner: unsafe { inner.assume_init() },
        })
    }

    /// Duplicate `source` onto `target` in the child's descriptor table.
    fn add_dup2(&mut self, source: c_int, target: c_int) -> Result<()> {
        ensure_zero(unsafe {
            libc::posix_spawn_file_actions_adddup2(&mut self.inner, source, target)
        })
    }

    /// Close `fd` in the child before exec.
    fn add_close(&mut self, fd: c_int) -> Result<()> {
        ensure_zero(unsafe { libc::posix_spawn_file_actions_addclose(&mut self.inner, fd) })
    }

    /// Open `path` in the child and place the descriptor at `target`.
    fn add_open(&mut self, target: c_int, path: &CStr, oflag: c_int, mode: libc::mode_t) -> Result<()> {
        ensure_zero(unsafe {
            libc::posix_spawn_file_actions_addopen(
                &mut self.inner,
                target,
                path.as_ptr(),
                oflag,
                mode,
            )
        })
    }

    /// Change the child's working directory before exec.
    fn add_chdir(&mut self, dir: &CStr) -> Result<()> {
        ensure_zero(unsafe {
            libc::posix_spawn_file_actions_addchdir_np(&mut self.inner, dir.as_ptr())
        })
    }
}

impl Drop for FileActions {
    fn drop(&mut self) {
        unsafe {
            libc::posix_spawn_file_actions_destroy(&mut self.inner);
        }
    }
}

/// Spawn a child process for `descriptor` with the given channel bindings.
///
/// `Source::Name` uses the PATH-searching `posix_spawnp`, `Source::Path` the
/// direct `posix_spawn`. Returns the child's pid; the caller records it and
/// advances the handle's status.
pub(crate) fn spawn_process(
    descriptor: &ProcessDescriptor,
    stdin: Option<&CommunicationChannel>,
    stdout: Option<&CommunicationChannel>,
    stderr: Option<&CommunicationChannel>,
) -> Result<Pid> {
    let program = match &descriptor.source {
        Source::Name(name) => cstring(name.as_bytes())?,
        Source::Path(path) => cstring(path.as_os_str().as_bytes())?,
    };

    // argv: the executable as argv[0], then the configured arguments
    let mut argv_owned = Vec::with_capacity(descriptor.args.len() + 1);
    argv_owned.push(program.clone());
    for arg in &descriptor.args {
        argv_owned.push(cstring(arg.as_bytes())?);
    }
    let mut argv: Vec<*mut c_char> = argv_owned
        .iter()
        .map(|arg| arg.as_ptr() as *mut c_char)
        .collect();
    argv.push(ptr::null_mut());

    // envp: "KEY=VALUE" block, null-terminated
    let mut envp_owned = Vec::with_capacity(descriptor.env.len());
    for (key, value) in &descriptor.env {
        envp_owned.push(cstring(format!("{key}={value}").into_bytes())?);
    }
    let mut envp: Vec<*mut c_char> = envp_owned
        .iter()
        .map(|pair| pair.as_ptr() as *mut c_char)
        .collect();
    envp.push(ptr::null_mut());

    let mut actions = FileActions::new()?;
    // keeps addopen path buffers alive until the spawn call
    let mut action_paths: Vec<CString> = Vec::new();

    if let Some(channel) = stdin {
        wire_stdin(&mut actions, channel, &mut action_paths)?;
    }
    if let Some(channel) = stdout {
        wire_output(&mut actions, channel, libc::STDOUT_FILENO, &mut action_paths)?;
    }
    if let Some(channel) = stderr {
        wire_output(&mut actions, channel, libc::STDERR_FILENO, &mut action_paths)?;
    }

    let cwd = cstring(descriptor.current_dir.as_os_str().as_bytes())?;
    actions.add_chdir(&cwd)?;

    debug!(source = ?descriptor.source, args = ?descriptor.args, "spawning process");

    let mut pid: libc::pid_t = 0;
    let rc = unsafe {
        match &descriptor.source {
            Source::Name(_) => libc::posix_spawnp(
                &mut pid,
                program.as_ptr(),
                &actions.inner,
                ptr::null(),
                argv.as_ptr(),
                envp.as_ptr(),
            ),
            Source::Path(_) => libc::posix_spawn(
                &mut pid,
                program.as_ptr(),
                &actions.inner,
                ptr::null(),
                argv.as_ptr(),
                envp.as_ptr(),
            ),
        }
    };
    if rc != 0 {
        let err = io::Error::from_raw_os_error(rc);
        error!(source = ?descriptor.source, %err, "posix_spawn failed");
        return Err(ProcessError::System(err));
    }

    Ok(Pid::from_raw(pid))
}

/// One non-blocking reap check, retried transparently on EINTR.
///
/// Returns `None` while the child is still running. Termination is decoded
/// through the platform's own wait-status layout: terminated by signal,
/// exited with a code, or — for stop/continue conditions the model does not
/// represent — [`Status::Unsupported`].
pub(crate) fn reap(pid: Pid) -> Result<Option<Status>> {
    loop {
        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => return Ok(None),
            Ok(WaitStatus::Exited(_, code)) => {
                debug!(pid = pid.as_raw(), code, "process exited");
                return Ok(Some(Status::Exited(code)));
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                debug!(pid = pid.as_raw(), signal = signal as i32, "process terminated by signal");
                return Ok(Some(Status::Signaled(signal as i32)));
            }
            Ok(_) => return Ok(Some(Status::Unsupported)),
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

fn wire_stdin(
    actions: &mut FileActions,
    channel: &CommunicationChannel,
    paths: &mut Vec<CString>,
) -> Result<()> {
    match channel {
        CommunicationChannel::Pipe(pipe) => {
            actions.add_dup2(pipe_fd(pipe.read_raw())?, libc::STDIN_FILENO)?;
            actions.add_close(pipe_fd(pipe.write_raw())?)?;
        }
        CommunicationChannel::File(path) => {
            let path = cstring(path.as_os_str().as_bytes())?;
            actions.add_open(libc::STDIN_FILENO, &path, libc::O_RDONLY, 0)?;
            paths.push(path);
        }
    }
    Ok(())
}

fn wire_output(
    actions: &mut FileActions,
    channel: &CommunicationChannel,
    target: c_int,
    paths: &mut Vec<CString>,
) -> Result<()> {
    match channel {
        CommunicationChannel::Pipe(pipe) => {
            actions.add_dup2(pipe_fd(pipe.write_raw())?, target)?;
            actions.add_close(pipe_fd(pipe.read_raw())?)?;
        }
        CommunicationChannel::File(path) => {
            let path = cstring(path.as_os_str().as_bytes())?;
            actions.add_open(
                target,
                &path,
                libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC,
                0o644,
            )?;
            paths.push(path);
        }
    }
    Ok(())
}

fn pipe_fd(fd: Option<c_int>) -> Result<c_int> {
    fd.ok_or_else(|| {
        ProcessError::System(io::Error::new(
            io::ErrorKind::InvalidInput,
            "pipe end already closed",
        ))
    })
}

fn cstring(bytes: impl Into<Vec<u8>>) -> Result<CString> {
    CString::new(bytes).map_err(|_| {
        ProcessError::System(io::Error::new(
            io::ErrorKind::InvalidInput,
            "embedded NUL byte in argument or environment",
        ))
    })
}

/// posix_spawn-family calls report failure through their return value, not
/// errno.
fn ensure_zero(rc: c_int) -> Result<()> {
    if rc == 0 {
        Ok(())
    } else {
        Err(ProcessError::System(io::Error::from_raw_os_error(rc)))
    }
}
