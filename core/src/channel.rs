//! Standard-I/O endpoints for child processes
//!
//! A [`CommunicationChannel`] binds one of a child's standard streams to
//! either an OS pipe or a file on disk. Reads on a channel never fail: I/O
//! and decode errors degrade to empty output so callers draining a child's
//! stdout/stderr do not have to thread error handling through their loop.

use crate::error::{ProcessError, Result};
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::unistd;
use std::fs;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::path::PathBuf;

const READ_CHUNK: usize = 4096;

/// An anonymous OS pipe with two independently closable ends.
///
/// After a launch, the parent keeps only the end it uses (the write end of a
/// stdin pipe, the read end of stdout/stderr pipes); the other end is closed
/// so the child sees end-of-stream semantics correctly.
#[derive(Debug)]
pub struct Pipe {
    read: Option<OwnedFd>,
    write: Option<OwnedFd>,
}

impl Pipe {
    /// Create a new pipe pair.
    pub fn new() -> Result<Self> {
        let (read, write) = unistd::pipe()?;
        Ok(Self {
            read: Some(read),
            write: Some(write),
        })
    }

    pub(crate) fn read_raw(&self) -> Option<RawFd> {
        self.read.as_ref().map(|fd| fd.as_raw_fd())
    }

    pub(crate) fn write_raw(&self) -> Option<RawFd> {
        self.write.as_ref().map(|fd| fd.as_raw_fd())
    }

    /// Close the read end, if still open.
    pub fn close_read(&mut self) {
        self.read.take();
    }

    /// Close the write end, if still open. For a stdin pipe this signals
    /// end-of-stream to the child.
    pub fn close_write(&mut self) {
        self.write.take();
    }

    /// Write the whole buffer to the write end, retrying on short writes and
    /// EINTR.
    pub fn write_all(&mut self, mut data: &[u8]) -> Result<()> {
        let fd = self.write.as_ref().ok_or_else(|| {
            ProcessError::System(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "pipe write end is closed",
            ))
        })?;
        while !data.is_empty() {
            match unistd::write(fd, data) {
                Ok(0) => break,
                Ok(n) => data = &data[n..],
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Blocking drain of the read end until end-of-stream. Errors terminate
    /// the drain and yield whatever was read so far.
    pub fn read_to_end(&self) -> Vec<u8> {
        let Some(fd) = self.read.as_ref() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match unistd::read(fd.as_raw_fd(), &mut buf) {
                Ok(0) => break,
                Ok(n) => out.extend_from_slice(&buf[..n]),
                Err(Errno::EINTR) => continue,
                Err(_) => break,
            }
        }
        out
    }

    /// Non-blocking partial read: returns whatever bytes are immediately
    /// available on the read end without waiting for end-of-stream.
    ///
    /// The read end is flipped to `O_NONBLOCK` for the duration of the drain
    /// and restored afterwards, so a later [`Pipe::read_to_end`] still blocks
    /// as usual.
    pub fn available_data(&self) -> Vec<u8> {
        let Some(fd) = self.read.as_ref() else {
            return Vec::new();
        };
        let Ok(flags) = fcntl(fd.as_raw_fd(), FcntlArg::F_GETFL) else {
            return Vec::new();
        };
        let original = OFlag::from_bits_retain(flags);
        if fcntl(fd.as_raw_fd(), FcntlArg::F_SETFL(original | OFlag::O_NONBLOCK)).is_err() {
            return Vec::new();
        }

        let mut out = Vec::new();
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match unistd::read(fd.as_raw_fd(), &mut buf) {
                Ok(0) => break,
                Ok(n) => out.extend_from_slice(&buf[..n]),
                Err(Errno::EINTR) => continue,
                // EAGAIN: nothing more right now
                Err(_) => break,
            }
        }

        let _ = fcntl(fd.as_raw_fd(), FcntlArg::F_SETFL(original));
        out
    }
}

/// A stdio endpoint for a child process: an OS pipe or a file path.
#[derive(Debug)]
pub enum CommunicationChannel {
    /// An anonymous pipe shared with the child.
    Pipe(Pipe),
    /// A file opened in the child via spawn file actions (read-only for
    /// stdin, write/create/truncate for stdout and stderr).
    File(PathBuf),
}

impl CommunicationChannel {
    /// Create a pipe-backed channel.
    pub fn pipe() -> Result<Self> {
        Ok(Self::Pipe(Pipe::new()?))
    }

    /// Create a file-backed channel.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Fully drain the channel and decode it as UTF-8, trimming surrounding
    /// whitespace. On a pipe this blocks until end-of-stream; on a file it
    /// reads the full content. Decode or I/O failures yield an empty string.
    pub fn read_all_text(&self) -> String {
        match self {
            Self::Pipe(pipe) => text_from(pipe.read_to_end()),
            Self::File(path) => fs::read(path).map(text_from).unwrap_or_default(),
        }
    }

    /// Return whatever bytes are immediately available without waiting for
    /// end-of-stream. Used for incremental draining while the child is still
    /// running. Failures degrade to an empty buffer.
    pub fn available_data(&self) -> Vec<u8> {
        match self {
            Self::Pipe(pipe) => pipe.available_data(),
            Self::File(path) => fs::read(path).unwrap_or_default(),
        }
    }
}

fn text_from(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text.trim().to_string(),
        Err(_) => String::new(),
    }
}
