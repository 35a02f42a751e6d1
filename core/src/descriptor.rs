//! Launch configuration for a child process

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// How the executable is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Source {
    /// Resolve the executable by searching `PATH`.
    Name(String),
    /// Use an absolute or relative path directly.
    Path(PathBuf),
}

/// Immutable launch configuration: executable source, arguments, environment
/// mapping, and working directory.
///
/// The environment defaults to a snapshot of the ambient environment and the
/// working directory to the ambient current directory, both taken when the
/// descriptor is built. No validation happens here beyond structure; an
/// invalid executable only surfaces at launch time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDescriptor {
    /// Executable reference.
    pub source: Source,
    /// Arguments passed to the child (the executable itself is prepended as
    /// argv\[0\] at launch).
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment mapping, keys unique. Ordered so the marshalled
    /// environment block is deterministic.
    #[serde(default = "ambient_environment")]
    pub env: BTreeMap<String, String>,
    /// Working directory the child starts in.
    #[serde(default = "ambient_current_dir")]
    pub current_dir: PathBuf,
}

impl ProcessDescriptor {
    /// Descriptor for an executable resolved through `PATH`.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self::from_source(Source::Name(name.into()))
    }

    /// Descriptor for an executable at a concrete path.
    pub fn by_path(path: impl Into<PathBuf>) -> Self {
        Self::from_source(Source::Path(path.into()))
    }

    fn from_source(source: Source) -> Self {
        Self {
            source,
            args: Vec::new(),
            env: ambient_environment(),
            current_dir: ambient_current_dir(),
        }
    }

    /// Replace the argument list.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set or override a single environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Replace the environment mapping wholesale.
    pub fn envs(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Set the working directory the child starts in.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = dir.into();
        self
    }
}

fn ambient_environment() -> BTreeMap<String, String> {
    std::env::vars().collect()
}

fn ambient_current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
