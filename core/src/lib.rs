//! Process launching and lifecycle tracking for the Procyon project
//!
//! This crate turns a [`ProcessDescriptor`] (executable reference, argument
//! list, environment mapping, working directory) plus up to three
//! [`CommunicationChannel`] bindings into a running child process, and
//! exposes a state machine for observing and waiting on its termination.
//!
//! The wait loop is a cooperative poll parameterized over a [`Scheduler`]
//! capability, so it runs unchanged on a tokio event loop or a blocking
//! thread. Nothing here signals or kills the child: a timed-out wait leaves
//! it running and reapable later.

pub mod descriptor;
pub mod error;
pub mod sched;

#[cfg(unix)]
pub mod channel;
#[cfg(unix)]
pub mod process;
#[cfg(unix)]
mod spawn;

pub use descriptor::{ProcessDescriptor, Source};
pub use error::{ProcessError, Result};
pub use sched::{Scheduler, ThreadScheduler, TokioScheduler};

#[cfg(unix)]
pub use channel::{CommunicationChannel, Pipe};
#[cfg(unix)]
pub use process::{Process, Status, POLL_INTERVAL};

/// Core utilities and helper functions
pub mod utils {
    use tracing::info;

    /// Initialize tracing for the application
    pub fn init_tracing(level: &str) -> crate::Result<()> {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        fmt()
            .with_env_filter(filter)
            .try_init()
            .map_err(|e| crate::ProcessError::System(std::io::Error::other(e.to_string())))?;

        info!("Tracing initialized with level: {}", level);
        Ok(())
    }
}
