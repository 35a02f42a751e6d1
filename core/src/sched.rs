//! Injected scheduling capability used by the wait loop
//!
//! Waiting on a child is a cooperative poll: check, suspend, repeat. The
//! suspension is abstracted behind [`Scheduler`] so the same loop runs under
//! a single-threaded event loop ([`TokioScheduler`]) or a blocking executor
//! ([`ThreadScheduler`]).

use async_trait::async_trait;
use std::time::Duration;

/// Capability for suspending the caller between status polls.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Suspend the caller for at least `duration`.
    async fn suspend(&self, duration: Duration);
}

/// Scheduler that yields to the tokio timer, cooperating with other tasks on
/// the same event loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn suspend(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Scheduler that blocks the current OS thread. Suitable for synchronous
/// runtimes where the wait loop owns its thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadScheduler;

#[async_trait]
impl Scheduler for ThreadScheduler {
    async fn suspend(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
