//! Platform launchers
//!
//! The launcher translates a descriptor plus channel bindings into one OS
//! spawn call. Unix is the only supported platform today; the module split
//! leaves room for other backends.

#[cfg(unix)]
pub(crate) mod unix;

#[cfg(unix)]
pub(crate) use unix::{reap, spawn_process};
