//! A command-line chat assistant with a handful of everyday tools.
//!
//! The library holds the tools and a [`Session`] that wires them into an
//! agent. With the `cli` feature it also provides the environment config and
//! the interactive loop used by the `intellibot` binary.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod clock;
#[cfg(feature = "cli")]
pub mod config;
#[cfg(feature = "cli")]
pub mod repl;
mod session;
pub mod tools;

pub use session::{Session, SessionBuilder};

/// Re-exports of [`intellibot_core`] crate.
pub mod core {
    pub use intellibot_core::*;
}
