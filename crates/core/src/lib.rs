//! Core logic including the agent loop, tool execution, and retries.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

pub mod agent;
pub mod conversation;
mod model_client;
mod retry;
pub mod tool;

pub use agent::{Agent, AgentBuilder};
pub use conversation::TranscriptSource;
pub use retry::RetryPolicy;
