//! Provider-agnostic protocol between the agent and a language model.
//!
//! The agent only ever talks to a model through the types in this crate:
//! it builds a [`ModelRequest`], hands it to a [`ModelProvider`], and pulls
//! [`ModelResponseEvent`]s out of the returned [`ModelResponse`] until the
//! stream ends. Anything a provider needs to remember about its own wire
//! format between turns travels back to it as an [`OpaqueMessage`].
//!
//! Nothing here performs I/O. Implementations live in their own crates.

#![deny(missing_docs)]

mod error;
mod opaque;
mod provider;
mod request;
mod response;

pub use error::*;
pub use opaque::*;
pub use provider::*;
pub use request::*;
pub use response::*;
