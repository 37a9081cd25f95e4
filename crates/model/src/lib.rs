//! Provider-neutral protocol between the agent and a language model.
//!
//! The agent loop only ever talks to a model through the types defined
//! here: it builds a [`ModelRequest`] out of the conversation history and
//! the declared tools, and reads a stream of [`ModelResponseEvent`]s back.
//! Concrete providers translate both directions to their own wire format.
//!
//! Nothing in this crate performs I/O.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
