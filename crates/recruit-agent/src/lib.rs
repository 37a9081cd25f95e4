//! A recruiting assistant that answers questions with the help of the
//! Traffit recruiting API and files kept in UiPath storage buckets.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library, see [`SessionBuilder`].

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod config;
mod http;
mod session;
pub mod storage;
#[cfg(test)]
mod testing;
pub mod tools;
pub mod traffit;

pub use config::{Config, ConfigError};
pub use session::{Session, SessionBuilder};

/// Re-exports of [`recruit_agent_core`] crate.
pub mod core {
    pub use recruit_agent_core::*;
}
