//! Library entrypoint for paws-launcher.
//!
//! The primary interface is the `paws` binary. This lib target exists to
//! expose the resolution pipeline to integration tests.

pub mod delegate;
pub mod output;
pub mod policy;
pub mod probe;
pub mod resolver;
