//! Tracks ERC-4337 user operations handed to a bundler until they are mined,
//! then forwards the bundle transaction hash to the guardian service.

pub mod bundler;
pub mod data;
pub mod error;
pub mod guardian;
pub mod intake;
pub mod metrics;
pub mod queue;
pub mod rate_gate;
pub mod server;
pub mod settings;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_utils;
