//! Resilient client facade for the enriched citation API.
//!
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod core;
mod execution;
mod preflight;
pub mod signals;

pub use builder::ResilientClientBuilder;
pub use core::ResilientClient;
pub use signals::{InflightSnapshot, SignalsSnapshot};
