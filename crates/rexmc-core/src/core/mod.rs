//! # Core Module
//!
//! The stateless foundation of the sampler: the sampled configuration, the scoring
//! collaborator that evaluates it, and the model file format that describes both.
//!
//! ## Architecture
//!
//! - **Configuration State** ([`models`]) - Particles, rigid bodies, nuisances and weights
//! - **Scoring** ([`scoring`]) - Immutable weighted scoring functions and restraint terms
//! - **File I/O** ([`io`]) - TOML model descriptions
//! - **Utilities** ([`utils`]) - Random rigid transforms and other geometric helpers
//!
//! Nothing in this layer knows about temperatures, movers or replicas; see
//! [`crate::engine`] for the sampling logic.

pub mod io;
pub mod models;
pub mod scoring;
pub mod utils;
