//! # rexmc Core Library
//!
//! Replica-exchange Monte Carlo sampling for integrative structural models: movers that
//! propose and exactly undo perturbations, a Metropolis engine with simulated annealing
//! and self-adaptive step sizes, and a coordinator that swaps temperatures between replicas
//! through an injected exchange backend.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three-layer split throughout:
//!
//! - **[`core`]: The Foundation.** Stateless data: the sampled configuration
//!   (`SamplingSystem`), the immutable `ScoringFunction` and its restraint terms, and the
//!   TOML model file format.
//!
//! - **[`engine`]: The Logic Core.** The stateful sampling layer: `Mover`, `MonteCarlo`,
//!   `ReplicaExchange`, the `ExchangeBackend` implementations, configuration builders and
//!   telemetry.
//!
//! - **[`workflows`]: The Public API.** Complete runs: assemble a model from its
//!   description and sample it with any number of replicas.

pub mod core;
pub mod engine;
pub mod workflows;
