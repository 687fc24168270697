//! # Engine Module
//!
//! The stateful sampling layer: movers, the Metropolis Monte Carlo engine and the
//! replica-exchange coordinator, together with their configuration and error types.
//!
//! ## Overview
//!
//! A replica is one [`monte_carlo::MonteCarlo`] engine owning an ordered list of
//! [`movers::Mover`]s and sampling one [`SamplingSystem`](crate::core::models::system::SamplingSystem)
//! at temperature kT. A [`replica_exchange::ReplicaExchange`] coordinator wraps the engine and
//! swaps temperatures with partner replicas through an [`exchange::ExchangeBackend`].
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Builders for engine, exchange and run settings
//! - **Movers** ([`movers`]) - Propose / accept / reject perturbations with exact restoration
//! - **Sampling** ([`metropolis`], [`annealing`], [`monte_carlo`]) - The Metropolis sweep loop
//! - **Exchange** ([`exchange`], [`replica_exchange`]) - Temperature ladders, partner
//!   selection and swap decisions
//! - **Telemetry** ([`output`], [`progress`]) - Flat key/value output and progress events
//! - **Error Handling** ([`error`]) - Engine-level error type wrapping every layer below
//!
//! ## Concurrency
//!
//! Within a replica everything is sequential: `optimize` and `attempt_exchange` are
//! blocking calls. The only state shared between replicas lives behind the exchange
//! backend.

pub mod annealing;
pub mod config;
pub mod error;
pub mod exchange;
pub mod metropolis;
pub mod monte_carlo;
pub mod movers;
pub mod output;
pub mod progress;
pub mod replica_exchange;
