//! # Scoring Module
//!
//! The scoring collaborator of the sampler: given a configuration, return a scalar score.
//!
//! ## Overview
//!
//! A [`function::ScoringFunction`] is assembled once, from a list of weighted terms, before
//! sampling begins and is immutable afterwards. Evaluation is deterministic for a fixed
//! configuration and never mutates it.
//!
//! ## Key Components
//!
//! - [`function`] - The immutable weighted sum of terms and its builder
//! - [`restraints`] - Distance, barrier, excluded-volume and prior terms
//!
//! ## Usage
//!
//! ```ignore
//! use rexmc::core::scoring::function::ScoringFunctionBuilder;
//! use rexmc::core::scoring::restraints::DistanceRestraint;
//!
//! let scoring = ScoringFunctionBuilder::new()
//!     .term(DistanceRestraint::new("a-b", a, b, 0.0, 5.0, 1.0))
//!     .build()?;
//! let score = scoring.score(&system)?;
//! ```

pub mod function;
pub mod restraints;

use crate::core::models::ids::{NuisanceId, ParticleId};
use crate::core::models::system::SamplingSystem;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ScoringError {
    #[error("Particle {0:?} not found in the system")]
    ParticleNotFound(ParticleId),
    #[error("Nuisance {0:?} not found in the system")]
    NuisanceNotFound(NuisanceId),
    #[error("Term '{term}' evaluated to a non-finite value")]
    NonFinite { term: String },
    #[error("Term '{term}' cannot be evaluated: {reason}")]
    Evaluation { term: String, reason: String },
    #[error("A scoring function needs at least one term")]
    NoTerms,
    #[error("Invalid weight {weight} for term '{term}'")]
    InvalidWeight { term: String, weight: f64 },
}

/// A single contribution to the total score.
pub trait ScoreTerm: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    fn evaluate(&self, system: &SamplingSystem) -> Result<f64, ScoringError>;
}
