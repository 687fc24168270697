//! # Core Models Module
//!
//! Data structures for the sampled configuration.
//!
//! ## Overview
//!
//! A [`system::SamplingSystem`] holds everything a mover may perturb and a scoring term
//! may read:
//!
//! - [`particle`] - Point particles, either free or attached to a rigid body
//! - [`rigid_body`] - Rigid bodies with a reference frame and member particles
//! - [`parameters`] - Bounded nuisance scalars and categorical weight vectors
//! - [`ids`] - Slot-map keys shared by every clone of a system
//!
//! ## Usage
//!
//! ```ignore
//! use rexmc::core::models::system::SamplingSystem;
//! use nalgebra::Point3;
//!
//! let mut system = SamplingSystem::new();
//! let a = system.add_particle("A1", 2.0, Point3::new(0.0, 0.0, 0.0))?;
//! let b = system.add_particle("A2", 2.0, Point3::new(4.0, 0.0, 0.0))?;
//! let body = system.add_rigid_body("domain-a", &[a, b], &[])?;
//! ```

pub mod ids;
pub mod parameters;
pub mod particle;
pub mod rigid_body;
pub mod system;
