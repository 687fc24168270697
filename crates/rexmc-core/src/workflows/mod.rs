//! # Workflows Module
//!
//! High-level entry points that turn a model description and a run configuration into a
//! finished replica-exchange sampling run.
//!
//! ## Overview
//!
//! Workflows glue the [`core`](crate::core) and [`engine`](crate::engine) layers together.
//! They resolve names in a model file to typed identifiers, build one engine and one
//! exchange coordinator per replica, drive the frame loop, and collect per-replica
//! telemetry and best-scoring configurations.
//!
//! ## Architecture
//!
//! - **Model Assembly** ([`model`]) - [`model::SamplingModel`] built from a TOML
//!   [`ModelFile`](crate::core::io::model::ModelFile)
//! - **Sampling Workflow** ([`sample`]) - One thread per replica, serial or in-process
//!   exchange backend, progress reporting and error propagation

pub mod model;
pub mod sample;
