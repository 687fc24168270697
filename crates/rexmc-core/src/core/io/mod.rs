//! Model description files.
//!
//! A model file is a TOML document listing particles, rigid bodies, nuisance parameters,
//! weights, movers and restraints by name. Parsing lives here; turning the description
//! into a sampling setup is done by [`crate::workflows::model`].

pub mod model;
