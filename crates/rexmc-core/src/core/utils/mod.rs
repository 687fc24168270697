//! Geometric helpers shared by movers and scoring terms.

pub mod geometry;
