pub mod ladder;
pub mod sample;
