use thiserror::Error;

use super::config::ConfigError;
use super::exchange::ExchangeError;
use super::movers::MoverError;
use crate::core::io::model::ModelFileError;
use crate::core::models::system::SystemError;
use crate::core::scoring::ScoringError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Score evaluation failed: {source}")]
    Scoring {
        #[from]
        source: ScoringError,
    },

    #[error("Invalid model state: {source}")]
    System {
        #[from]
        source: SystemError,
    },

    #[error("Mover failed: {source}")]
    Mover {
        #[from]
        source: MoverError,
    },

    #[error("Replica exchange failed: {source}")]
    Exchange {
        #[from]
        source: ExchangeError,
    },

    #[error("Failed to load model: {source}")]
    ModelFile {
        #[from]
        source: ModelFileError,
    },

    #[error("Unknown {kind} '{name}' referenced in model")]
    UnknownReference { kind: &'static str, name: String },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
