//! # Exchange Backends
//!
//! The replica-exchange coordinator never talks to other replicas directly. Everything that
//! crosses replica boundaries goes through an [`ExchangeBackend`]: the replica count and
//! index, a small per-replica parameter board, the choice of exchange partner for a frame,
//! and the swap decision itself.
//!
//! ## Implementations
//!
//! - [`serial::SerialExchange`] - A single replica that is its own partner and never swaps
//! - [`local::LocalExchange`] - One rank of a group of replicas running on threads of the
//!   same process, synchronized by a shared rendezvous

pub mod ladder;
pub mod local;
pub mod serial;

use super::config::ConfigError;
use ladder::LadderSpacing;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ExchangeError {
    #[error("Parameter '{key}' is not set for replica {replica}")]
    UnknownParameter { key: String, replica: usize },
    #[error("Replica index {index} is out of range for {replicas} replicas")]
    ReplicaOutOfRange { index: usize, replicas: usize },
    #[error("Exchange requested with replica {requested}, but the partner for this round is {expected}")]
    FriendMismatch { requested: usize, expected: usize },
    #[error("Exchange attempted before a partner was chosen for this round")]
    NoPartner,
    #[error("Exchange rendezvous was aborted by another replica")]
    Aborted,
    #[error("Exchange state is poisoned: a replica panicked while holding it")]
    Poisoned,
}

/// Cross-replica operations needed by the replica-exchange coordinator.
///
/// Every replica of a group must call [`get_friend_index`](Self::get_friend_index) and then
/// [`do_exchange`](Self::do_exchange) exactly once per exchange round, even when it is its
/// own partner, so that all replicas stay in step.
pub trait ExchangeBackend {
    fn number_of_replicas(&self) -> usize;

    fn my_index(&self) -> usize;

    fn create_temperature_ladder(
        &self,
        min: f64,
        max: f64,
        n: usize,
        spacing: LadderSpacing,
    ) -> Result<Vec<f64>, ConfigError> {
        ladder::create_ladder(min, max, n, spacing)
    }

    fn set_parameter(&mut self, key: &str, values: Vec<f64>) -> Result<(), ExchangeError>;

    fn get_parameter(&self, key: &str) -> Result<Vec<f64>, ExchangeError>;

    /// The replica to attempt an exchange with in this frame; `my_index()` when unpaired.
    fn get_friend_index(&mut self, frame: u64) -> Result<usize, ExchangeError>;

    fn get_friend_parameter(&self, key: &str, friend: usize) -> Result<Vec<f64>, ExchangeError>;

    /// Decides the swap with `friend`. `my_score` and `friend_score` are this replica's
    /// score divided by its own and by the friend's temperature. Both partners observe the
    /// same outcome.
    fn do_exchange(
        &mut self,
        my_score: f64,
        friend_score: f64,
        friend: usize,
    ) -> Result<bool, ExchangeError>;

    /// Releases every replica blocked in a rendezvous; later rendezvous fail with
    /// [`ExchangeError::Aborted`].
    fn abort(&self) {}
}

impl<B: ExchangeBackend + ?Sized> ExchangeBackend for Box<B> {
    fn number_of_replicas(&self) -> usize {
        (**self).number_of_replicas()
    }

    fn my_index(&self) -> usize {
        (**self).my_index()
    }

    fn create_temperature_ladder(
        &self,
        min: f64,
        max: f64,
        n: usize,
        spacing: LadderSpacing,
    ) -> Result<Vec<f64>, ConfigError> {
        (**self).create_temperature_ladder(min, max, n, spacing)
    }

    fn set_parameter(&mut self, key: &str, values: Vec<f64>) -> Result<(), ExchangeError> {
        (**self).set_parameter(key, values)
    }

    fn get_parameter(&self, key: &str) -> Result<Vec<f64>, ExchangeError> {
        (**self).get_parameter(key)
    }

    fn get_friend_index(&mut self, frame: u64) -> Result<usize, ExchangeError> {
        (**self).get_friend_index(frame)
    }

    fn get_friend_parameter(&self, key: &str, friend: usize) -> Result<Vec<f64>, ExchangeError> {
        (**self).get_friend_parameter(key, friend)
    }

    fn do_exchange(
        &mut self,
        my_score: f64,
        friend_score: f64,
        friend: usize,
    ) -> Result<bool, ExchangeError> {
        (**self).do_exchange(my_score, friend_score, friend)
    }

    fn abort(&self) {
        (**self).abort()
    }
}
