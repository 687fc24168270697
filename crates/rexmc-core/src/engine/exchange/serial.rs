use super::{ExchangeBackend, ExchangeError};
use std::collections::HashMap;

/// Backend for a single replica: it is always its own partner and never swaps.
#[derive(Debug, Default, Clone)]
pub struct SerialExchange {
    parameters: HashMap<String, Vec<f64>>,
}

impl SerialExchange {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_index(index: usize) -> Result<(), ExchangeError> {
        if index == 0 {
            Ok(())
        } else {
            Err(ExchangeError::ReplicaOutOfRange { index, replicas: 1 })
        }
    }
}

impl ExchangeBackend for SerialExchange {
    fn number_of_replicas(&self) -> usize {
        1
    }

    fn my_index(&self) -> usize {
        0
    }

    fn set_parameter(&mut self, key: &str, values: Vec<f64>) -> Result<(), ExchangeError> {
        self.parameters.insert(key.to_string(), values);
        Ok(())
    }

    fn get_parameter(&self, key: &str) -> Result<Vec<f64>, ExchangeError> {
        self.parameters
            .get(key)
            .cloned()
            .ok_or_else(|| ExchangeError::UnknownParameter {
                key: key.to_string(),
                replica: 0,
            })
    }

    fn get_friend_index(&mut self, _frame: u64) -> Result<usize, ExchangeError> {
        Ok(0)
    }

    fn get_friend_parameter(&self, key: &str, friend: usize) -> Result<Vec<f64>, ExchangeError> {
        Self::check_index(friend)?;
        self.get_parameter(key)
    }

    fn do_exchange(
        &mut self,
        _my_score: f64,
        _friend_score: f64,
        friend: usize,
    ) -> Result<bool, ExchangeError> {
        Self::check_index(friend)?;
        Ok(false)
    }
}
