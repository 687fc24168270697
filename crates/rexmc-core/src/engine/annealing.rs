use super::config::{ConfigError, validate_temperature};

/// Two-level simulated annealing schedule.
///
/// Each period lasts `min_time + max_time` frames: the first `min_time` frames run at
/// `min_temperature`, the rest at `max_temperature`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnealingSchedule {
    min_temperature: f64,
    max_temperature: f64,
    min_time: u64,
    max_time: u64,
}

impl AnnealingSchedule {
    pub fn new(
        min_temperature: f64,
        max_temperature: f64,
        min_time: u64,
        max_time: u64,
    ) -> Result<Self, ConfigError> {
        validate_temperature(min_temperature)?;
        validate_temperature(max_temperature)?;
        if min_time + max_time == 0 {
            return Err(ConfigError::EmptyAnnealingPeriod);
        }
        Ok(Self {
            min_temperature,
            max_temperature,
            min_time,
            max_time,
        })
    }

    pub fn temperature_at(&self, frame: u64) -> f64 {
        if frame % (self.min_time + self.max_time) < self.min_time {
            self.min_temperature
        } else {
            self.max_temperature
        }
    }

    pub fn min_temperature(&self) -> f64 {
        self.min_temperature
    }

    pub fn max_temperature(&self) -> f64 {
        self.max_temperature
    }

    pub fn min_time(&self) -> u64 {
        self.min_time
    }

    pub fn max_time(&self) -> u64 {
        self.max_time
    }
}
