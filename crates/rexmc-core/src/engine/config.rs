use super::annealing::AnnealingSchedule;
use super::exchange::ladder::LadderSpacing;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("At least one mover is required for Monte Carlo sampling")]
    NoMovers,

    #[error("Temperature must be positive and finite, got {0}")]
    InvalidTemperature(f64),

    #[error("Invalid temperature range: minimum {min} must be below maximum {max}")]
    InvalidTemperatureRange { min: f64, max: f64 },

    #[error("Number of replicas must be at least 1")]
    NoReplicas,

    #[error(
        "Number of replicas has to be even, got {0}. Set `allow_odd_replicas` to run with an odd number of replicas"
    )]
    OddReplicaCount(usize),

    #[error("Simulated annealing needs a positive period (min-temperature time + max-temperature time)")]
    EmptyAnnealingPeriod,

    #[error("Invalid step size {value} for mover '{label}'")]
    InvalidStepSize { label: String, value: f64 },

    #[error("Particle '{0}' is a rigid member of a rigid body and cannot be moved on its own")]
    RigidMemberTarget(String),

    #[error("Mover '{label}' has nothing to move")]
    EmptyMoverTarget { label: String },

    #[error("Mover target not found: {0}")]
    TargetNotFound(String),

    #[error("Invalid rotation axis for mover '{0}'")]
    InvalidAxis(String),

    #[error("Invalid value for {parameter}: {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

/// Order in which movers are applied within one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoverOrder {
    /// Round robin over the movers; the position carries over between optimize calls.
    #[default]
    Sequential,
    /// A fresh random permutation of the movers for every sweep.
    Shuffled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloConfig {
    pub temperature: f64,
    pub simulated_annealing: Option<AnnealingSchedule>,
    pub self_adaptive: bool,
    pub mover_order: MoverOrder,
}

#[derive(Default)]
pub struct MonteCarloConfigBuilder {
    temperature: Option<f64>,
    simulated_annealing: Option<AnnealingSchedule>,
    self_adaptive: Option<bool>,
    mover_order: Option<MoverOrder>,
}

impl MonteCarloConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(mut self, kt: f64) -> Self {
        self.temperature = Some(kt);
        self
    }
    pub fn simulated_annealing(mut self, schedule: Option<AnnealingSchedule>) -> Self {
        self.simulated_annealing = schedule;
        self
    }
    pub fn self_adaptive(mut self, enabled: bool) -> Self {
        self.self_adaptive = Some(enabled);
        self
    }
    pub fn mover_order(mut self, order: MoverOrder) -> Self {
        self.mover_order = Some(order);
        self
    }

    pub fn build(self) -> Result<MonteCarloConfig, ConfigError> {
        let temperature = self
            .temperature
            .ok_or(ConfigError::MissingParameter("temperature"))?;
        validate_temperature(temperature)?;
        Ok(MonteCarloConfig {
            temperature,
            simulated_annealing: self.simulated_annealing,
            self_adaptive: self.self_adaptive.unwrap_or(false),
            mover_order: self.mover_order.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplicaExchangeConfig {
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub allow_odd_replicas: bool,
    pub spacing: LadderSpacing,
}

#[derive(Default)]
pub struct ReplicaExchangeConfigBuilder {
    min_temperature: Option<f64>,
    max_temperature: Option<f64>,
    allow_odd_replicas: Option<bool>,
    spacing: Option<LadderSpacing>,
}

impl ReplicaExchangeConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_temperature(mut self, t: f64) -> Self {
        self.min_temperature = Some(t);
        self
    }
    pub fn max_temperature(mut self, t: f64) -> Self {
        self.max_temperature = Some(t);
        self
    }
    pub fn allow_odd_replicas(mut self, allow: bool) -> Self {
        self.allow_odd_replicas = Some(allow);
        self
    }
    pub fn spacing(mut self, spacing: LadderSpacing) -> Self {
        self.spacing = Some(spacing);
        self
    }

    pub fn build(self) -> Result<ReplicaExchangeConfig, ConfigError> {
        let min_temperature = self
            .min_temperature
            .ok_or(ConfigError::MissingParameter("min_temperature"))?;
        let max_temperature = self
            .max_temperature
            .ok_or(ConfigError::MissingParameter("max_temperature"))?;
        validate_temperature(min_temperature)?;
        validate_temperature(max_temperature)?;
        if min_temperature > max_temperature {
            return Err(ConfigError::InvalidTemperatureRange {
                min: min_temperature,
                max: max_temperature,
            });
        }
        Ok(ReplicaExchangeConfig {
            min_temperature,
            max_temperature,
            allow_odd_replicas: self.allow_odd_replicas.unwrap_or(false),
            spacing: self.spacing.unwrap_or_default(),
        })
    }
}

/// Everything the sampling workflow needs besides the model itself.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    pub monte_carlo: MonteCarloConfig,
    pub replica_exchange: Option<ReplicaExchangeConfig>,
    pub num_replicas: usize,
    pub num_frames: u64,
    pub steps_per_frame: usize,
    pub seed: u64,
}

#[derive(Default)]
pub struct SamplingConfigBuilder {
    monte_carlo: Option<MonteCarloConfig>,
    replica_exchange: Option<ReplicaExchangeConfig>,
    num_replicas: Option<usize>,
    num_frames: Option<u64>,
    steps_per_frame: Option<usize>,
    seed: Option<u64>,
}

impl SamplingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn monte_carlo(mut self, config: MonteCarloConfig) -> Self {
        self.monte_carlo = Some(config);
        self
    }
    pub fn replica_exchange(mut self, config: Option<ReplicaExchangeConfig>) -> Self {
        self.replica_exchange = config;
        self
    }
    pub fn num_replicas(mut self, n: usize) -> Self {
        self.num_replicas = Some(n);
        self
    }
    pub fn num_frames(mut self, n: u64) -> Self {
        self.num_frames = Some(n);
        self
    }
    pub fn steps_per_frame(mut self, n: usize) -> Self {
        self.steps_per_frame = Some(n);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<SamplingConfig, ConfigError> {
        let monte_carlo = self
            .monte_carlo
            .ok_or(ConfigError::MissingParameter("monte_carlo"))?;
        let num_replicas = self.num_replicas.unwrap_or(1);
        if num_replicas == 0 {
            return Err(ConfigError::NoReplicas);
        }
        if num_replicas > 1 && self.replica_exchange.is_none() {
            return Err(ConfigError::MissingParameter("replica_exchange"));
        }
        Ok(SamplingConfig {
            monte_carlo,
            replica_exchange: self.replica_exchange,
            num_replicas,
            num_frames: self
                .num_frames
                .ok_or(ConfigError::MissingParameter("num_frames"))?,
            steps_per_frame: self
                .steps_per_frame
                .ok_or(ConfigError::MissingParameter("steps_per_frame"))?,
            seed: self.seed.unwrap_or(0),
        })
    }
}

pub(crate) fn validate_temperature(t: f64) -> Result<(), ConfigError> {
    if t.is_finite() && t > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidTemperature(t))
    }
}
