use super::config::{ConfigError, ReplicaExchangeConfig};
use super::error::EngineError;
use super::exchange::{ExchangeBackend, ExchangeError};
use super::monte_carlo::MonteCarlo;
use super::output::{OutputMap, Telemetry};
use crate::core::models::system::SamplingSystem;
use crate::core::scoring::function::ScoringFunction;
use tracing::{debug, info};

/// Backend parameter holding the temperature a replica currently samples at.
pub const TEMPERATURE_KEY: &str = "temp";

/// Cumulative exchange counters of one replica. They only ever grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExchangeStatistics {
    pub attempts: u64,
    pub successes: u64,
    /// Attempts made while holding the lowest temperature.
    pub time_at_min: u64,
    /// Attempts made while holding the highest temperature.
    pub time_at_max: u64,
}

impl ExchangeStatistics {
    fn fraction(&self, count: u64) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            count as f64 / self.attempts as f64
        }
    }

    pub fn success_ratio(&self) -> f64 {
        self.fraction(self.successes)
    }

    pub fn min_temperature_frequency(&self) -> f64 {
        self.fraction(self.time_at_min)
    }

    pub fn max_temperature_frequency(&self) -> f64 {
        self.fraction(self.time_at_max)
    }
}

/// Replica-exchange coordinator for one replica.
///
/// Owns the replica's [`MonteCarlo`] engine and exchanges temperatures, never
/// configurations, with partner replicas through the injected backend.
#[derive(Debug)]
pub struct ReplicaExchange<B: ExchangeBackend> {
    backend: B,
    engine: MonteCarlo,
    temperatures: Vec<f64>,
    min_temperature: f64,
    max_temperature: f64,
    current_temperature: f64,
    statistics: ExchangeStatistics,
}

impl<B: ExchangeBackend> ReplicaExchange<B> {
    /// Builds the ladder and presets the engine to this replica's rung.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigError::OddReplicaCount`] for an odd number of replicas unless
    /// `allow_odd_replicas` is set, and with the ladder's errors for invalid bounds.
    pub fn new(
        config: &ReplicaExchangeConfig,
        mut backend: B,
        mut engine: MonteCarlo,
    ) -> Result<Self, EngineError> {
        let replicas = backend.number_of_replicas();
        if replicas == 0 {
            return Err(ConfigError::NoReplicas.into());
        }
        if replicas % 2 != 0 && !config.allow_odd_replicas {
            return Err(ConfigError::OddReplicaCount(replicas).into());
        }

        let temperatures = backend.create_temperature_ladder(
            config.min_temperature,
            config.max_temperature,
            replicas,
            config.spacing,
        )?;
        let index = backend.my_index();
        let my_temperature =
            *temperatures
                .get(index)
                .ok_or(ExchangeError::ReplicaOutOfRange {
                    index,
                    replicas: temperatures.len(),
                })?;
        backend.set_parameter(TEMPERATURE_KEY, vec![my_temperature])?;
        engine.set_kt(my_temperature)?;
        debug!(replica = index, temperature = my_temperature, "Replica preset");

        Ok(Self {
            backend,
            engine,
            min_temperature: config.min_temperature,
            max_temperature: config.max_temperature,
            temperatures,
            current_temperature: my_temperature,
            statistics: ExchangeStatistics::default(),
        })
    }

    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    pub fn my_index(&self) -> usize {
        self.backend.my_index()
    }

    pub fn my_temperature(&self) -> f64 {
        self.current_temperature
    }

    pub fn statistics(&self) -> ExchangeStatistics {
        self.statistics
    }

    pub fn engine(&self) -> &MonteCarlo {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut MonteCarlo {
        &mut self.engine
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Scores `system` and attempts a temperature swap with this frame's partner.
    pub fn attempt_exchange(
        &mut self,
        frame: u64,
        system: &SamplingSystem,
        scoring: &ScoringFunction,
    ) -> Result<bool, EngineError> {
        let score = scoring.score(system)?;
        self.attempt_exchange_with_score(frame, score)
    }

    /// Attempts a temperature swap given this replica's current score.
    pub fn attempt_exchange_with_score(&mut self, frame: u64, score: f64) -> Result<bool, EngineError> {
        let my_temperature = self.current_temperature;
        if my_temperature == self.min_temperature {
            self.statistics.time_at_min += 1;
        } else if my_temperature == self.max_temperature {
            self.statistics.time_at_max += 1;
        }

        let my_score = score / my_temperature;
        let friend = self.backend.get_friend_index(frame)?;
        let friend_temperature = self
            .backend
            .get_friend_parameter(TEMPERATURE_KEY, friend)?
            .first()
            .copied()
            .ok_or_else(|| ExchangeError::UnknownParameter {
                key: TEMPERATURE_KEY.to_string(),
                replica: friend,
            })?;
        let friend_score = score / friend_temperature;

        let accepted = self.backend.do_exchange(my_score, friend_score, friend)?;
        self.statistics.attempts += 1;
        if accepted {
            self.engine.set_kt(friend_temperature)?;
            self.backend
                .set_parameter(TEMPERATURE_KEY, vec![friend_temperature])?;
            self.current_temperature = friend_temperature;
            self.statistics.successes += 1;
            debug!(
                replica = self.backend.my_index(),
                frame,
                from = my_temperature,
                to = friend_temperature,
                "Temperature swap accepted"
            );
        }
        Ok(accepted)
    }

    pub fn log_summary(&self) {
        info!(
            replica = self.backend.my_index(),
            attempts = self.statistics.attempts,
            success_ratio = self.statistics.success_ratio(),
            temperature = self.current_temperature,
            "Replica exchange summary"
        );
    }
}

impl<B: ExchangeBackend> Telemetry for ReplicaExchange<B> {
    fn output(&self) -> OutputMap {
        let mut output = OutputMap::new();
        output.insert(
            "ReplicaExchange_SwapSuccessRatio".to_string(),
            self.statistics.success_ratio().to_string(),
        );
        output.insert(
            "ReplicaExchange_MinTempFrequency".to_string(),
            self.statistics.min_temperature_frequency().to_string(),
        );
        output.insert(
            "ReplicaExchange_MaxTempFrequency".to_string(),
            self.statistics.max_temperature_frequency().to_string(),
        );
        output.insert(
            "ReplicaExchange_CurrentTemp".to_string(),
            self.current_temperature.to_string(),
        );
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scoring::function::{FnTerm, ScoringFunctionBuilder};
    use crate::core::scoring::restraints::DistanceToPointRestraint;
    use crate::engine::config::{MonteCarloConfigBuilder, ReplicaExchangeConfigBuilder};
    use crate::engine::exchange::local::LocalExchangeHub;
    use crate::engine::exchange::serial::SerialExchange;
    use crate::engine::movers::{Mover, MoverKind};
    use nalgebra::Point3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::thread;

    fn rex_config(allow_odd: bool) -> ReplicaExchangeConfig {
        ReplicaExchangeConfigBuilder::new()
            .min_temperature(1.0)
            .max_temperature(2.0)
            .allow_odd_replicas(allow_odd)
            .build()
            .unwrap()
    }

    fn model() -> (SamplingSystem, ScoringFunction, MonteCarlo) {
        let mut system = SamplingSystem::new();
        let p = system.add_particle("p", 1.0, Point3::new(2.0, 0.0, 0.0)).unwrap();
        let scoring = ScoringFunctionBuilder::new()
            .term(DistanceToPointRestraint::new("anchor", p, Point3::origin(), 0.5, 1.0))
            .build()
            .unwrap();
        let mover = Mover::new(
            "p",
            MoverKind::Floppy {
                particle: p,
                max_translation: 0.5,
            },
            &system,
        )
        .unwrap();
        let mc_config = MonteCarloConfigBuilder::new()
            .temperature(1.0)
            .build()
            .unwrap();
        let engine = MonteCarlo::new(&mc_config, vec![mover]).unwrap();
        (system, scoring, engine)
    }

    #[test]
    fn single_replica_needs_odd_override() {
        let (_, _, engine) = model();
        let err = ReplicaExchange::new(&rex_config(false), SerialExchange::new(), engine).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Config {
                source: ConfigError::OddReplicaCount(1)
            }
        ));
    }

    #[test]
    fn serial_replica_never_swaps_and_stays_at_min() {
        let (system, scoring, engine) = model();
        let mut rex = ReplicaExchange::new(&rex_config(true), SerialExchange::new(), engine).unwrap();
        assert_eq!(rex.temperatures(), &[1.0]);
        assert_eq!(rex.engine().kt(), 1.0);
        let output = rex.output();
        assert_eq!(output["ReplicaExchange_SwapSuccessRatio"], "0");
        assert_eq!(output["ReplicaExchange_MinTempFrequency"], "0");

        for frame in 0..10 {
            assert!(!rex.attempt_exchange(frame, &system, &scoring).unwrap());
        }
        let stats = rex.statistics();
        assert_eq!(stats.attempts, 10);
        assert_eq!(stats.successes, 0);
        assert_eq!(stats.time_at_min, 10);
        assert_eq!(rex.output()["ReplicaExchange_MinTempFrequency"], "1");
        assert_eq!(rex.output()["ReplicaExchange_CurrentTemp"], "1");
    }

    #[test]
    fn odd_local_group_is_rejected_without_override() {
        let hub = LocalExchangeHub::new(3, 0).unwrap();
        let backend = hub.ranks().remove(0);
        let (_, _, engine) = model();
        assert!(matches!(
            ReplicaExchange::new(&rex_config(false), backend, engine),
            Err(EngineError::Config {
                source: ConfigError::OddReplicaCount(3)
            })
        ));
    }

    #[test]
    fn scoring_errors_propagate_from_attempt_exchange() {
        let (system, _, engine) = model();
        let broken = ScoringFunctionBuilder::new()
            .term(FnTerm::new("nan", |_| Ok(f64::NAN)))
            .build()
            .unwrap();
        let mut rex = ReplicaExchange::new(&rex_config(true), SerialExchange::new(), engine).unwrap();
        assert!(matches!(
            rex.attempt_exchange(0, &system, &broken),
            Err(EngineError::Scoring { .. })
        ));
        assert_eq!(rex.statistics().attempts, 0);
    }

    #[test]
    fn four_replicas_over_hundred_attempts_keep_consistent_statistics() {
        let hub = LocalExchangeHub::new(4, 2024).unwrap();
        let config = rex_config(false);
        let results: Vec<(ExchangeStatistics, f64, f64)> = thread::scope(|scope| {
            let handles: Vec<_> = hub
                .ranks()
                .into_iter()
                .enumerate()
                .map(|(index, backend)| {
                    let config = &config;
                    scope.spawn(move || {
                        let (mut system, scoring, engine) = model();
                        let mut rex = ReplicaExchange::new(config, backend, engine).unwrap();
                        let mut rng = StdRng::seed_from_u64(index as u64);
                        for frame in 0..100 {
                            rex.engine_mut()
                                .optimize(1, &mut system, &scoring, &mut rng)
                                .unwrap();
                            rex.attempt_exchange(frame, &system, &scoring).unwrap();
                        }
                        (rex.statistics(), rex.my_temperature(), rex.engine().kt())
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let ladder = crate::engine::exchange::ladder::create_ladder(
            1.0,
            2.0,
            4,
            config.spacing,
        )
        .unwrap();
        let mut held: Vec<f64> = results.iter().map(|r| r.1).collect();
        held.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(held, ladder);

        for (stats, temperature, kt) in &results {
            assert_eq!(stats.attempts, 100);
            assert!(stats.successes <= stats.attempts);
            assert!(stats.time_at_min + stats.time_at_max <= stats.attempts);
            assert_eq!(temperature, kt);
        }
        let total_min: u64 = results.iter().map(|r| r.0.time_at_min).sum();
        assert_eq!(total_min, 100);
    }
}
