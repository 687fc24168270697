use super::annealing::AnnealingSchedule;
use super::config::{ConfigError, MonteCarloConfig, MoverOrder, validate_temperature};
use super::error::EngineError;
use super::metropolis;
use super::movers::{Mover, MoverKind};
use super::output::{OutputMap, Telemetry};
use crate::core::models::system::SamplingSystem;
use crate::core::scoring::function::ScoringFunction;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, instrument};

/// Acceptance ratios inside this band leave step sizes untouched.
pub const ADAPTIVE_TARGET_RANGE: (f64, f64) = (0.4, 0.6);
/// Bounds applied to the acceptance ratio before it becomes a rescale factor.
pub const ADAPTIVE_RATIO_CLAMP: (f64, f64) = (0.05, 1.0);

/// The step-size rescale factor for a cumulative acceptance ratio, if any.
pub fn adaptive_step_factor(ratio: f64) -> Option<f64> {
    let (low, high) = ADAPTIVE_TARGET_RANGE;
    if (low..=high).contains(&ratio) {
        None
    } else {
        Some(2.0 * ratio.clamp(ADAPTIVE_RATIO_CLAMP.0, ADAPTIVE_RATIO_CLAMP.1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizeReport {
    pub steps: usize,
    pub accepted: usize,
    /// Score of the configuration left in the system.
    pub final_score: f64,
}

/// Metropolis Monte Carlo over a fixed, ordered set of movers.
#[derive(Debug, Clone)]
pub struct MonteCarlo {
    movers: Vec<Mover>,
    kt: f64,
    annealing: Option<AnnealingSchedule>,
    self_adaptive: bool,
    mover_order: MoverOrder,
    next_mover: usize,
    frame: Option<u64>,
}

impl MonteCarlo {
    pub fn new(config: &MonteCarloConfig, movers: Vec<Mover>) -> Result<Self, ConfigError> {
        if movers.is_empty() {
            return Err(ConfigError::NoMovers);
        }
        validate_temperature(config.temperature)?;
        Ok(Self {
            movers,
            kt: config.temperature,
            annealing: config.simulated_annealing,
            self_adaptive: config.self_adaptive,
            mover_order: config.mover_order,
            next_mover: 0,
            frame: None,
        })
    }

    pub fn kt(&self) -> f64 {
        self.kt
    }

    pub fn set_kt(&mut self, kt: f64) -> Result<(), ConfigError> {
        validate_temperature(kt)?;
        self.kt = kt;
        Ok(())
    }

    /// Number of completed [`optimize`](Self::optimize) calls minus one; `-1` before the first.
    pub fn frame_number(&self) -> i64 {
        self.frame.map_or(-1, |f| f as i64)
    }

    pub fn movers(&self) -> &[Mover] {
        &self.movers
    }

    pub fn number_of_movers(&self) -> usize {
        self.movers.len()
    }

    /// Current `sigma` of every nuisance mover, keyed by mover label.
    pub fn nuisance_step_sizes(&self) -> Vec<(String, f64)> {
        self.movers
            .iter()
            .filter_map(|m| match m.kind() {
                MoverKind::Nuisance { sigma, .. } => Some((m.label().to_string(), *sigma)),
                _ => None,
            })
            .collect()
    }

    /// Runs `n` sweeps of Metropolis steps, each sweep applying every mover once.
    ///
    /// After the sweeps the annealing schedule, if any, sets the temperature for the frame
    /// and, if enabled, step sizes are adapted to the cumulative acceptance ratios.
    ///
    /// # Errors
    ///
    /// A scoring failure rejects the in-flight proposal, leaving the system in its last
    /// accepted state, and is returned without retry.
    #[instrument(skip_all, name = "monte_carlo_optimize", fields(sweeps = n))]
    pub fn optimize(
        &mut self,
        n: usize,
        system: &mut SamplingSystem,
        scoring: &ScoringFunction,
        rng: &mut impl Rng,
    ) -> Result<OptimizeReport, EngineError> {
        let frame = self.frame.map_or(0, |f| f + 1);
        self.frame = Some(frame);

        let mut current = scoring.score(system)?;
        let mut accepted = 0;
        let mut order: Vec<usize> = (0..self.movers.len()).collect();

        for _ in 0..n {
            if self.mover_order == MoverOrder::Shuffled {
                order.shuffle(rng);
            }
            for slot in 0..order.len() {
                let index = match self.mover_order {
                    MoverOrder::Sequential => {
                        let index = self.next_mover;
                        self.next_mover = (self.next_mover + 1) % self.movers.len();
                        index
                    }
                    MoverOrder::Shuffled => order[slot],
                };
                if self.step(index, &mut current, system, scoring, rng)? {
                    accepted += 1;
                }
            }
        }

        if let Some(schedule) = &self.annealing {
            self.kt = schedule.temperature_at(frame);
        }
        if self.self_adaptive {
            self.adapt_step_sizes();
        }

        let steps = n * self.movers.len();
        debug!(frame, steps, accepted, score = current, kt = self.kt, "Frame complete");
        Ok(OptimizeReport {
            steps,
            accepted,
            final_score: current,
        })
    }

    fn step(
        &mut self,
        index: usize,
        current: &mut f64,
        system: &mut SamplingSystem,
        scoring: &ScoringFunction,
        rng: &mut impl Rng,
    ) -> Result<bool, EngineError> {
        let mover = &mut self.movers[index];
        mover.propose(system, rng)?;
        let proposed = match scoring.score(system) {
            Ok(score) => score,
            Err(e) => {
                mover.reject(system)?;
                return Err(e.into());
            }
        };
        if metropolis::accept(proposed - *current, self.kt, rng) {
            mover.accept()?;
            *current = proposed;
            Ok(true)
        } else {
            mover.reject(system)?;
            Ok(false)
        }
    }

    fn adapt_step_sizes(&mut self) {
        for mover in &mut self.movers {
            if mover.stats().proposed == 0 {
                continue;
            }
            if let Some(factor) = adaptive_step_factor(mover.acceptance_ratio()) {
                mover.scale_step_size(factor);
            }
        }
    }
}

impl Telemetry for MonteCarlo {
    fn output(&self) -> OutputMap {
        let mut output = OutputMap::new();
        for (i, mover) in self.movers.iter().enumerate() {
            output.insert(
                format!("MonteCarlo_Acceptance_{}_{}", mover.label(), i),
                mover.acceptance_ratio().to_string(),
            );
            output.insert(
                format!("MonteCarlo_StepSize_{}_{}", mover.label(), i),
                mover.step_size().to_string(),
            );
        }
        output.insert("MonteCarlo_Temperature".to_string(), self.kt.to_string());
        output.insert("MonteCarlo_Nframe".to_string(), self.frame_number().to_string());
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::ParticleId;
    use crate::core::scoring::ScoringError;
    use crate::core::scoring::function::{FnTerm, ScoringFunctionBuilder};
    use crate::core::scoring::restraints::DistanceToPointRestraint;
    use crate::engine::config::MonteCarloConfigBuilder;
    use nalgebra::Point3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn config(kt: f64) -> MonteCarloConfig {
        MonteCarloConfigBuilder::new().temperature(kt).build().unwrap()
    }

    fn setup() -> (SamplingSystem, ParticleId, ScoringFunction, Vec<Mover>) {
        let mut system = SamplingSystem::new();
        let p = system.add_particle("p", 1.0, Point3::new(3.0, 0.0, 0.0)).unwrap();
        let q = system.add_particle("q", 1.0, Point3::new(0.0, 3.0, 0.0)).unwrap();
        let scoring = ScoringFunctionBuilder::new()
            .term(DistanceToPointRestraint::new("p", p, Point3::origin(), 0.5, 1.0))
            .term(DistanceToPointRestraint::new("q", q, Point3::origin(), 0.5, 1.0))
            .build()
            .unwrap();
        let movers = vec![
            Mover::new(
                "p",
                MoverKind::Floppy {
                    particle: p,
                    max_translation: 0.3,
                },
                &system,
            )
            .unwrap(),
            Mover::new(
                "q",
                MoverKind::Floppy {
                    particle: q,
                    max_translation: 0.3,
                },
                &system,
            )
            .unwrap(),
        ];
        (system, p, scoring, movers)
    }

    #[test]
    fn construction_fails_without_movers() {
        assert_eq!(
            MonteCarlo::new(&config(1.0), Vec::new()).unwrap_err(),
            ConfigError::NoMovers
        );
    }

    #[test]
    fn frame_counter_starts_idle_and_counts_calls() {
        let (mut system, _, scoring, movers) = setup();
        let mut mc = MonteCarlo::new(&config(1.0), movers).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(mc.frame_number(), -1);
        assert_eq!(mc.output()["MonteCarlo_Nframe"], "-1");
        for expected in 0..5 {
            mc.optimize(1, &mut system, &scoring, &mut rng).unwrap();
            assert_eq!(mc.frame_number(), expected);
        }
    }

    #[test]
    fn optimize_runs_n_sweeps_over_all_movers() {
        let (mut system, _, scoring, movers) = setup();
        let mut mc = MonteCarlo::new(&config(1.0), movers).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let report = mc.optimize(7, &mut system, &scoring, &mut rng).unwrap();
        assert_eq!(report.steps, 14);
        assert!(mc.movers().iter().all(|m| m.stats().proposed == 7));
        assert_eq!(report.final_score, scoring.score(&system).unwrap());
        let accepted: u64 = mc.movers().iter().map(|m| m.stats().accepted).sum();
        assert_eq!(accepted as usize, report.accepted);
    }

    #[test]
    fn low_temperature_descends() {
        let (mut system, _, scoring, movers) = setup();
        let initial = scoring.score(&system).unwrap();
        let mut mc = MonteCarlo::new(&config(1e-3), movers).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let report = mc.optimize(200, &mut system, &scoring, &mut rng).unwrap();
        assert!(report.final_score < initial);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let run = |seed| {
            let (mut system, p, scoring, movers) = setup();
            let mut mc = MonteCarlo::new(&config(1.0), movers).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            let reports: Vec<OptimizeReport> = (0..10)
                .map(|_| mc.optimize(3, &mut system, &scoring, &mut rng).unwrap())
                .collect();
            (reports, system.position(p).unwrap())
        };
        assert_eq!(run(99), run(99));
    }

    #[test]
    fn acceptance_ratios_stay_in_unit_interval() {
        let (mut system, _, scoring, movers) = setup();
        let mut mc = MonteCarlo::new(&config(0.5), movers).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..20 {
            mc.optimize(2, &mut system, &scoring, &mut rng).unwrap();
            for mover in mc.movers() {
                assert!((0.0..=1.0).contains(&mover.acceptance_ratio()));
            }
        }
    }

    #[test]
    fn annealing_sets_temperature_from_frame() {
        let (mut system, _, scoring, movers) = setup();
        let schedule = AnnealingSchedule::new(1.0, 5.0, 3, 2).unwrap();
        let config = MonteCarloConfigBuilder::new()
            .temperature(1.0)
            .simulated_annealing(Some(schedule))
            .build()
            .unwrap();
        let mut mc = MonteCarlo::new(&config, movers).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let temps: Vec<f64> = (0..6)
            .map(|_| {
                mc.optimize(1, &mut system, &scoring, &mut rng).unwrap();
                mc.kt()
            })
            .collect();
        assert_eq!(temps, vec![1.0, 1.0, 1.0, 5.0, 5.0, 1.0]);
    }

    #[test]
    fn adaptive_factors_follow_clamped_ratio() {
        assert_eq!(adaptive_step_factor(0.5), None);
        assert_eq!(adaptive_step_factor(0.4), None);
        assert_eq!(adaptive_step_factor(0.6), None);
        assert!((adaptive_step_factor(0.8).unwrap() - 1.6).abs() < 1e-12);
        assert!((adaptive_step_factor(0.02).unwrap() - 0.1).abs() < 1e-12);
        assert!((adaptive_step_factor(0.0).unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(adaptive_step_factor(1.0), Some(2.0));
    }

    #[test]
    fn self_adaptive_grows_steps_of_always_accepted_movers() {
        let mut system = SamplingSystem::new();
        let p = system.add_particle("p", 1.0, Point3::origin()).unwrap();
        let scoring = ScoringFunctionBuilder::new()
            .term(FnTerm::new("flat", |_| Ok(0.0)))
            .build()
            .unwrap();
        let mover = Mover::new(
            "p",
            MoverKind::Floppy {
                particle: p,
                max_translation: 0.1,
            },
            &system,
        )
        .unwrap();
        let config = MonteCarloConfigBuilder::new()
            .temperature(1.0)
            .self_adaptive(true)
            .build()
            .unwrap();
        let mut mc = MonteCarlo::new(&config, vec![mover]).unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        mc.optimize(1, &mut system, &scoring, &mut rng).unwrap();
        assert!((mc.movers()[0].step_size() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn scoring_error_restores_configuration_and_propagates() {
        let mut system = SamplingSystem::new();
        let p = system.add_particle("p", 1.0, Point3::origin()).unwrap();
        let scoring = ScoringFunctionBuilder::new()
            .term(FnTerm::new("fragile", move |s: &SamplingSystem| {
                let position = s.position(p).ok_or(ScoringError::ParticleNotFound(p))?;
                if position == Point3::origin() {
                    Ok(0.0)
                } else {
                    Err(ScoringError::Evaluation {
                        term: "fragile".to_string(),
                        reason: "moved".to_string(),
                    })
                }
            }))
            .build()
            .unwrap();
        let mover = Mover::new(
            "p",
            MoverKind::Floppy {
                particle: p,
                max_translation: 1.0,
            },
            &system,
        )
        .unwrap();
        let mut mc = MonteCarlo::new(&config(1.0), vec![mover]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let err = mc.optimize(1, &mut system, &scoring, &mut rng).unwrap_err();
        assert!(matches!(err, EngineError::Scoring { .. }));
        assert_eq!(system.position(p).unwrap(), Point3::origin());
        assert!(!mc.movers()[0].has_pending_proposal());
    }

    #[test]
    fn output_reports_per_mover_keys() {
        let (_, _, _, movers) = setup();
        let mc = MonteCarlo::new(&config(2.0), movers).unwrap();
        let output = mc.output();
        assert_eq!(output["MonteCarlo_Acceptance_p_0"], "0");
        assert_eq!(output["MonteCarlo_StepSize_q_1"], "0.3");
        assert_eq!(output["MonteCarlo_Temperature"], "2");
    }

    #[test]
    fn nuisance_step_sizes_list_only_nuisance_movers() {
        let mut system = SamplingSystem::new();
        let sigma = system.add_nuisance("sigma", 1.0, 0.1, 5.0).unwrap();
        let p = system.add_particle("p", 1.0, Point3::origin()).unwrap();
        let movers = vec![
            Mover::new(
                "sigma",
                MoverKind::Nuisance {
                    nuisance: sigma,
                    sigma: 0.2,
                },
                &system,
            )
            .unwrap(),
            Mover::new(
                "p",
                MoverKind::Floppy {
                    particle: p,
                    max_translation: 1.0,
                },
                &system,
            )
            .unwrap(),
        ];
        let mc = MonteCarlo::new(&config(1.0), movers).unwrap();
        assert_eq!(mc.nuisance_step_sizes(), vec![("sigma".to_string(), 0.2)]);
    }
}
