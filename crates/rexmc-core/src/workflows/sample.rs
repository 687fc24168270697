use crate::core::models::system::SamplingSystem;
use crate::engine::config::{ReplicaExchangeConfig, SamplingConfig};
use crate::engine::error::EngineError;
use crate::engine::exchange::local::LocalExchangeHub;
use crate::engine::exchange::serial::SerialExchange;
use crate::engine::exchange::{ExchangeBackend, ExchangeError};
use crate::engine::monte_carlo::MonteCarlo;
use crate::engine::output::{OutputMap, Telemetry, scoring_output};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::replica_exchange::{ExchangeStatistics, ReplicaExchange};
use crate::workflows::model::SamplingModel;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use tracing::{info, instrument, warn};

pub const REPLICA_KEY: &str = "Replica_Index";

type Backend = Box<dyn ExchangeBackend + Send>;

#[derive(Debug, Clone)]
pub struct ReplicaOutcome {
    pub index: usize,
    pub final_temperature: f64,
    pub final_score: f64,
    pub best_score: f64,
    /// Lowest-scoring configuration seen at the end of any frame.
    pub best_system: SamplingSystem,
    pub final_system: SamplingSystem,
    pub statistics: ExchangeStatistics,
    /// Frames completed. Their telemetry rows went out as [`Progress::Frame`] events.
    pub frames: u64,
}

#[derive(Debug, Clone)]
pub struct SamplingResult {
    pub temperatures: Vec<f64>,
    pub replicas: Vec<ReplicaOutcome>,
}

impl SamplingResult {
    /// The replica that found the lowest score.
    pub fn best(&self) -> Option<&ReplicaOutcome> {
        self.replicas
            .iter()
            .min_by(|a, b| a.best_score.total_cmp(&b.best_score))
    }
}

/// Runs replica-exchange Monte Carlo, one thread per replica.
///
/// Each replica clones the model, seeds its generator with `seed + index`, and for every
/// frame runs `optimize(steps_per_frame)` followed by one exchange attempt. Each frame's
/// telemetry row is reported as a [`Progress::Frame`] as soon as the frame ends. A single
/// replica uses the serial backend and never exchanges. The outcome is deterministic for
/// a given seed, independent of thread scheduling.
///
/// # Errors
///
/// The first replica failure stops the whole run: the other replicas are released from
/// the exchange rendezvous and the original error is returned. A panicking replica is
/// reported as [`EngineError::Internal`].
#[instrument(skip_all, name = "sampling_workflow", fields(replicas = config.num_replicas))]
pub fn run(
    model: &SamplingModel,
    config: &SamplingConfig,
    reporter: &ProgressReporter,
) -> Result<SamplingResult, EngineError> {
    reporter.report(Progress::PhaseStart { name: "Sampling" });
    let replicas = config.num_replicas;
    let exchange_config = exchange_settings(config);
    if replicas > 1 && config.monte_carlo.simulated_annealing.is_some() {
        warn!("Simulated annealing overrides the exchanged temperatures at every frame.");
    }

    let (hub, backends): (Option<LocalExchangeHub>, Vec<Backend>) = if replicas == 1 {
        (None, vec![Box::new(SerialExchange::new())])
    } else {
        let hub = LocalExchangeHub::new(replicas, config.seed)?;
        let backends = hub
            .ranks()
            .into_iter()
            .map(|rank| Box::new(rank) as Backend)
            .collect();
        (Some(hub), backends)
    };

    info!(
        replicas,
        frames = config.num_frames,
        steps_per_frame = config.steps_per_frame,
        seed = config.seed,
        "Starting sampling."
    );
    reporter.report(Progress::TaskStart {
        total_steps: replicas as u64 * config.num_frames,
    });

    let results: Vec<Result<ReplicaOutcome, EngineError>> = thread::scope(|scope| {
        let handles: Vec<_> = backends
            .into_iter()
            .enumerate()
            .map(|(index, backend)| {
                let hub = hub.as_ref();
                let exchange_config = &exchange_config;
                scope.spawn(move || {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        run_replica(index, backend, model, config, exchange_config, reporter)
                    }))
                    .unwrap_or_else(|_| {
                        Err(EngineError::Internal(format!("replica {} panicked", index)))
                    });
                    if let (Err(e), Some(hub)) = (&result, hub) {
                        warn!(replica = index, error = %e, "Replica failed; stopping the run.");
                        hub.abort();
                    }
                    result
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(EngineError::Internal("replica thread panicked".into())))
            })
            .collect()
    });

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let mut outcomes = Vec::with_capacity(replicas);
    let mut first_error: Option<EngineError> = None;
    for result in results {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                // Prefer the root cause over the aborts it triggered.
                let replace = match &first_error {
                    None => true,
                    Some(current) => is_abort(current) && !is_abort(&e),
                };
                if replace {
                    first_error = Some(e);
                }
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    let temperatures = crate::engine::exchange::ladder::create_ladder(
        exchange_config.min_temperature,
        exchange_config.max_temperature,
        replicas,
        exchange_config.spacing,
    )?;
    info!("Sampling finished.");
    Ok(SamplingResult {
        temperatures,
        replicas: outcomes,
    })
}

fn is_abort(error: &EngineError) -> bool {
    matches!(
        error,
        EngineError::Exchange {
            source: ExchangeError::Aborted
        }
    )
}

/// Exchange settings for the run. A lone replica sits at the lowest rung of the given
/// ladder, or at the Monte Carlo temperature when no ladder is given.
fn exchange_settings(config: &SamplingConfig) -> ReplicaExchangeConfig {
    match (&config.replica_exchange, config.num_replicas) {
        (Some(rex), n) if n > 1 => rex.clone(),
        (Some(rex), _) => ReplicaExchangeConfig {
            allow_odd_replicas: true,
            ..rex.clone()
        },
        (None, _) => ReplicaExchangeConfig {
            min_temperature: config.monte_carlo.temperature,
            max_temperature: config.monte_carlo.temperature,
            allow_odd_replicas: true,
            spacing: Default::default(),
        },
    }
}

fn run_replica(
    index: usize,
    backend: Backend,
    model: &SamplingModel,
    config: &SamplingConfig,
    exchange_config: &ReplicaExchangeConfig,
    reporter: &ProgressReporter,
) -> Result<ReplicaOutcome, EngineError> {
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(index as u64));
    let mut system = model.system.clone();
    let engine = MonteCarlo::new(&config.monte_carlo, model.movers.clone())?;
    let mut rex = ReplicaExchange::new(exchange_config, backend, engine)?;

    let mut final_score = model.scoring.score(&system)?;
    let mut best_score = final_score;
    let mut best_system = system.clone();

    for frame in 0..config.num_frames {
        let report =
            rex.engine_mut()
                .optimize(config.steps_per_frame, &mut system, &model.scoring, &mut rng)?;
        final_score = report.final_score;
        if final_score < best_score {
            best_score = final_score;
            best_system = system.clone();
        }
        rex.attempt_exchange_with_score(frame, final_score)?;

        let mut row = OutputMap::new();
        row.insert(REPLICA_KEY.to_string(), index.to_string());
        row.extend(rex.engine().output());
        row.extend(rex.output());
        row.extend(scoring_output(&model.scoring, &system));
        reporter.report(Progress::Frame {
            replica: index,
            row,
        });
        reporter.report(Progress::TaskIncrement);
    }

    rex.log_summary();
    reporter.report(Progress::ReplicaFinished {
        replica: index,
        temperature: rex.my_temperature(),
        best_score,
    });
    Ok(ReplicaOutcome {
        index,
        final_temperature: rex.my_temperature(),
        final_score,
        best_score,
        best_system,
        final_system: system,
        statistics: rex.statistics(),
        frames: config.num_frames,
    })
}
