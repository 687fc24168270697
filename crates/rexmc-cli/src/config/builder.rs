use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileSimulatedAnnealingConfig, FileSpacing};
use super::models::AppConfig;
use crate::cli::SampleArgs;
use crate::error::{CliError, Result};
use rexmc::engine::annealing::AnnealingSchedule;
use rexmc::engine::config as core_config;
use std::str::FromStr;
use tracing::debug;

pub fn build_config(args: &SampleArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let run_file = file_config.run.take().unwrap_or_default();
    let num_frames = args
        .frames
        .or(run_file.frames)
        .unwrap_or(defaults.num_frames);
    let steps_per_frame = args
        .steps_per_frame
        .or(run_file.steps_per_frame)
        .unwrap_or(defaults.steps_per_frame);
    let seed = args.seed.or(run_file.seed).unwrap_or(defaults.seed);

    let mc_file = file_config.monte_carlo.take().unwrap_or_default();
    let temperature = args
        .temperature
        .or(mc_file.temperature)
        .unwrap_or(defaults.temperature);
    let self_adaptive = args
        .self_adaptive
        .as_override()
        .or(mc_file.self_adaptive)
        .unwrap_or(defaults.self_adaptive);
    let mover_order = args
        .mover_order
        .map(Into::into)
        .or(mc_file.mover_order.map(Into::into))
        .unwrap_or_default();
    let annealing =
        merge_simulated_annealing(args.no_annealing, mc_file.simulated_annealing, &defaults)?;

    let monte_carlo = core_config::MonteCarloConfigBuilder::new()
        .temperature(temperature)
        .self_adaptive(self_adaptive)
        .mover_order(mover_order)
        .simulated_annealing(annealing)
        .build()?;

    let rex_file = file_config.replica_exchange.take().unwrap_or_default();
    let num_replicas = args
        .replicas
        .or(rex_file.replicas)
        .unwrap_or(defaults.num_replicas);

    // A single replica samples at the Monte Carlo temperature and never exchanges.
    let replica_exchange = if num_replicas > 1 {
        let spacing = args
            .spacing
            .map(Into::into)
            .or(rex_file.spacing.map(Into::into))
            .unwrap_or_default();
        let config = core_config::ReplicaExchangeConfigBuilder::new()
            .min_temperature(
                args.min_temperature
                    .or(rex_file.min_temperature)
                    .unwrap_or(defaults.min_temperature),
            )
            .max_temperature(
                args.max_temperature
                    .or(rex_file.max_temperature)
                    .unwrap_or(defaults.max_temperature),
            )
            .allow_odd_replicas(
                args.allow_odd_replicas || rex_file.allow_odd_replicas.unwrap_or(false),
            )
            .spacing(spacing)
            .build()?;
        if num_replicas % 2 != 0 && !config.allow_odd_replicas {
            return Err(core_config::ConfigError::OddReplicaCount(num_replicas).into());
        }
        Some(config)
    } else {
        None
    };

    let core_config = core_config::SamplingConfigBuilder::new()
        .monte_carlo(monte_carlo)
        .replica_exchange(replica_exchange)
        .num_replicas(num_replicas)
        .num_frames(num_frames)
        .steps_per_frame(steps_per_frame)
        .seed(seed)
        .build()?;
    debug!("Final sampling configuration: {:?}", core_config);

    Ok(AppConfig {
        model_path: args.model.clone(),
        stat_path: args.output.clone(),
        best_path: args.best.clone(),
        core_config,
    })
}

fn merge_simulated_annealing(
    cli_no_annealing: bool,
    file_val: Option<FileSimulatedAnnealingConfig>,
    defaults: &DefaultsConfig,
) -> Result<Option<AnnealingSchedule>> {
    if cli_no_annealing {
        return Ok(None);
    }
    let Some(p) = file_val else {
        return Ok(None);
    };
    let schedule = AnnealingSchedule::new(
        p.min_temperature.unwrap_or(defaults.min_temperature),
        p.max_temperature.unwrap_or(defaults.max_temperature),
        p.min_time.unwrap_or(defaults.annealing_min_time),
        p.max_time.unwrap_or(defaults.annealing_max_time),
    )?;
    Ok(Some(schedule))
}

fn parse_value<T: FromStr>(key: &str, value_str: &str) -> Result<T> {
    value_str.parse().map_err(|_| {
        CliError::Config(format!("Invalid value for {}: {}", key, value_str))
    })
}

fn parse_spacing(key: &str, value_str: &str) -> Result<FileSpacing> {
    match value_str.to_ascii_lowercase().as_str() {
        "geometric" => Ok(FileSpacing::Geometric),
        "linear" => Ok(FileSpacing::Linear),
        _ => Err(CliError::Config(format!(
            "Invalid value for {}: {}",
            key, value_str
        ))),
    }
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "run.frames" => {
                config.run.get_or_insert_with(Default::default).frames =
                    Some(parse_value(key, value_str)?);
            }
            "run.steps-per-frame" => {
                config.run.get_or_insert_with(Default::default).steps_per_frame =
                    Some(parse_value(key, value_str)?);
            }
            "run.seed" => {
                config.run.get_or_insert_with(Default::default).seed =
                    Some(parse_value(key, value_str)?);
            }
            "monte-carlo.temperature" => {
                config
                    .monte_carlo
                    .get_or_insert_with(Default::default)
                    .temperature = Some(parse_value(key, value_str)?);
            }
            "monte-carlo.self-adaptive" => {
                config
                    .monte_carlo
                    .get_or_insert_with(Default::default)
                    .self_adaptive = Some(parse_value(key, value_str)?);
            }
            "monte-carlo.simulated-annealing.min-temperature" => {
                config
                    .monte_carlo
                    .get_or_insert_with(Default::default)
                    .simulated_annealing
                    .get_or_insert_with(Default::default)
                    .min_temperature = Some(parse_value(key, value_str)?);
            }
            "monte-carlo.simulated-annealing.max-temperature" => {
                config
                    .monte_carlo
                    .get_or_insert_with(Default::default)
                    .simulated_annealing
                    .get_or_insert_with(Default::default)
                    .max_temperature = Some(parse_value(key, value_str)?);
            }
            "replica-exchange.replicas" => {
                config
                    .replica_exchange
                    .get_or_insert_with(Default::default)
                    .replicas = Some(parse_value(key, value_str)?);
            }
            "replica-exchange.min-temperature" => {
                config
                    .replica_exchange
                    .get_or_insert_with(Default::default)
                    .min_temperature = Some(parse_value(key, value_str)?);
            }
            "replica-exchange.max-temperature" => {
                config
                    .replica_exchange
                    .get_or_insert_with(Default::default)
                    .max_temperature = Some(parse_value(key, value_str)?);
            }
            "replica-exchange.spacing" => {
                config
                    .replica_exchange
                    .get_or_insert_with(Default::default)
                    .spacing = Some(parse_spacing(key, value_str)?);
            }
            "replica-exchange.allow-odd-replicas" => {
                config
                    .replica_exchange
                    .get_or_insert_with(Default::default)
                    .allow_odd_replicas = Some(parse_value(key, value_str)?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::SelfAdaptive;
    use rexmc::engine::config::MoverOrder;
    use rexmc::engine::exchange::ladder::LadderSpacing;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn base_sample_args() -> SampleArgs {
        SampleArgs {
            model: PathBuf::from("model.toml"),
            output: PathBuf::from("stat.csv"),
            config: None,
            best: None,
            frames: None,
            steps_per_frame: None,
            seed: None,
            temperature: None,
            mover_order: None,
            self_adaptive: SelfAdaptive {
                self_adaptive: false,
                fixed_steps: false,
            },
            no_annealing: false,
            replicas: None,
            min_temperature: None,
            max_temperature: None,
            spacing: None,
            allow_odd_replicas: false,
            set_values: vec![],
        }
    }

    #[test]
    fn defaults_give_a_single_replica_run() {
        let app = build_config(&base_sample_args()).expect("build ok");
        let cfg = app.core_config;
        let defaults = DefaultsConfig::default();

        assert_eq!(cfg.num_replicas, 1);
        assert!(cfg.replica_exchange.is_none());
        assert_eq!(cfg.num_frames, defaults.num_frames);
        assert_eq!(cfg.steps_per_frame, defaults.steps_per_frame);
        assert_eq!(cfg.seed, defaults.seed);
        assert_eq!(cfg.monte_carlo.temperature, defaults.temperature);
        assert!(!cfg.monte_carlo.self_adaptive);
        assert!(cfg.monte_carlo.simulated_annealing.is_none());
        assert_eq!(cfg.monte_carlo.mover_order, MoverOrder::Sequential);
        assert_eq!(app.stat_path, PathBuf::from("stat.csv"));
    }

    #[test]
    fn file_values_are_merged_and_cli_overrides_them() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("sampling.toml");
        fs::write(
            &cfg_path,
            r#"
            [run]
            frames = 50
            seed = 3

            [monte-carlo]
            self-adaptive = true
            mover-order = "shuffled"

            [monte-carlo.simulated-annealing]
            min-time = 4
            max-time = 2

            [replica-exchange]
            replicas = 4
            min-temperature = 1.0
            max-temperature = 4.0
            spacing = "linear"
            "#,
        )
        .unwrap();

        let mut args = base_sample_args();
        args.config = Some(cfg_path);
        args.frames = Some(80);
        args.self_adaptive = SelfAdaptive {
            self_adaptive: false,
            fixed_steps: true,
        };

        let cfg = build_config(&args).expect("build ok").core_config;
        assert_eq!(cfg.num_frames, 80);
        assert_eq!(cfg.seed, 3);
        assert!(!cfg.monte_carlo.self_adaptive);
        assert_eq!(cfg.monte_carlo.mover_order, MoverOrder::Shuffled);
        let schedule = cfg.monte_carlo.simulated_annealing.unwrap();
        assert_eq!(schedule.min_time(), 4);
        assert_eq!(schedule.max_time(), 2);
        assert_eq!(cfg.num_replicas, 4);
        let rex = cfg.replica_exchange.unwrap();
        assert_eq!(rex.max_temperature, 4.0);
        assert_eq!(rex.spacing, LadderSpacing::Linear);
    }

    #[test]
    fn no_annealing_flag_drops_the_schedule() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("sampling.toml");
        fs::write(
            &cfg_path,
            "[monte-carlo.simulated-annealing]\nmin-time = 1\nmax-time = 1\n",
        )
        .unwrap();

        let mut args = base_sample_args();
        args.config = Some(cfg_path);
        args.no_annealing = true;

        let cfg = build_config(&args).unwrap().core_config;
        assert!(cfg.monte_carlo.simulated_annealing.is_none());
    }

    #[test]
    fn set_values_override_file_and_defaults() {
        let mut args = base_sample_args();
        args.set_values = vec![
            "replica-exchange.replicas=6".to_string(),
            "replica-exchange.spacing=linear".to_string(),
            "replica-exchange.max-temperature=3.0".to_string(),
            "run.steps-per-frame=25".to_string(),
        ];

        let cfg = build_config(&args).unwrap().core_config;
        assert_eq!(cfg.num_replicas, 6);
        assert_eq!(cfg.steps_per_frame, 25);
        let rex = cfg.replica_exchange.unwrap();
        assert_eq!(rex.spacing, LadderSpacing::Linear);
        assert_eq!(rex.max_temperature, 3.0);
        assert_eq!(rex.min_temperature, DefaultsConfig::default().min_temperature);
    }

    #[test]
    fn malformed_or_unknown_set_values_are_rejected() {
        let mut args = base_sample_args();
        args.set_values = vec!["run.frames".to_string()];
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));

        args.set_values = vec!["run.frames=many".to_string()];
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));

        args.set_values = vec!["run.temperature=2".to_string()];
        let Err(CliError::Config(msg)) = build_config(&args) else {
            panic!("Expected a configuration error");
        };
        assert!(msg.contains("run.temperature"));
    }

    #[test]
    fn odd_replica_count_needs_the_override() {
        let mut args = base_sample_args();
        args.replicas = Some(3);
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));

        args.allow_odd_replicas = true;
        let cfg = build_config(&args).unwrap().core_config;
        assert!(cfg.replica_exchange.unwrap().allow_odd_replicas);
    }

    #[test]
    fn inverted_temperature_range_is_a_configuration_error() {
        let mut args = base_sample_args();
        args.replicas = Some(2);
        args.min_temperature = Some(3.0);
        args.max_temperature = Some(1.0);
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));
    }
}
