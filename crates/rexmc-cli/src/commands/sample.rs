use crate::cli::SampleArgs;
use crate::config::{self, AppConfig};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use crate::utils::stats::{self, StatWriter};
use rexmc::engine::progress::{Progress, ProgressReporter};
use rexmc::workflows::{self, model::SamplingModel, sample::SamplingResult};
use tracing::{info, warn};

pub fn run(args: SampleArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app_config = config::build_config(&args)?;

    info!("Loading model from {:?}", &app_config.model_path);
    let model = SamplingModel::load(&app_config.model_path)?;

    let stat_writer = StatWriter::create(&app_config.stat_path)?;
    let progress_handler = CliProgressHandler::new();
    let on_progress = progress_handler.get_callback();
    let reporter = ProgressReporter::with_callback(Box::new(|event: Progress| match event {
        Progress::Frame { row, .. } => stat_writer.write_row(&row),
        other => on_progress(other),
    }));

    println!(
        "Sampling with {} replica(s) for {} frame(s)...",
        app_config.core_config.num_replicas, app_config.core_config.num_frames
    );
    info!("Invoking the core sampling workflow...");
    let sampling = workflows::sample::run(&model, &app_config.core_config, &reporter);
    drop(reporter);

    // Rows of a failed run stay on disk; the sampling error takes precedence.
    let rows = stat_writer.finish();
    let result = sampling?;
    let rows = rows?;
    println!(
        "✓ {} stat row(s) written to: {}",
        rows,
        app_config.stat_path.display()
    );

    write_outputs(&app_config, &result)
}

fn write_outputs(app_config: &AppConfig, result: &SamplingResult) -> Result<()> {
    for replica in &result.replicas {
        info!(
            replica = replica.index,
            temperature = replica.final_temperature,
            best_score = replica.best_score,
            attempts = replica.statistics.attempts,
            success_ratio = replica.statistics.success_ratio(),
            "Replica finished."
        );
    }

    let Some(best) = result.best() else {
        warn!("Sampling finished without any replica outcome.");
        return Ok(());
    };
    println!(
        "  Best score {:.4} found by replica {}.",
        best.best_score, best.index
    );

    if let Some(best_path) = &app_config.best_path {
        let particles = stats::write_configuration(best_path, &best.best_system)?;
        println!(
            "✓ Best configuration ({} particle(s)) written to: {}",
            particles,
            best_path.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::error::CliError;
    use clap::Parser;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const MODEL: &str = r#"
[[particles]]
name = "bead"
radius = 1.0
coordinates = [3.0, 0.0, 0.0]

[[movers]]
type = "floppy"
particle = "bead"
max-translation = 0.5

[[restraints]]
type = "distance-to-point"
name = "anchor"
particle = "bead"
anchor = [0.0, 0.0, 0.0]
radius = 1.0
kappa = 1.0
"#;

    fn sample_args(dir: &Path, extra: &[&str]) -> SampleArgs {
        let model_path = dir.join("model.toml");
        fs::write(&model_path, MODEL).unwrap();
        let mut argv = vec![
            "rexmc".to_string(),
            "sample".to_string(),
            "-m".to_string(),
            model_path.to_string_lossy().into_owned(),
            "-o".to_string(),
            dir.join("stat.csv").to_string_lossy().into_owned(),
            "--frames".to_string(),
            "5".to_string(),
            "--steps-per-frame".to_string(),
            "4".to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        match Cli::parse_from(argv).command {
            Commands::Sample(args) => args,
            _ => panic!("Expected 'sample' subcommand"),
        }
    }

    #[test]
    fn sampling_writes_stat_and_best_files() {
        let dir = tempdir().unwrap();
        let best_path = dir.path().join("best.csv");
        let args = sample_args(
            dir.path(),
            &["-n", "2", "--best", best_path.to_str().unwrap()],
        );

        run(args).unwrap();

        let mut reader = csv::Reader::from_path(dir.path().join("stat.csv")).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert!(headers.iter().any(|h| h == "ReplicaExchange_CurrentTemp"));
        assert!(headers.iter().any(|h| h == "Restraint_anchor"));
        assert_eq!(reader.records().count(), 10);

        let best = fs::read_to_string(best_path).unwrap();
        assert!(best.lines().nth(1).unwrap().starts_with("bead,"));
    }

    #[test]
    fn frame_rows_are_on_disk_before_the_writer_finishes() {
        let dir = tempdir().unwrap();
        let args = sample_args(dir.path(), &["-n", "2"]);
        let model = SamplingModel::load(&args.model).unwrap();
        let app_config = config::build_config(&args).unwrap();

        let stat_writer = StatWriter::create(&app_config.stat_path).unwrap();
        let reporter = ProgressReporter::with_callback(Box::new(|event: Progress| {
            if let Progress::Frame { row, .. } = event {
                stat_writer.write_row(&row);
            }
        }));
        let mut core_config = app_config.core_config.clone();
        core_config.num_frames = 3;
        workflows::sample::run(&model, &core_config, &reporter).unwrap();
        drop(reporter);

        let content = fs::read_to_string(&app_config.stat_path).unwrap();
        assert_eq!(content.lines().count(), 1 + 6);
        assert_eq!(stat_writer.finish().unwrap(), 6);
    }

    #[test]
    fn missing_model_file_is_reported() {
        let dir = tempdir().unwrap();
        let mut args = sample_args(dir.path(), &[]);
        args.model = dir.path().join("absent.toml");
        let result = run(args);
        assert!(matches!(result, Err(CliError::RexmcCore(_))));
        assert!(!dir.path().join("stat.csv").exists());
    }
}
