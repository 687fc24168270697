use crate::error::{CliError, Result};
use rexmc::core::models::system::SamplingSystem;
use rexmc::engine::output::OutputMap;
use rexmc::workflows::sample::REPLICA_KEY;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

const FRAME_KEY: &str = "MonteCarlo_Nframe";

/// Column order of the stat file: replica and frame first, then every other key sorted.
fn stat_columns(row: &OutputMap) -> Vec<String> {
    [REPLICA_KEY, FRAME_KEY]
        .into_iter()
        .chain(
            row.keys()
                .map(String::as_str)
                .filter(|k| *k != REPLICA_KEY && *k != FRAME_KEY),
        )
        .map(str::to_string)
        .collect()
}

struct StatState {
    writer: csv::Writer<File>,
    columns: Option<Vec<String>>,
    rows: usize,
    error: Option<csv::Error>,
}

/// Appends telemetry rows to the stat file as replicas finish their frames.
///
/// The header is taken from the first row. Every row is flushed once written, so a
/// failed run leaves the frames completed before the failure on disk. Replica threads
/// share one writer; rows appear in the order frames complete.
pub struct StatWriter {
    path: PathBuf,
    state: Mutex<StatState>,
}

impl StatWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let writer = csv::Writer::from_path(path).map_err(|source| CliError::Output {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(StatState {
                writer,
                columns: None,
                rows: 0,
                error: None,
            }),
        })
    }

    /// Writes one row. Keys outside the header are dropped and missing keys are left
    /// empty. After the first failure further rows are ignored; [`StatWriter::finish`]
    /// reports it.
    pub fn write_row(&self, row: &OutputMap) {
        let Ok(mut state) = self.state.lock() else {
            warn!("Stat writer mutex was poisoned. Dropping a frame row.");
            return;
        };
        if state.error.is_some() {
            return;
        }
        if let Err(e) = Self::append(&mut state, row) {
            warn!(error = %e, "Failed to write to {:?}", self.path);
            state.error = Some(e);
        }
    }

    fn append(state: &mut StatState, row: &OutputMap) -> std::result::Result<(), csv::Error> {
        if state.columns.is_none() {
            let columns = stat_columns(row);
            state.writer.write_record(&columns)?;
            state.columns = Some(columns);
        }
        let StatState {
            writer, columns, ..
        } = state;
        if let Some(columns) = columns {
            let record = columns
                .iter()
                .map(|c| row.get(c).map(String::as_str).unwrap_or(""));
            writer.write_record(record)?;
        }
        writer.flush()?;
        state.rows += 1;
        Ok(())
    }

    /// Flushes the file and returns the number of data rows written.
    pub fn finish(self) -> Result<usize> {
        let path = self.path;
        let output_error = |source| CliError::Output {
            path: path.clone(),
            source,
        };
        let mut state = self
            .state
            .into_inner()
            .map_err(|_| CliError::Other(anyhow::anyhow!("Stat writer mutex was poisoned")))?;
        if let Some(e) = state.error.take() {
            return Err(output_error(e));
        }
        state.writer.flush()?;
        debug!(
            rows = state.rows,
            columns = state.columns.as_ref().map_or(0, Vec::len),
            "Stat file written to {:?}",
            path
        );
        Ok(state.rows)
    }
}

#[derive(Serialize)]
struct ParticleRecord<'a> {
    particle: &'a str,
    x: f64,
    y: f64,
    z: f64,
    radius: f64,
}

/// Writes the global coordinates of every particle of `system`, sorted by name.
pub fn write_configuration(path: &Path, system: &SamplingSystem) -> Result<usize> {
    let output_error = |source| CliError::Output {
        path: path.to_path_buf(),
        source,
    };
    let mut particles: Vec<_> = system
        .particles_iter()
        .filter_map(|(id, p)| system.position(id).map(|pos| (p, pos)))
        .collect();
    particles.sort_by(|a, b| a.0.name.cmp(&b.0.name));

    let mut writer = csv::Writer::from_path(path).map_err(output_error)?;
    for (particle, pos) in &particles {
        writer
            .serialize(ParticleRecord {
                particle: &particle.name,
                x: pos.x,
                y: pos.y,
                z: pos.z,
                radius: particle.radius,
            })
            .map_err(output_error)?;
    }
    writer.flush()?;
    Ok(particles.len())
}
