use super::output::OutputMap;

/// Events emitted while a sampling run advances.
///
/// Replica threads report concurrently, so a callback sees the events of different
/// replicas interleaved.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    /// Total number of frames over all replicas.
    TaskStart { total_steps: u64 },
    /// One replica finished one frame.
    TaskIncrement,
    /// Telemetry row of a finished frame, reported before its `TaskIncrement`.
    Frame { replica: usize, row: OutputMap },
    TaskFinish,

    ReplicaFinished {
        replica: usize,
        temperature: f64,
        best_score: f64,
    },

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
