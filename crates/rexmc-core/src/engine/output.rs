use crate::core::models::system::SamplingSystem;
use crate::core::scoring::function::ScoringFunction;
use std::collections::BTreeMap;

/// Flat telemetry record: key to string-encoded scalar.
pub type OutputMap = BTreeMap<String, String>;

/// Components that report their state as a flat [`OutputMap`].
pub trait Telemetry {
    fn output(&self) -> OutputMap;
}

pub const TOTAL_SCORE_KEY: &str = "Total_Score";

/// Per-term scores of `scoring` as `Restraint_<name>` entries plus `Total_Score`.
///
/// Terms that fail to evaluate are reported as `NaN` rather than dropped, so every row of
/// a stat file has the same columns.
pub fn scoring_output(scoring: &ScoringFunction, system: &SamplingSystem) -> OutputMap {
    let mut output = OutputMap::new();
    let mut total = 0.0;
    let mut failed = false;
    for weighted in scoring.terms() {
        let name = weighted.term.name();
        let value = weighted
            .term
            .evaluate(system)
            .map(|v| weighted.weight * v)
            .unwrap_or(f64::NAN);
        failed |= !value.is_finite();
        total += value;
        output.insert(format!("Restraint_{}", name), value.to_string());
    }
    let total = if failed { f64::NAN } else { total };
    output.insert(TOTAL_SCORE_KEY.to_string(), total.to_string());
    output
}
