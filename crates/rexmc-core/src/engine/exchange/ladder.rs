use super::super::config::{ConfigError, validate_temperature};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LadderSpacing {
    /// Constant ratio between neighbouring temperatures.
    #[default]
    Geometric,
    /// Constant difference between neighbouring temperatures.
    Linear,
}

impl FromStr for LadderSpacing {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "geometric" => Ok(LadderSpacing::Geometric),
            "linear" => Ok(LadderSpacing::Linear),
            _ => Err(ConfigError::InvalidValue {
                parameter: "spacing",
                reason: format!("unknown ladder spacing '{}'", s),
            }),
        }
    }
}

impl fmt::Display for LadderSpacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LadderSpacing::Geometric => write!(f, "geometric"),
            LadderSpacing::Linear => write!(f, "linear"),
        }
    }
}

/// Builds a temperature ladder of `n` rungs from `min` to `max`.
///
/// The result is strictly increasing and its endpoints are exactly `min` and `max`.
/// A single rung ladder is `[min]`.
pub fn create_ladder(
    min: f64,
    max: f64,
    n: usize,
    spacing: LadderSpacing,
) -> Result<Vec<f64>, ConfigError> {
    validate_temperature(min)?;
    if n == 0 {
        return Err(ConfigError::NoReplicas);
    }
    if n == 1 {
        return Ok(vec![min]);
    }
    validate_temperature(max)?;
    if min >= max {
        return Err(ConfigError::InvalidTemperatureRange { min, max });
    }

    let last = (n - 1) as f64;
    let mut ladder: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64 / last;
            match spacing {
                LadderSpacing::Geometric => min * (max / min).powf(t),
                LadderSpacing::Linear => min + (max - min) * t,
            }
        })
        .collect();
    ladder[0] = min;
    ladder[n - 1] = max;
    // Bounds a few ulps apart cannot hold `n` distinct rungs.
    if !ladder.windows(2).all(|w| w[0] < w[1]) {
        return Err(ConfigError::InvalidTemperatureRange { min, max });
    }
    Ok(ladder)
}
