use super::{ScoreTerm, ScoringError};
use crate::core::models::system::SamplingSystem;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct WeightedTerm {
    pub weight: f64,
    pub term: Arc<dyn ScoreTerm>,
}

/// The total score: a weighted sum of terms, fixed at construction.
#[derive(Debug, Clone)]
pub struct ScoringFunction {
    terms: Vec<WeightedTerm>,
}

impl ScoringFunction {
    /// Evaluates the weighted sum of all terms.
    ///
    /// # Errors
    ///
    /// Propagates the first term error, or [`ScoringError::NonFinite`] if a weighted
    /// contribution is NaN or infinite.
    pub fn score(&self, system: &SamplingSystem) -> Result<f64, ScoringError> {
        let mut total = 0.0;
        for weighted in &self.terms {
            total += Self::weighted_value(weighted, system)?;
        }
        Ok(total)
    }

    /// Evaluates every term separately, in insertion order, as `(name, weighted value)`.
    pub fn evaluate_terms(&self, system: &SamplingSystem) -> Result<Vec<(String, f64)>, ScoringError> {
        self.terms
            .iter()
            .map(|weighted| {
                Self::weighted_value(weighted, system)
                    .map(|value| (weighted.term.name().to_string(), value))
            })
            .collect()
    }

    pub fn terms(&self) -> &[WeightedTerm] {
        &self.terms
    }

    fn weighted_value(weighted: &WeightedTerm, system: &SamplingSystem) -> Result<f64, ScoringError> {
        let value = weighted.weight * weighted.term.evaluate(system)?;
        if !value.is_finite() {
            return Err(ScoringError::NonFinite {
                term: weighted.term.name().to_string(),
            });
        }
        Ok(value)
    }
}

#[derive(Default)]
pub struct ScoringFunctionBuilder {
    terms: Vec<WeightedTerm>,
}

impl ScoringFunctionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(self, term: impl ScoreTerm + 'static) -> Self {
        self.weighted_term(1.0, term)
    }

    pub fn weighted_term(mut self, weight: f64, term: impl ScoreTerm + 'static) -> Self {
        self.terms.push(WeightedTerm {
            weight,
            term: Arc::new(term),
        });
        self
    }

    pub fn shared_term(mut self, weight: f64, term: Arc<dyn ScoreTerm>) -> Self {
        self.terms.push(WeightedTerm { weight, term });
        self
    }

    pub fn build(self) -> Result<ScoringFunction, ScoringError> {
        if self.terms.is_empty() {
            return Err(ScoringError::NoTerms);
        }
        if let Some(bad) = self
            .terms
            .iter()
            .find(|t| !t.weight.is_finite() || t.weight < 0.0)
        {
            return Err(ScoringError::InvalidWeight {
                term: bad.term.name().to_string(),
                weight: bad.weight,
            });
        }
        Ok(ScoringFunction { terms: self.terms })
    }
}

type ScoreFn = dyn Fn(&SamplingSystem) -> Result<f64, ScoringError> + Send + Sync;

/// A term backed by a caller-supplied closure.
pub struct FnTerm {
    name: String,
    function: Box<ScoreFn>,
}

impl FnTerm {
    pub fn new<F>(name: &str, function: F) -> Self
    where
        F: Fn(&SamplingSystem) -> Result<f64, ScoringError> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            function: Box::new(function),
        }
    }
}

impl fmt::Debug for FnTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTerm").field("name", &self.name).finish()
    }
}

impl ScoreTerm for FnTerm {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, system: &SamplingSystem) -> Result<f64, ScoringError> {
        (self.function)(system)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(name: &str, value: f64) -> FnTerm {
        FnTerm::new(name, move |_| Ok(value))
    }

    #[test]
    fn build_without_terms_fails() {
        let err = ScoringFunctionBuilder::new().build().unwrap_err();
        assert_eq!(err, ScoringError::NoTerms);
    }

    #[test]
    fn negative_weight_is_rejected() {
        let err = ScoringFunctionBuilder::new()
            .weighted_term(-1.0, constant("c", 1.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, ScoringError::InvalidWeight { .. }));
    }

    #[test]
    fn score_is_weighted_sum_of_terms() {
        let scoring = ScoringFunctionBuilder::new()
            .term(constant("a", 1.5))
            .weighted_term(2.0, constant("b", 3.0))
            .build()
            .unwrap();
        let system = SamplingSystem::new();
        assert_eq!(scoring.score(&system).unwrap(), 7.5);
        assert_eq!(
            scoring.evaluate_terms(&system).unwrap(),
            vec![("a".to_string(), 1.5), ("b".to_string(), 6.0)]
        );
    }

    #[test]
    fn non_finite_contribution_is_an_error() {
        let scoring = ScoringFunctionBuilder::new()
            .term(constant("nan", f64::NAN))
            .build()
            .unwrap();
        let err = scoring.score(&SamplingSystem::new()).unwrap_err();
        assert_eq!(
            err,
            ScoringError::NonFinite {
                term: "nan".to_string()
            }
        );
    }

    #[test]
    fn term_errors_propagate() {
        let scoring = ScoringFunctionBuilder::new()
            .term(FnTerm::new("broken", |_| {
                Err(ScoringError::Evaluation {
                    term: "broken".to_string(),
                    reason: "collaborator unavailable".to_string(),
                })
            }))
            .build()
            .unwrap();
        assert!(matches!(
            scoring.score(&SamplingSystem::new()),
            Err(ScoringError::Evaluation { .. })
        ));
    }
}
