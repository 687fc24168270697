use super::{ScoreTerm, ScoringError};
use crate::core::models::ids::{NuisanceId, ParticleId, RigidBodyId};
use crate::core::models::particle::Placement;
use crate::core::models::system::SamplingSystem;
use nalgebra::Point3;
use rayon::prelude::*;

pub const DEFAULT_BARRIER_KAPPA: f64 = 10.0;

#[inline]
fn harmonic_upper_bound(x: f64, bound: f64, kappa: f64) -> f64 {
    if x > bound {
        0.5 * kappa * (x - bound).powi(2)
    } else {
        0.0
    }
}

#[inline]
fn harmonic_lower_bound(x: f64, bound: f64, kappa: f64) -> f64 {
    if x < bound {
        0.5 * kappa * (x - bound).powi(2)
    } else {
        0.0
    }
}

fn position_of(system: &SamplingSystem, id: ParticleId) -> Result<Point3<f64>, ScoringError> {
    system
        .position(id)
        .ok_or(ScoringError::ParticleNotFound(id))
}

/// Keeps the distance between two particles within `[min, max]` with harmonic walls.
#[derive(Debug, Clone)]
pub struct DistanceRestraint {
    name: String,
    a: ParticleId,
    b: ParticleId,
    min: f64,
    max: f64,
    kappa: f64,
}

impl DistanceRestraint {
    pub fn new(name: &str, a: ParticleId, b: ParticleId, min: f64, max: f64, kappa: f64) -> Self {
        Self {
            name: name.to_string(),
            a,
            b,
            min,
            max,
            kappa,
        }
    }
}

impl ScoreTerm for DistanceRestraint {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, system: &SamplingSystem) -> Result<f64, ScoringError> {
        let d = (position_of(system, self.a)? - position_of(system, self.b)?).norm();
        Ok(harmonic_upper_bound(d, self.max, self.kappa)
            + harmonic_lower_bound(d, self.min, self.kappa))
    }
}

/// Keeps one particle within `radius` of a fixed anchor point.
#[derive(Debug, Clone)]
pub struct DistanceToPointRestraint {
    name: String,
    particle: ParticleId,
    anchor: Point3<f64>,
    radius: f64,
    kappa: f64,
}

impl DistanceToPointRestraint {
    pub fn new(
        name: &str,
        particle: ParticleId,
        anchor: Point3<f64>,
        radius: f64,
        kappa: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            particle,
            anchor,
            radius,
            kappa,
        }
    }
}

impl ScoreTerm for DistanceToPointRestraint {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, system: &SamplingSystem) -> Result<f64, ScoringError> {
        let d = (position_of(system, self.particle)? - self.anchor).norm();
        Ok(harmonic_upper_bound(d, self.radius, self.kappa))
    }
}

/// Confines a set of particles to a sphere.
#[derive(Debug, Clone)]
pub struct ExternalBarrier {
    name: String,
    particles: Vec<ParticleId>,
    center: Point3<f64>,
    radius: f64,
    kappa: f64,
}

impl ExternalBarrier {
    pub fn new(name: &str, particles: Vec<ParticleId>, center: Point3<f64>, radius: f64) -> Self {
        Self {
            name: name.to_string(),
            particles,
            center,
            radius,
            kappa: DEFAULT_BARRIER_KAPPA,
        }
    }

    pub fn with_kappa(mut self, kappa: f64) -> Self {
        self.kappa = kappa;
        self
    }
}

impl ScoreTerm for ExternalBarrier {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, system: &SamplingSystem) -> Result<f64, ScoringError> {
        let mut total = 0.0;
        for &id in &self.particles {
            let d = (position_of(system, id)? - self.center).norm();
            total += harmonic_upper_bound(d, self.radius, self.kappa);
        }
        Ok(total)
    }
}

/// Soft-sphere overlap penalty between particles.
///
/// Pairs of rigid members of the same body are skipped: their distance cannot change.
#[derive(Debug, Clone)]
pub struct ExcludedVolume {
    name: String,
    particles: Vec<ParticleId>,
    kappa: f64,
}

impl ExcludedVolume {
    pub fn new(name: &str, particles: Vec<ParticleId>, kappa: f64) -> Self {
        Self {
            name: name.to_string(),
            particles,
            kappa,
        }
    }
}

struct Sphere {
    center: Point3<f64>,
    radius: f64,
    rigid_body: Option<RigidBodyId>,
}

impl ScoreTerm for ExcludedVolume {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, system: &SamplingSystem) -> Result<f64, ScoringError> {
        let spheres = self
            .particles
            .iter()
            .map(|&id| {
                let particle = system
                    .particle(id)
                    .ok_or(ScoringError::ParticleNotFound(id))?;
                let rigid_body = match particle.placement {
                    Placement::RigidMember { body, .. } => Some(body),
                    _ => None,
                };
                Ok(Sphere {
                    center: position_of(system, id)?,
                    radius: particle.radius,
                    rigid_body,
                })
            })
            .collect::<Result<Vec<_>, ScoringError>>()?;

        let total = (0..spheres.len())
            .into_par_iter()
            .map(|i| {
                let a = &spheres[i];
                spheres[i + 1..]
                    .iter()
                    .filter(|b| a.rigid_body.is_none() || a.rigid_body != b.rigid_body)
                    .map(|b| {
                        let overlap = a.radius + b.radius - (a.center - b.center).norm();
                        if overlap > 0.0 {
                            0.5 * self.kappa * overlap * overlap
                        } else {
                            0.0
                        }
                    })
                    .sum::<f64>()
            })
            .sum();
        Ok(total)
    }
}

/// Non-informative prior on a scale parameter: energy `ln(value)`.
#[derive(Debug, Clone)]
pub struct JeffreysPrior {
    name: String,
    nuisance: NuisanceId,
}

impl JeffreysPrior {
    pub fn new(name: &str, nuisance: NuisanceId) -> Self {
        Self {
            name: name.to_string(),
            nuisance,
        }
    }
}

impl ScoreTerm for JeffreysPrior {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, system: &SamplingSystem) -> Result<f64, ScoringError> {
        let value = system
            .nuisance(self.nuisance)
            .ok_or(ScoringError::NuisanceNotFound(self.nuisance))?
            .value;
        if value <= 0.0 {
            return Err(ScoringError::Evaluation {
                term: self.name.clone(),
                reason: format!("scale parameter must be positive, got {}", value),
            });
        }
        Ok(value.ln())
    }
}
