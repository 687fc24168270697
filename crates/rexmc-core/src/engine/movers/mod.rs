//! # Movers
//!
//! A [`Mover`] perturbs one well-defined part of a [`SamplingSystem`] and can undo that
//! perturbation exactly. The Monte Carlo engine drives every mover through the same
//! three-phase protocol:
//!
//! 1. [`Mover::propose`] saves the current state of the target and perturbs it.
//! 2. The engine scores the perturbed system and applies the Metropolis criterion.
//! 3. [`Mover::accept`] keeps the change, or [`Mover::reject`] restores the saved state.
//!
//! What is moved is described by [`MoverKind`]. A particle that is a rigid member of a
//! rigid body can only be moved through its body; targeting it with a particle mover is a
//! construction error.

mod snapshot;

use crate::core::models::ids::{NuisanceId, ParticleId, RigidBodyId, WeightId};
use crate::core::models::parameters::project_onto_simplex;
use crate::core::models::particle::Placement;
use crate::core::models::system::SamplingSystem;
use crate::core::utils::geometry::{
    centroid, random_rotation, random_rotation_about, random_vector_in_ball,
};
use nalgebra::{Isometry3, Point3, Translation3, Unit, UnitQuaternion, Vector3};
use rand::Rng;
use rand_distr::StandardNormal;
use snapshot::Snapshot;
use std::f64::consts::PI;
use thiserror::Error;

use super::config::ConfigError;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum MoverError {
    #[error("Target of mover '{label}' is no longer present in the system")]
    TargetMissing { label: String },
    #[error("Mover '{label}' has no pending proposal")]
    NoPendingProposal { label: String },
    #[error("Mover '{label}' already has a pending proposal")]
    ProposalPending { label: String },
    #[error("Mover '{label}' cannot move a rigid member of a rigid body")]
    RigidMember { label: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MoverKind {
    /// Random translation and rotation of one rigid body about its center.
    RigidBody {
        body: RigidBodyId,
        max_translation: f64,
        max_rotation: f64,
    },
    /// One rigid transform applied to a group of rigid bodies and free particles,
    /// rotating about the group centroid. With `axis` set, rotations are restricted to it.
    SuperRigidBody {
        bodies: Vec<RigidBodyId>,
        particles: Vec<ParticleId>,
        max_translation: f64,
        max_rotation: f64,
        axis: Option<Unit<Vector3<f64>>>,
    },
    /// Uniform displacement of one particle within a ball.
    Floppy {
        particle: ParticleId,
        max_translation: f64,
    },
    /// Normal-distributed displacement along the x axis only.
    XCoordinate { particle: ParticleId, max_step: f64 },
    /// Normal step of a nuisance value, clamped into its bounds.
    Nuisance { nuisance: NuisanceId, sigma: f64 },
    /// Uniform perturbation of a weight vector, projected back onto the simplex.
    Weight { weight: WeightId, radius: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoverStats {
    pub proposed: u64,
    pub accepted: u64,
}

impl MoverStats {
    /// `accepted / proposed`, or 0 before the first proposal.
    pub fn acceptance_ratio(&self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            self.accepted as f64 / self.proposed as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct Mover {
    label: String,
    kind: MoverKind,
    stats: MoverStats,
    pending: Option<Snapshot>,
}

impl Mover {
    /// Creates a mover after checking its targets and step parameters against `system`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a target does not exist, a particle mover targets a
    /// rigid member, a group mover is empty, or a step parameter is negative or not finite.
    pub fn new(label: &str, kind: MoverKind, system: &SamplingSystem) -> Result<Self, ConfigError> {
        validate_kind(label, &kind, system)?;
        Ok(Self {
            label: label.to_string(),
            kind,
            stats: MoverStats::default(),
            pending: None,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &MoverKind {
        &self.kind
    }

    pub fn stats(&self) -> MoverStats {
        self.stats
    }

    pub fn acceptance_ratio(&self) -> f64 {
        self.stats.acceptance_ratio()
    }

    pub fn has_pending_proposal(&self) -> bool {
        self.pending.is_some()
    }

    /// Saves the target state, perturbs it in place and counts the proposal.
    pub fn propose(
        &mut self,
        system: &mut SamplingSystem,
        rng: &mut impl Rng,
    ) -> Result<(), MoverError> {
        if self.pending.is_some() {
            return Err(MoverError::ProposalPending {
                label: self.label.clone(),
            });
        }
        let snapshot = perturb(&self.label, &self.kind, system, rng)?;
        self.pending = Some(snapshot);
        self.stats.proposed += 1;
        Ok(())
    }

    pub fn accept(&mut self) -> Result<(), MoverError> {
        self.pending
            .take()
            .ok_or_else(|| MoverError::NoPendingProposal {
                label: self.label.clone(),
            })?;
        self.stats.accepted += 1;
        Ok(())
    }

    /// Restores the state saved by the last [`propose`](Self::propose).
    pub fn reject(&mut self, system: &mut SamplingSystem) -> Result<(), MoverError> {
        let snapshot = self
            .pending
            .take()
            .ok_or_else(|| MoverError::NoPendingProposal {
                label: self.label.clone(),
            })?;
        if snapshot.restore(system) {
            Ok(())
        } else {
            Err(MoverError::TargetMissing {
                label: self.label.clone(),
            })
        }
    }

    /// The scalar step parameter: maximum translation for spatial movers, `max_step`,
    /// `sigma` or `radius` otherwise.
    pub fn step_size(&self) -> f64 {
        match &self.kind {
            MoverKind::RigidBody {
                max_translation, ..
            }
            | MoverKind::SuperRigidBody {
                max_translation, ..
            }
            | MoverKind::Floppy {
                max_translation, ..
            } => *max_translation,
            MoverKind::XCoordinate { max_step, .. } => *max_step,
            MoverKind::Nuisance { sigma, .. } => *sigma,
            MoverKind::Weight { radius, .. } => *radius,
        }
    }

    /// Multiplies the step parameter by `factor`. Rigid movers scale translation and
    /// rotation together; the rotation never exceeds pi.
    pub fn scale_step_size(&mut self, factor: f64) {
        match &mut self.kind {
            MoverKind::RigidBody {
                max_translation,
                max_rotation,
                ..
            }
            | MoverKind::SuperRigidBody {
                max_translation,
                max_rotation,
                ..
            } => {
                *max_translation *= factor;
                *max_rotation = (*max_rotation * factor).min(PI);
            }
            MoverKind::Floppy {
                max_translation, ..
            } => *max_translation *= factor,
            MoverKind::XCoordinate { max_step, .. } => *max_step *= factor,
            MoverKind::Nuisance { sigma, .. } => *sigma *= factor,
            MoverKind::Weight { radius, .. } => *radius *= factor,
        }
    }
}

fn validate_step(label: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidStepSize {
            label: label.to_string(),
            value,
        })
    }
}

fn validate_movable_particle(
    system: &SamplingSystem,
    particle: ParticleId,
) -> Result<(), ConfigError> {
    let p = system
        .particle(particle)
        .ok_or_else(|| ConfigError::TargetNotFound(format!("particle {:?}", particle)))?;
    if p.placement.is_rigid_member() {
        return Err(ConfigError::RigidMemberTarget(p.name.clone()));
    }
    Ok(())
}

fn validate_kind(label: &str, kind: &MoverKind, system: &SamplingSystem) -> Result<(), ConfigError> {
    match kind {
        MoverKind::RigidBody {
            body,
            max_translation,
            max_rotation,
        } => {
            system
                .rigid_body(*body)
                .ok_or_else(|| ConfigError::TargetNotFound(format!("rigid body {:?}", body)))?;
            validate_step(label, *max_translation)?;
            validate_step(label, *max_rotation)
        }
        MoverKind::SuperRigidBody {
            bodies,
            particles,
            max_translation,
            max_rotation,
            axis,
        } => {
            if bodies.is_empty() && particles.is_empty() {
                return Err(ConfigError::EmptyMoverTarget {
                    label: label.to_string(),
                });
            }
            for body in bodies {
                system
                    .rigid_body(*body)
                    .ok_or_else(|| ConfigError::TargetNotFound(format!("rigid body {:?}", body)))?;
            }
            for &id in particles {
                let p = system
                    .particle(id)
                    .ok_or_else(|| ConfigError::TargetNotFound(format!("particle {:?}", id)))?;
                match p.placement {
                    Placement::Free(_) => {}
                    Placement::RigidMember { .. } => {
                        return Err(ConfigError::RigidMemberTarget(p.name.clone()));
                    }
                    Placement::NonRigidMember { .. } => {
                        return Err(ConfigError::InvalidValue {
                            parameter: "particles",
                            reason: format!(
                                "particle '{}' belongs to a rigid body; list the body instead",
                                p.name
                            ),
                        });
                    }
                }
            }
            if let Some(axis) = axis {
                if !axis.iter().all(|c| c.is_finite()) {
                    return Err(ConfigError::InvalidAxis(label.to_string()));
                }
            }
            validate_step(label, *max_translation)?;
            validate_step(label, *max_rotation)
        }
        MoverKind::Floppy {
            particle,
            max_translation,
        } => {
            validate_movable_particle(system, *particle)?;
            validate_step(label, *max_translation)
        }
        MoverKind::XCoordinate { particle, max_step } => {
            validate_movable_particle(system, *particle)?;
            validate_step(label, *max_step)
        }
        MoverKind::Nuisance { nuisance, sigma } => {
            system
                .nuisance(*nuisance)
                .ok_or_else(|| ConfigError::TargetNotFound(format!("nuisance {:?}", nuisance)))?;
            validate_step(label, *sigma)
        }
        MoverKind::Weight { weight, radius } => {
            system
                .weight(*weight)
                .ok_or_else(|| ConfigError::TargetNotFound(format!("weight {:?}", weight)))?;
            validate_step(label, *radius)
        }
    }
}

/// The rigid transform `x -> R (x - center) + center + translation`.
fn transform_about(
    center: &Point3<f64>,
    rotation: UnitQuaternion<f64>,
    translation: Vector3<f64>,
) -> Isometry3<f64> {
    Isometry3::from_parts(Translation3::from(center.coords + translation), rotation)
        * Isometry3::translation(-center.x, -center.y, -center.z)
}

fn displace(label: &str, placement: Placement, step: Vector3<f64>) -> Result<Placement, MoverError> {
    match placement {
        Placement::Free(p) => Ok(Placement::Free(p + step)),
        Placement::NonRigidMember { body, local } => Ok(Placement::NonRigidMember {
            body,
            local: local + step,
        }),
        Placement::RigidMember { .. } => Err(MoverError::RigidMember {
            label: label.to_string(),
        }),
    }
}

fn perturb(
    label: &str,
    kind: &MoverKind,
    system: &mut SamplingSystem,
    rng: &mut impl Rng,
) -> Result<Snapshot, MoverError> {
    let missing = || MoverError::TargetMissing {
        label: label.to_string(),
    };

    match kind {
        MoverKind::RigidBody {
            body,
            max_translation,
            max_rotation,
        } => {
            let rigid_body = system.rigid_body_mut(*body).ok_or_else(missing)?;
            let translation = random_vector_in_ball(*max_translation, rng);
            let rotation = random_rotation(*max_rotation, rng);
            let saved = rigid_body.reference_frame;
            rigid_body.reference_frame =
                transform_about(&rigid_body.center(), rotation, translation) * saved;
            Ok(Snapshot::Group {
                frames: vec![(*body, saved)],
                placements: Vec::new(),
            })
        }
        MoverKind::SuperRigidBody {
            bodies,
            particles,
            max_translation,
            max_rotation,
            axis,
        } => {
            let mut frames = Vec::with_capacity(bodies.len());
            let mut placements = Vec::with_capacity(particles.len());
            let mut points = Vec::with_capacity(bodies.len() + particles.len());
            for &id in bodies {
                let rigid_body = system.rigid_body(id).ok_or_else(missing)?;
                frames.push((id, rigid_body.reference_frame));
                points.push(rigid_body.center());
            }
            for &id in particles {
                let particle = system.particle(id).ok_or_else(missing)?;
                match particle.placement {
                    Placement::Free(p) => points.push(p),
                    _ => return Err(missing()),
                }
                placements.push((id, particle.placement));
            }
            let center = centroid(&points).ok_or_else(missing)?;

            let translation = random_vector_in_ball(*max_translation, rng);
            let rotation = match axis {
                Some(axis) => random_rotation_about(axis, *max_rotation, rng),
                None => random_rotation(*max_rotation, rng),
            };
            let transform = transform_about(&center, rotation, translation);

            for (id, frame) in &frames {
                if let Some(rigid_body) = system.rigid_body_mut(*id) {
                    rigid_body.reference_frame = transform * *frame;
                }
            }
            for (id, placement) in &placements {
                if let (Some(particle), Placement::Free(p)) = (system.particle_mut(*id), placement) {
                    particle.placement = Placement::Free(transform.transform_point(p));
                }
            }
            Ok(Snapshot::Group { frames, placements })
        }
        MoverKind::Floppy {
            particle,
            max_translation,
        } => {
            let target = system.particle_mut(*particle).ok_or_else(missing)?;
            let saved = target.placement;
            target.placement = displace(label, saved, random_vector_in_ball(*max_translation, rng))?;
            Ok(Snapshot::Particle(*particle, saved))
        }
        MoverKind::XCoordinate { particle, max_step } => {
            let target = system.particle_mut(*particle).ok_or_else(missing)?;
            let saved = target.placement;
            let dx = rng.sample::<f64, _>(StandardNormal) * max_step;
            target.placement = displace(label, saved, Vector3::new(dx, 0.0, 0.0))?;
            Ok(Snapshot::Particle(*particle, saved))
        }
        MoverKind::Nuisance { nuisance, sigma } => {
            let target = system.nuisance_mut(*nuisance).ok_or_else(missing)?;
            let saved = target.value;
            target.set_value(saved + rng.sample::<f64, _>(StandardNormal) * sigma);
            Ok(Snapshot::Nuisance(*nuisance, saved))
        }
        MoverKind::Weight { weight, radius } => {
            let target = system.weight_mut(*weight).ok_or_else(missing)?;
            let saved = target.values.clone();
            let perturbed: Vec<f64> = saved
                .iter()
                .map(|v| {
                    if *radius > 0.0 {
                        v + rng.gen_range(-*radius..=*radius)
                    } else {
                        *v
                    }
                })
                .collect();
            target.values = project_onto_simplex(&perturbed);
            Ok(Snapshot::Weight(*weight, saved))
        }
    }
}
