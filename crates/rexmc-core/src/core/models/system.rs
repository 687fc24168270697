use super::ids::{NuisanceId, ParticleId, RigidBodyId, WeightId};
use super::parameters::{Nuisance, Weight};
use super::particle::{Particle, Placement};
use super::rigid_body::RigidBody;
use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use slotmap::SlotMap;
use std::collections::HashMap;
use thiserror::Error;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum SystemError {
    #[error("Particle {0:?} not found in the system")]
    ParticleNotFound(ParticleId),
    #[error("Rigid body {0:?} not found in the system")]
    RigidBodyNotFound(RigidBodyId),
    #[error("Particle '{0}' already belongs to a rigid body")]
    AlreadyMember(String),
    #[error("Rigid body '{0}' must have at least one member")]
    EmptyRigidBody(String),
    #[error("Duplicate name '{0}'")]
    DuplicateName(String),
    #[error("Invalid bounds for nuisance '{name}': value {value} not within [{lower}, {upper}]")]
    InvalidNuisanceBounds {
        name: String,
        value: f64,
        lower: f64,
        upper: f64,
    },
    #[error("Invalid weights for '{0}': values must be non-negative and sum to 1")]
    InvalidWeights(String),
}

/// The sampled configuration: particles, rigid bodies, nuisance parameters and weights.
///
/// Identifiers stay valid across clones, so movers and scoring terms built against one
/// system can be used with every replica's copy of it.
#[derive(Debug, Clone, Default)]
pub struct SamplingSystem {
    particles: SlotMap<ParticleId, Particle>,
    rigid_bodies: SlotMap<RigidBodyId, RigidBody>,
    nuisances: SlotMap<NuisanceId, Nuisance>,
    weights: SlotMap<WeightId, Weight>,
    /// Lookup map for finding particles by name.
    particle_names: HashMap<String, ParticleId>,
    rigid_body_names: HashMap<String, RigidBodyId>,
    nuisance_names: HashMap<String, NuisanceId>,
    weight_names: HashMap<String, WeightId>,
}

impl SamplingSystem {
    /// Creates a new, empty system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a free particle at the given global coordinates.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique particle name.
    /// * `radius` - Particle radius, used by excluded-volume terms.
    /// * `coordinates` - Global coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`SystemError::DuplicateName`] if a particle with this name exists.
    pub fn add_particle(
        &mut self,
        name: &str,
        radius: f64,
        coordinates: Point3<f64>,
    ) -> Result<ParticleId, SystemError> {
        if self.particle_names.contains_key(name) {
            return Err(SystemError::DuplicateName(name.to_string()));
        }
        let id = self
            .particles
            .insert(Particle::new(name, radius, coordinates));
        self.particle_names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Groups free particles into a rigid body.
    ///
    /// The body's reference frame is placed at the centroid of all members with identity
    /// rotation, and each member's coordinates are converted to that local frame.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique rigid body name.
    /// * `rigid_members` - Particles fixed in the body frame.
    /// * `non_rigid_members` - Particles attached to the body whose local coordinates
    ///   may still be sampled.
    ///
    /// # Errors
    ///
    /// Fails if the body would be empty, a member is unknown, or a member already belongs
    /// to another body.
    pub fn add_rigid_body(
        &mut self,
        name: &str,
        rigid_members: &[ParticleId],
        non_rigid_members: &[ParticleId],
    ) -> Result<RigidBodyId, SystemError> {
        if self.rigid_body_names.contains_key(name) {
            return Err(SystemError::DuplicateName(name.to_string()));
        }
        if rigid_members.is_empty() && non_rigid_members.is_empty() {
            return Err(SystemError::EmptyRigidBody(name.to_string()));
        }

        let mut positions = Vec::with_capacity(rigid_members.len() + non_rigid_members.len());
        for &id in rigid_members.iter().chain(non_rigid_members) {
            let particle = self
                .particles
                .get(id)
                .ok_or(SystemError::ParticleNotFound(id))?;
            match particle.placement {
                Placement::Free(p) => positions.push(p),
                _ => return Err(SystemError::AlreadyMember(particle.name.clone())),
            }
        }

        let centroid = positions
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords)
            / positions.len() as f64;
        let frame = Isometry3::from_parts(
            Translation3::from(centroid),
            UnitQuaternion::identity(),
        );

        let members: Vec<ParticleId> = rigid_members
            .iter()
            .chain(non_rigid_members)
            .copied()
            .collect();
        let body_id = self.rigid_bodies.insert(RigidBody {
            name: name.to_string(),
            reference_frame: frame,
            members: members.clone(),
        });

        for (i, &id) in members.iter().enumerate() {
            let local = frame.inverse_transform_point(&positions[i]);
            let placement = if i < rigid_members.len() {
                Placement::RigidMember {
                    body: body_id,
                    local,
                }
            } else {
                Placement::NonRigidMember {
                    body: body_id,
                    local,
                }
            };
            if let Some(particle) = self.particles.get_mut(id) {
                particle.placement = placement;
            }
        }

        self.rigid_body_names.insert(name.to_string(), body_id);
        Ok(body_id)
    }

    /// Adds a bounded scalar parameter.
    ///
    /// # Errors
    ///
    /// Fails if `lower > upper` or `value` lies outside `[lower, upper]`.
    pub fn add_nuisance(
        &mut self,
        name: &str,
        value: f64,
        lower: f64,
        upper: f64,
    ) -> Result<NuisanceId, SystemError> {
        if self.nuisance_names.contains_key(name) {
            return Err(SystemError::DuplicateName(name.to_string()));
        }
        if !(lower <= value && value <= upper) {
            return Err(SystemError::InvalidNuisanceBounds {
                name: name.to_string(),
                value,
                lower,
                upper,
            });
        }
        let id = self.nuisances.insert(Nuisance {
            name: name.to_string(),
            value,
            lower,
            upper,
        });
        self.nuisance_names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Adds a categorical weight vector.
    ///
    /// # Errors
    ///
    /// Fails unless every value is non-negative and the values sum to one.
    pub fn add_weight(&mut self, name: &str, values: Vec<f64>) -> Result<WeightId, SystemError> {
        if self.weight_names.contains_key(name) {
            return Err(SystemError::DuplicateName(name.to_string()));
        }
        let sum: f64 = values.iter().sum();
        if values.is_empty()
            || values.iter().any(|&v| v < 0.0 || !v.is_finite())
            || (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE
        {
            return Err(SystemError::InvalidWeights(name.to_string()));
        }
        let id = self.weights.insert(Weight {
            name: name.to_string(),
            values,
        });
        self.weight_names.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        self.particles.get(id)
    }

    pub fn particle_mut(&mut self, id: ParticleId) -> Option<&mut Particle> {
        self.particles.get_mut(id)
    }

    pub fn particles_iter(&self) -> impl Iterator<Item = (ParticleId, &Particle)> {
        self.particles.iter()
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn rigid_body(&self, id: RigidBodyId) -> Option<&RigidBody> {
        self.rigid_bodies.get(id)
    }

    pub fn rigid_body_mut(&mut self, id: RigidBodyId) -> Option<&mut RigidBody> {
        self.rigid_bodies.get_mut(id)
    }

    pub fn nuisance(&self, id: NuisanceId) -> Option<&Nuisance> {
        self.nuisances.get(id)
    }

    pub fn nuisance_mut(&mut self, id: NuisanceId) -> Option<&mut Nuisance> {
        self.nuisances.get_mut(id)
    }

    pub fn weight(&self, id: WeightId) -> Option<&Weight> {
        self.weights.get(id)
    }

    pub fn weight_mut(&mut self, id: WeightId) -> Option<&mut Weight> {
        self.weights.get_mut(id)
    }

    pub fn particle_id(&self, name: &str) -> Option<ParticleId> {
        self.particle_names.get(name).copied()
    }

    pub fn rigid_body_id(&self, name: &str) -> Option<RigidBodyId> {
        self.rigid_body_names.get(name).copied()
    }

    pub fn nuisance_id(&self, name: &str) -> Option<NuisanceId> {
        self.nuisance_names.get(name).copied()
    }

    pub fn weight_id(&self, name: &str) -> Option<WeightId> {
        self.weight_names.get(name).copied()
    }

    /// Computes the global coordinates of a particle.
    ///
    /// # Return
    ///
    /// Returns `None` if the particle, or the rigid body it belongs to, does not exist.
    pub fn position(&self, id: ParticleId) -> Option<Point3<f64>> {
        let particle = self.particles.get(id)?;
        match particle.placement {
            Placement::Free(p) => Some(p),
            Placement::RigidMember { body, local } | Placement::NonRigidMember { body, local } => {
                self.rigid_bodies.get(body).map(|b| b.to_global(&local))
            }
        }
    }
}
