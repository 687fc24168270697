use crate::core::models::ids::{NuisanceId, ParticleId, RigidBodyId, WeightId};
use crate::core::models::particle::Placement;
use crate::core::models::system::SamplingSystem;
use nalgebra::Isometry3;

/// The exact pre-proposal state of everything a mover is about to touch.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Snapshot {
    Group {
        frames: Vec<(RigidBodyId, Isometry3<f64>)>,
        placements: Vec<(ParticleId, Placement)>,
    },
    Particle(ParticleId, Placement),
    Nuisance(NuisanceId, f64),
    Weight(WeightId, Vec<f64>),
}

impl Snapshot {
    /// Writes the saved state back. Returns `false` if a target has vanished.
    pub(crate) fn restore(self, system: &mut SamplingSystem) -> bool {
        match self {
            Snapshot::Group { frames, placements } => {
                for (id, frame) in frames {
                    match system.rigid_body_mut(id) {
                        Some(body) => body.reference_frame = frame,
                        None => return false,
                    }
                }
                for (id, placement) in placements {
                    match system.particle_mut(id) {
                        Some(particle) => particle.placement = placement,
                        None => return false,
                    }
                }
                true
            }
            Snapshot::Particle(id, placement) => match system.particle_mut(id) {
                Some(particle) => {
                    particle.placement = placement;
                    true
                }
                None => false,
            },
            // Direct assignment: the saved value was already within bounds.
            Snapshot::Nuisance(id, value) => match system.nuisance_mut(id) {
                Some(nuisance) => {
                    nuisance.value = value;
                    true
                }
                None => false,
            },
            Snapshot::Weight(id, values) => match system.weight_mut(id) {
                Some(weight) => {
                    weight.values = values;
                    true
                }
                None => false,
            },
        }
    }
}
