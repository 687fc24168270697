use crate::core::io::model::{ModelFile, MoverDefinition, RestraintDefinition};
use crate::core::models::ids::{NuisanceId, ParticleId, RigidBodyId, WeightId};
use crate::core::models::system::SamplingSystem;
use crate::core::scoring::function::{ScoringFunction, ScoringFunctionBuilder};
use crate::core::scoring::restraints::{
    DistanceRestraint, DistanceToPointRestraint, ExcludedVolume, ExternalBarrier, JeffreysPrior,
};
use crate::engine::config::ConfigError;
use crate::engine::error::EngineError;
use crate::engine::movers::{Mover, MoverKind};
use nalgebra::{Point3, Unit, Vector3};
use std::path::Path;
use tracing::{info, warn};

/// Everything a replica samples: the initial state, how to score it and how to move it.
///
/// Movers are templates: every replica starts from its own clone.
#[derive(Debug, Clone)]
pub struct SamplingModel {
    pub system: SamplingSystem,
    pub scoring: ScoringFunction,
    pub movers: Vec<Mover>,
}

impl SamplingModel {
    pub fn new(system: SamplingSystem, scoring: ScoringFunction, movers: Vec<Mover>) -> Self {
        Self {
            system,
            scoring,
            movers,
        }
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let file = ModelFile::load(path)?;
        Self::from_definition(&file)
    }

    /// Builds the system, then the movers and the scoring function, resolving names.
    pub fn from_definition(file: &ModelFile) -> Result<Self, EngineError> {
        let system = build_system(file)?;
        let movers = build_movers(file, &system)?;
        let scoring = build_scoring(file, &system)?;
        info!(
            particles = system.particle_count(),
            movers = movers.len(),
            terms = scoring.terms().len(),
            "Model assembled."
        );
        Ok(Self::new(system, scoring, movers))
    }
}

fn unknown(kind: &'static str, name: &str) -> EngineError {
    EngineError::UnknownReference {
        kind,
        name: name.to_string(),
    }
}

fn particle(system: &SamplingSystem, name: &str) -> Result<ParticleId, EngineError> {
    system.particle_id(name).ok_or_else(|| unknown("particle", name))
}

fn rigid_body(system: &SamplingSystem, name: &str) -> Result<RigidBodyId, EngineError> {
    system
        .rigid_body_id(name)
        .ok_or_else(|| unknown("rigid body", name))
}

fn nuisance(system: &SamplingSystem, name: &str) -> Result<NuisanceId, EngineError> {
    system.nuisance_id(name).ok_or_else(|| unknown("nuisance", name))
}

fn weight(system: &SamplingSystem, name: &str) -> Result<WeightId, EngineError> {
    system.weight_id(name).ok_or_else(|| unknown("weight", name))
}

/// Resolves a particle list; an empty list selects every particle of the system.
fn particles_or_all(system: &SamplingSystem, names: &[String]) -> Result<Vec<ParticleId>, EngineError> {
    if names.is_empty() {
        Ok(system.particles_iter().map(|(id, _)| id).collect())
    } else {
        names.iter().map(|n| particle(system, n)).collect()
    }
}

fn build_system(file: &ModelFile) -> Result<SamplingSystem, EngineError> {
    let mut system = SamplingSystem::new();
    for p in &file.particles {
        let [x, y, z] = p.coordinates;
        system.add_particle(&p.name, p.radius, Point3::new(x, y, z))?;
    }
    for body in &file.rigid_bodies {
        let members = body
            .members
            .iter()
            .map(|n| particle(&system, n))
            .collect::<Result<Vec<_>, _>>()?;
        let non_rigid = body
            .non_rigid_members
            .iter()
            .map(|n| particle(&system, n))
            .collect::<Result<Vec<_>, _>>()?;
        system.add_rigid_body(&body.name, &members, &non_rigid)?;
    }
    for n in &file.nuisances {
        system.add_nuisance(&n.name, n.value, n.lower, n.upper)?;
    }
    for w in &file.weights {
        system.add_weight(&w.name, w.values.clone())?;
    }
    Ok(system)
}

fn build_movers(file: &ModelFile, system: &SamplingSystem) -> Result<Vec<Mover>, EngineError> {
    let mut movers = Vec::with_capacity(file.movers.len());
    for definition in &file.movers {
        let (label, kind) = match definition {
            MoverDefinition::RigidBody {
                body,
                max_translation,
                max_rotation,
            } => (
                format!("RigidBody_{}", body),
                MoverKind::RigidBody {
                    body: rigid_body(system, body)?,
                    max_translation: *max_translation,
                    max_rotation: *max_rotation,
                },
            ),
            MoverDefinition::SuperRigidBody {
                bodies,
                particles,
                max_translation,
                max_rotation,
                axis,
            } => {
                let label = "SuperRigidBody".to_string();
                let axis = match axis {
                    Some([x, y, z]) => Some(
                        Unit::try_new(Vector3::new(*x, *y, *z), 1e-12)
                            .ok_or_else(|| ConfigError::InvalidAxis(label.clone()))?,
                    ),
                    None => None,
                };
                let kind = MoverKind::SuperRigidBody {
                    bodies: bodies
                        .iter()
                        .map(|b| rigid_body(system, b))
                        .collect::<Result<_, _>>()?,
                    particles: particles
                        .iter()
                        .map(|p| particle(system, p))
                        .collect::<Result<_, _>>()?,
                    max_translation: *max_translation,
                    max_rotation: *max_rotation,
                    axis,
                };
                (label, kind)
            }
            MoverDefinition::Floppy {
                particle: name,
                max_translation,
            } => (
                format!("Floppy_{}", name),
                MoverKind::Floppy {
                    particle: particle(system, name)?,
                    max_translation: *max_translation,
                },
            ),
            MoverDefinition::XCoordinate {
                particle: name,
                max_step,
            } => (
                format!("XCoordinate_{}", name),
                MoverKind::XCoordinate {
                    particle: particle(system, name)?,
                    max_step: *max_step,
                },
            ),
            MoverDefinition::Nuisance {
                nuisance: name,
                sigma,
            } => (
                format!("Nuisances_{}", name),
                MoverKind::Nuisance {
                    nuisance: nuisance(system, name)?,
                    sigma: *sigma,
                },
            ),
            MoverDefinition::Weight {
                weight: name,
                radius,
            } => {
                let id = weight(system, name)?;
                let states = system.weight(id).map_or(0, |w| w.number_of_states());
                if states < 2 {
                    warn!(weight = %name, states, "Skipping weight mover: nothing to sample.");
                    continue;
                }
                (
                    format!("Weights_{}", name),
                    MoverKind::Weight {
                        weight: id,
                        radius: *radius,
                    },
                )
            }
        };
        movers.push(Mover::new(&label, kind, system)?);
    }
    Ok(movers)
}

fn build_scoring(file: &ModelFile, system: &SamplingSystem) -> Result<ScoringFunction, EngineError> {
    let mut builder = ScoringFunctionBuilder::new();
    for definition in &file.restraints {
        builder = match definition {
            RestraintDefinition::Distance {
                name,
                a,
                b,
                min,
                max,
                kappa,
                weight,
            } => builder.weighted_term(
                *weight,
                DistanceRestraint::new(
                    name,
                    particle(system, a)?,
                    particle(system, b)?,
                    *min,
                    *max,
                    *kappa,
                ),
            ),
            RestraintDefinition::DistanceToPoint {
                name,
                particle: target,
                anchor,
                radius,
                kappa,
                weight,
            } => {
                let [x, y, z] = *anchor;
                builder.weighted_term(
                    *weight,
                    DistanceToPointRestraint::new(
                        name,
                        particle(system, target)?,
                        Point3::new(x, y, z),
                        *radius,
                        *kappa,
                    ),
                )
            }
            RestraintDefinition::ExternalBarrier {
                name,
                particles,
                center,
                radius,
                kappa,
                weight,
            } => {
                let [x, y, z] = *center;
                let mut barrier = ExternalBarrier::new(
                    name,
                    particles_or_all(system, particles)?,
                    Point3::new(x, y, z),
                    *radius,
                );
                if let Some(kappa) = kappa {
                    barrier = barrier.with_kappa(*kappa);
                }
                builder.weighted_term(*weight, barrier)
            }
            RestraintDefinition::ExcludedVolume {
                name,
                particles,
                kappa,
                weight,
            } => builder.weighted_term(
                *weight,
                ExcludedVolume::new(name, particles_or_all(system, particles)?, *kappa),
            ),
            RestraintDefinition::JeffreysPrior {
                name,
                nuisance: target,
                weight,
            } => builder.weighted_term(*weight, JeffreysPrior::new(name, nuisance(system, target)?)),
        };
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"
[[particles]]
name = "a"
radius = 1.0
coordinates = [0.0, 0.0, 0.0]

[[particles]]
name = "b"
radius = 1.0
coordinates = [2.0, 0.0, 0.0]

[[particles]]
name = "c"
radius = 1.0
coordinates = [0.0, 4.0, 0.0]

[[rigid-bodies]]
name = "ab"
members = ["a"]
non-rigid-members = ["b"]

[[nuisances]]
name = "sigma"
value = 1.0
lower = 0.1
upper = 5.0

[[weights]]
name = "single"
values = [1.0]

[[weights]]
name = "pair"
values = [0.5, 0.5]

[[movers]]
type = "rigid-body"
body = "ab"
max-translation = 1.0
max-rotation = 0.2

[[movers]]
type = "floppy"
particle = "b"
max-translation = 0.5

[[movers]]
type = "x-coordinate"
particle = "c"
max-step = 0.5

[[movers]]
type = "nuisance"
nuisance = "sigma"
sigma = 0.1

[[movers]]
type = "weight"
weight = "single"
radius = 0.1

[[movers]]
type = "weight"
weight = "pair"
radius = 0.1

[[restraints]]
type = "distance"
name = "ac"
a = "a"
b = "c"
min = 0.0
max = 3.0
kappa = 1.0

[[restraints]]
type = "external-barrier"
name = "box"
center = [0.0, 0.0, 0.0]
radius = 10.0

[[restraints]]
type = "jeffreys-prior"
name = "prior"
nuisance = "sigma"
"#;

    fn parse(content: &str) -> ModelFile {
        ModelFile::parse(content, "inline").unwrap()
    }

    #[test]
    fn builds_system_movers_and_scoring() {
        let model = SamplingModel::from_definition(&parse(MODEL)).unwrap();
        assert_eq!(model.system.particle_count(), 3);
        let labels: Vec<&str> = model.movers.iter().map(|m| m.label()).collect();
        assert_eq!(
            labels,
            vec![
                "RigidBody_ab",
                "Floppy_b",
                "XCoordinate_c",
                "Nuisances_sigma",
                "Weights_pair"
            ]
        );
        assert_eq!(model.scoring.terms().len(), 3);
        // a-c distance 4 against max 3: 0.5; barrier and prior ln(1) are zero.
        assert!((model.scoring.score(&model.system).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn unknown_names_are_reported() {
        let content = MODEL.replace("nuisance = \"sigma\"\nsigma", "nuisance = \"tau\"\nsigma");
        let err = SamplingModel::from_definition(&parse(&content)).unwrap_err();
        match err {
            EngineError::UnknownReference { kind, name } => {
                assert_eq!(kind, "nuisance");
                assert_eq!(name, "tau");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn particle_mover_on_rigid_member_is_rejected() {
        let content = MODEL.replace("particle = \"b\"", "particle = \"a\"");
        let err = SamplingModel::from_definition(&parse(&content)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Config {
                source: ConfigError::RigidMemberTarget(_)
            }
        ));
    }

    #[test]
    fn model_without_restraints_cannot_be_scored() {
        let content = "[[particles]]\nname = \"a\"\nradius = 1.0\ncoordinates = [0.0, 0.0, 0.0]\n";
        let err = SamplingModel::from_definition(&parse(content)).unwrap_err();
        assert!(matches!(err, EngineError::Scoring { .. }));
    }
}
