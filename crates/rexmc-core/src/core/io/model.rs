use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelFileError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ParticleDefinition {
    pub name: String,
    pub radius: f64,
    pub coordinates: [f64; 3],
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RigidBodyDefinition {
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub non_rigid_members: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct NuisanceDefinition {
    pub name: String,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct WeightDefinition {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", tag = "type", deny_unknown_fields)]
pub enum MoverDefinition {
    #[serde(rename_all = "kebab-case")]
    RigidBody {
        body: String,
        max_translation: f64,
        max_rotation: f64,
    },
    #[serde(rename_all = "kebab-case")]
    SuperRigidBody {
        #[serde(default)]
        bodies: Vec<String>,
        #[serde(default)]
        particles: Vec<String>,
        max_translation: f64,
        max_rotation: f64,
        axis: Option<[f64; 3]>,
    },
    #[serde(rename_all = "kebab-case")]
    Floppy {
        particle: String,
        max_translation: f64,
    },
    #[serde(rename_all = "kebab-case")]
    XCoordinate { particle: String, max_step: f64 },
    Nuisance { nuisance: String, sigma: f64 },
    Weight { weight: String, radius: f64 },
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", tag = "type", deny_unknown_fields)]
pub enum RestraintDefinition {
    #[serde(rename_all = "kebab-case")]
    Distance {
        name: String,
        a: String,
        b: String,
        min: f64,
        max: f64,
        kappa: f64,
        #[serde(default = "default_weight")]
        weight: f64,
    },
    #[serde(rename_all = "kebab-case")]
    DistanceToPoint {
        name: String,
        particle: String,
        anchor: [f64; 3],
        radius: f64,
        kappa: f64,
        #[serde(default = "default_weight")]
        weight: f64,
    },
    #[serde(rename_all = "kebab-case")]
    ExternalBarrier {
        name: String,
        /// Empty means every particle in the model.
        #[serde(default)]
        particles: Vec<String>,
        center: [f64; 3],
        radius: f64,
        kappa: Option<f64>,
        #[serde(default = "default_weight")]
        weight: f64,
    },
    #[serde(rename_all = "kebab-case")]
    ExcludedVolume {
        name: String,
        /// Empty means every particle in the model.
        #[serde(default)]
        particles: Vec<String>,
        kappa: f64,
        #[serde(default = "default_weight")]
        weight: f64,
    },
    #[serde(rename_all = "kebab-case")]
    JeffreysPrior {
        name: String,
        nuisance: String,
        #[serde(default = "default_weight")]
        weight: f64,
    },
}

/// Declarative description of a model: its state, its movers and its scoring terms.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ModelFile {
    #[serde(default)]
    pub particles: Vec<ParticleDefinition>,
    #[serde(default)]
    pub rigid_bodies: Vec<RigidBodyDefinition>,
    #[serde(default)]
    pub nuisances: Vec<NuisanceDefinition>,
    #[serde(default)]
    pub weights: Vec<WeightDefinition>,
    #[serde(default)]
    pub movers: Vec<MoverDefinition>,
    #[serde(default)]
    pub restraints: Vec<RestraintDefinition>,
}

impl ModelFile {
    pub fn load(path: &Path) -> Result<Self, ModelFileError> {
        let content = std::fs::read_to_string(path).map_err(|e| ModelFileError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::parse(&content, &path.to_string_lossy())
    }

    pub fn parse(content: &str, origin: &str) -> Result<Self, ModelFileError> {
        toml::from_str(content).map_err(|e| ModelFileError::Toml {
            path: origin.to_string(),
            source: e,
        })
    }
}
