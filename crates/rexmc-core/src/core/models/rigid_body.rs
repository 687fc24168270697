use super::ids::ParticleId;
use nalgebra::{Isometry3, Point3};

#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    pub name: String,
    /// Maps body-local coordinates to global coordinates. The origin of the frame is the
    /// centroid of the members at construction time and is the center of rotation.
    pub reference_frame: Isometry3<f64>,
    pub members: Vec<ParticleId>,
}

impl RigidBody {
    pub fn center(&self) -> Point3<f64> {
        Point3::from(self.reference_frame.translation.vector)
    }

    pub fn to_global(&self, local: &Point3<f64>) -> Point3<f64> {
        self.reference_frame.transform_point(local)
    }

    pub fn to_local(&self, global: &Point3<f64>) -> Point3<f64> {
        self.reference_frame.inverse_transform_point(global)
    }
}
