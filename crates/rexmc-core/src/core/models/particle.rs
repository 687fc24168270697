use super::ids::RigidBodyId;
use nalgebra::Point3;

/// Where a particle's coordinates live.
///
/// Free particles store global coordinates. Members of a rigid body store coordinates
/// in the body's local frame; their global position follows the body's reference frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Free(Point3<f64>),
    /// Fixed in the body frame; only the body itself may move it.
    RigidMember {
        body: RigidBodyId,
        local: Point3<f64>,
    },
    /// Attached to a body but with optimizable local coordinates.
    NonRigidMember {
        body: RigidBodyId,
        local: Point3<f64>,
    },
}

impl Placement {
    pub fn body(&self) -> Option<RigidBodyId> {
        match self {
            Placement::Free(_) => None,
            Placement::RigidMember { body, .. } | Placement::NonRigidMember { body, .. } => {
                Some(*body)
            }
        }
    }

    pub fn is_rigid_member(&self) -> bool {
        matches!(self, Placement::RigidMember { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub name: String,
    pub radius: f64,
    pub placement: Placement,
}

impl Particle {
    pub fn new(name: &str, radius: f64, coordinates: Point3<f64>) -> Self {
        Self {
            name: name.to_string(),
            radius,
            placement: Placement::Free(coordinates),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn new_particle_is_free() {
        let p = Particle::new("A1", 2.0, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(p.placement, Placement::Free(Point3::new(1.0, 2.0, 3.0)));
        assert!(p.placement.body().is_none());
        assert!(!p.placement.is_rigid_member());
    }

    #[test]
    fn member_placements_report_their_body() {
        let mut bodies: SlotMap<RigidBodyId, ()> = SlotMap::with_key();
        let body = bodies.insert(());
        let rigid = Placement::RigidMember {
            body,
            local: Point3::origin(),
        };
        let non_rigid = Placement::NonRigidMember {
            body,
            local: Point3::origin(),
        };
        assert_eq!(rigid.body(), Some(body));
        assert_eq!(non_rigid.body(), Some(body));
        assert!(rigid.is_rigid_member());
        assert!(!non_rigid.is_rigid_member());
    }
}
