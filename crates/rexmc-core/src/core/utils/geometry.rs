use nalgebra::{Point3, Unit, UnitQuaternion, Vector3};
use rand::Rng;
use rand_distr::StandardNormal;

/// Draws a direction uniformly from the unit sphere.
pub fn random_unit_vector(rng: &mut impl Rng) -> Unit<Vector3<f64>> {
    loop {
        let v = Vector3::new(
            rng.sample::<f64, _>(StandardNormal),
            rng.sample::<f64, _>(StandardNormal),
            rng.sample::<f64, _>(StandardNormal),
        );
        if let Some(unit) = Unit::try_new(v, 1e-12) {
            return unit;
        }
    }
}

/// Draws a displacement uniformly from the ball of the given radius.
pub fn random_vector_in_ball(radius: f64, rng: &mut impl Rng) -> Vector3<f64> {
    if radius <= 0.0 {
        return Vector3::zeros();
    }
    loop {
        let v = Vector3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );
        if v.norm_squared() <= 1.0 {
            return v * radius;
        }
    }
}

/// Draws a rotation about a uniformly random axis with angle uniform in `[-max_angle, max_angle]`.
pub fn random_rotation(max_angle: f64, rng: &mut impl Rng) -> UnitQuaternion<f64> {
    let axis = random_unit_vector(rng);
    random_rotation_about(&axis, max_angle, rng)
}

/// Draws a rotation about a fixed axis with angle uniform in `[-max_angle, max_angle]`.
pub fn random_rotation_about(
    axis: &Unit<Vector3<f64>>,
    max_angle: f64,
    rng: &mut impl Rng,
) -> UnitQuaternion<f64> {
    if max_angle <= 0.0 {
        return UnitQuaternion::identity();
    }
    let angle = rng.gen_range(-max_angle..=max_angle);
    UnitQuaternion::from_axis_angle(axis, angle)
}

pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}
