pub mod units;

pub use units::*;

use glam::{DQuat, DVec3};

pub const PI: f64 = std::f64::consts::PI;
pub const TAU: f64 = std::f64::consts::TAU;

/// Vector operations specific to orbital geometry, provided as an
/// extension on `glam::DVec3`.
pub trait OrbitalMath {
    /// Unit vector, or the zero vector when the input has (near-)zero
    /// length. Degenerate inputs are a defined edge case here, not a crash.
    fn unit_or_zero(&self) -> DVec3;

    /// Rotate about an arbitrary axis by `angle` radians (right-hand rule).
    fn rotated_about(&self, axis: DVec3, angle: f64) -> DVec3;

    /// Signed angle from `reference` to `self`, measured around `axis`.
    /// Counterclockwise (right-handed about `axis`) is positive.
    /// Result is in (-π, π].
    fn signed_angle_from(&self, reference: DVec3, axis: DVec3) -> f64;
}

impl OrbitalMath for DVec3 {
    fn unit_or_zero(&self) -> DVec3 {
        let length_sq = self.length_squared();
        if length_sq < f64::EPSILON {
            DVec3::ZERO
        } else {
            *self / length_sq.sqrt()
        }
    }

    fn rotated_about(&self, axis: DVec3, angle: f64) -> DVec3 {
        let axis = axis.unit_or_zero();
        if axis == DVec3::ZERO {
            return *self;
        }
        DQuat::from_axis_angle(axis, angle) * *self
    }

    fn signed_angle_from(&self, reference: DVec3, axis: DVec3) -> f64 {
        let a = reference.unit_or_zero();
        let b = self.unit_or_zero();
        if a == DVec3::ZERO || b == DVec3::ZERO {
            return 0.0;
        }
        let unsigned = a.dot(b).clamp(-1.0, 1.0).acos();
        if axis.dot(a.cross(b)) < 0.0 {
            -unsigned
        } else {
            unsigned
        }
    }
}

/// Gravitational acceleration exerted by a body of `mass` kilograms at
/// `displacement` kilometers away, in km/s². Near-zero separation
/// contributes nothing rather than blowing up.
pub fn gravitational_acceleration(mass: f64, displacement: DVec3) -> DVec3 {
    let distance_squared = displacement.length_squared();
    if distance_squared < MIN_SEPARATION_KM * MIN_SEPARATION_KM {
        return DVec3::ZERO;
    }

    let distance = distance_squared.sqrt();
    let magnitude = GRAVITATIONAL_CONSTANT_KM * mass / (distance_squared * distance);
    displacement * magnitude
}
