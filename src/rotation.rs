//! Body spin state extrapolated from reference-epoch rotation constants
//! (IAU-style pole right ascension/declination and prime-meridian angle).

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::math::{TAU, time};

/// Reference-epoch (J2000) rotation constants, angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationParams {
    /// Pole right ascension at epoch (deg)
    pub pole_ra: f64,
    /// Pole right ascension drift (deg per Julian century)
    #[serde(default)]
    pub pole_ra_rate: f64,
    /// Pole declination at epoch (deg)
    pub pole_dec: f64,
    /// Pole declination drift (deg per Julian century)
    #[serde(default)]
    pub pole_dec_rate: f64,
    /// Prime-meridian angle at epoch (deg)
    #[serde(default)]
    pub spin_angle: f64,
    /// Spin rate (deg per day; 0 means unknown/no rotation)
    pub spin_rate: f64,
}

/// Current rotational orientation of a body: pole axis plus the spin angle
/// about it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    params: RotationParams,

    /// Current pole direction (unit vector)
    pub pole: DVec3,

    /// Current spin angle about the pole, normalized to [0, 2π)
    pub angle: f64,
}

impl Rotation {
    /// Returns `None` when no spin rate is configured. The body's
    /// rotation is unknown and consumers should not draw one.
    pub fn new(params: RotationParams) -> Option<Self> {
        if params.spin_rate == 0.0 {
            return None;
        }

        let mut rotation = Self {
            params,
            pole: DVec3::Z,
            angle: 0.0,
        };
        rotation.update(0.0);
        Some(rotation)
    }

    /// Linearly extrapolate pole and spin angle to `timestamp` seconds
    /// since the J2000 epoch (negative timestamps extrapolate backward).
    pub fn update(&mut self, timestamp: f64) {
        let centuries = time::seconds_to_centuries(timestamp);
        let days = time::seconds_to_days(timestamp);

        let ra = (self.params.pole_ra + self.params.pole_ra_rate * centuries).to_radians();
        let dec = (self.params.pole_dec + self.params.pole_dec_rate * centuries).to_radians();
        self.pole = DVec3::new(
            dec.cos() * ra.cos(),
            dec.cos() * ra.sin(),
            dec.sin(),
        );

        let angle = (self.params.spin_angle + self.params.spin_rate * days).to_radians();
        self.angle = angle.rem_euclid(TAU);
    }
}
