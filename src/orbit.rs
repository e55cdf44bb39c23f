//! Keplerian orbital elements derived from instantaneous state vectors,
//! plus the forward (element → position) problem used for path rendering.

use glam::{DVec2, DVec3};

use crate::math::{GRAVITATIONAL_CONSTANT, KM_TO_METERS, OrbitalMath, TAU, meters_to_km};

/// Full element refresh happens once every this many `update` calls; the
/// fast-moving anomalies are refreshed on every call.
const ELEMENT_REFRESH_INTERVAL: u64 = 10;

/// Below this eccentricity the periapsis direction is undefined; the
/// current position direction is used as an arbitrary but stable choice.
const ECCENTRICITY_EPSILON: f64 = 1e-9;

const INCLINATION_EPSILON: f64 = 1e-9;

/// Osculating orbit of a body about its gravitational host.
///
/// Element math runs in SI meters; the ellipse sampling functions return
/// kilometers so their output composes directly with tree state.
///
/// Known limitation: near-radial orbits (near-zero angular momentum) have
/// an unstable orbital axis and are not specially handled.
#[derive(Debug, Clone, PartialEq)]
pub struct Orbit {
    /// Gravitational parameter μ = G·(m + M) in m³/s²
    mu: f64,

    /// Semi-major axis of this body's ellipse about the system barycenter,
    /// in meters (the two-body axis scaled by the host mass fraction)
    pub semi_major_axis: f64,

    /// Eccentricity (dimensionless)
    pub eccentricity: f64,

    /// Orbit normal (unit angular momentum direction)
    pub axis: DVec3,

    /// Unit vector from focus toward periapsis
    pub periapsis_direction: DVec3,

    /// Inclination against the reference plane (radians)
    pub inclination: f64,

    /// Longitude of the ascending node (radians)
    pub longitude_of_ascending_node: f64,

    /// Longitude of periapsis (radians)
    pub longitude_of_periapsis: f64,

    /// Orbital period from Kepler's third law (seconds)
    pub period: f64,

    /// Signed angle of the current position from periapsis, about the
    /// orbit axis, measured at the focus (radians)
    pub true_anomaly: f64,

    /// Same angle measured at the ellipse center rather than the focus;
    /// rendering draws the ellipse in its own centered frame
    pub central_anomaly: f64,

    update_count: u64,
}

impl Orbit {
    /// Derive an orbit from a host-relative state. `position` in km,
    /// `velocity` in km/s, masses in kg.
    ///
    /// Returns `None` when the host mass is not positive or the bodies are
    /// coincident; no meaningful orbit exists in either case.
    pub fn from_state(position: DVec3, velocity: DVec3, mass: f64, host_mass: f64) -> Option<Self> {
        if host_mass <= 0.0 {
            return None;
        }

        let r = position * KM_TO_METERS;
        let v = velocity * KM_TO_METERS;
        if r.length_squared() < f64::EPSILON {
            return None;
        }

        let mu = GRAVITATIONAL_CONSTANT * (mass + host_mass);
        let mut orbit = Self {
            mu,
            semi_major_axis: 0.0,
            eccentricity: 0.0,
            axis: DVec3::Z,
            periapsis_direction: DVec3::X,
            inclination: 0.0,
            longitude_of_ascending_node: 0.0,
            longitude_of_periapsis: 0.0,
            period: 0.0,
            true_anomaly: 0.0,
            central_anomaly: 0.0,
            update_count: 0,
        };
        orbit.recompute_elements(r, v, mass, host_mass);
        orbit.recompute_anomalies(r);
        Some(orbit)
    }

    /// Per-tick refresh. Anomalies are recomputed every call from the
    /// current relative position; the full element set only every
    /// [`ELEMENT_REFRESH_INTERVAL`]th call, since elements drift slowly
    /// relative to the true anomaly.
    pub fn update(&mut self, position: DVec3, velocity: DVec3, mass: f64, host_mass: f64) {
        self.update_count += 1;

        let r = position * KM_TO_METERS;
        if self.update_count % ELEMENT_REFRESH_INTERVAL == 0 {
            let v = velocity * KM_TO_METERS;
            if host_mass > 0.0 && r.length_squared() >= f64::EPSILON {
                self.recompute_elements(r, v, mass, host_mass);
            }
        }
        self.recompute_anomalies(r);
    }

    fn recompute_elements(&mut self, r: DVec3, v: DVec3, mass: f64, host_mass: f64) {
        let mu = GRAVITATIONAL_CONSTANT * (mass + host_mass);
        self.mu = mu;

        let r_len = r.length();
        let v_sq = v.length_squared();

        // Vis-viva: 1/a = 2/r - v²/μ. The relative-orbit axis drives the
        // period; the barycentric fraction drives this body's own ellipse.
        let a_relative = 1.0 / (2.0 / r_len - v_sq / mu);
        self.semi_major_axis = a_relative * host_mass / (mass + host_mass);

        let axis = r.cross(v).unit_or_zero();
        // Near-radial orbit: retain the previous axis rather than flipping
        if axis != DVec3::ZERO {
            self.axis = axis;
        }
        self.inclination = self.axis.z.clamp(-1.0, 1.0).acos();

        let e_vec = r * (v_sq / mu - 1.0 / r_len) - v * (r.dot(v) / mu);
        self.eccentricity = e_vec.length();
        self.periapsis_direction = if self.eccentricity > ECCENTRICITY_EPSILON {
            e_vec / self.eccentricity
        } else {
            // Circular: undefined periapsis, arbitrary stable choice
            r.unit_or_zero()
        };

        self.longitude_of_ascending_node = if self.inclination > INCLINATION_EPSILON {
            f64::atan2(self.axis.x, -self.axis.y)
        } else {
            0.0
        };

        // Rotate the periapsis direction down into the reference plane
        // about the node line, then take its in-plane angle.
        let node_line = DVec3::Z.cross(self.axis).unit_or_zero();
        let flat = if node_line == DVec3::ZERO {
            self.periapsis_direction
        } else {
            self.periapsis_direction
                .rotated_about(node_line, -self.inclination)
        };
        self.longitude_of_periapsis = f64::atan2(flat.y, flat.x);

        self.period = if a_relative > 0.0 {
            TAU * (a_relative.powi(3) / mu).sqrt()
        } else {
            // Unbound trajectory
            0.0
        };
    }

    fn recompute_anomalies(&mut self, r: DVec3) {
        self.true_anomaly = r.signed_angle_from(self.periapsis_direction, self.axis);

        // Offset by the center-to-focus distance a·e to measure from the
        // ellipse center instead of the focus.
        let from_center = r + self.periapsis_direction * (self.semi_major_axis * self.eccentricity);
        self.central_anomaly = from_center.signed_angle_from(self.periapsis_direction, self.axis);
    }

    /// Semi-minor axis b = a·√(1−e²), in meters.
    pub fn semi_minor_axis(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.eccentricity * self.eccentricity).max(0.0).sqrt()
    }

    /// Parametric position on the ellipse in its local, center-referenced
    /// 2D frame: `(a·cos θ, b·sin θ)`, in kilometers.
    pub fn ellipse_position(&self, theta: f64) -> DVec2 {
        DVec2::new(
            meters_to_km(self.semi_major_axis * theta.cos()),
            meters_to_km(self.semi_minor_axis() * theta.sin()),
        )
    }

    /// Focus-referenced position for true anomaly `theta`, in kilometers,
    /// oriented in 3D: `r = a(1−e²)/(1+e·cos θ)` along the periapsis
    /// direction rotated by `theta` about the orbit axis.
    pub fn ellipse_position_3d(&self, theta: f64) -> DVec3 {
        let e = self.eccentricity;
        let radius = self.semi_major_axis * (1.0 - e * e) / (1.0 + e * theta.cos());
        let direction = self.periapsis_direction.rotated_about(self.axis, theta);
        direction * meters_to_km(radius)
    }
}
