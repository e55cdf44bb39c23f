//! Physical constants and unit conversions for the orbital engine.
//!
//! Tree state (positions, velocities) is kept in kilometers and km/s;
//! Keplerian element math runs in SI meters. Both flavors of G live here.

/// Gravitational constant in SI units (m³ kg⁻¹ s⁻²)
pub const GRAVITATIONAL_CONSTANT: f64 = 6.67408e-11;

/// Gravitational constant in km³ kg⁻¹ s⁻²
pub const GRAVITATIONAL_CONSTANT_KM: f64 = 6.67408e-20;

/// Separation below which gravitational contributions are dropped (km)
pub const MIN_SEPARATION_KM: f64 = 1.0e-6;

/// One Astronomical Unit in kilometers
pub const AU_TO_KM: f64 = 149_597_870.691;

/// Conversion from kilometers to meters
pub const KM_TO_METERS: f64 = 1000.0;

/// Solar mass in kilograms
pub const SOLAR_MASS: f64 = 1.989e30;

/// Earth mass in kilograms
pub const EARTH_MASS: f64 = 5.972e24;

/// Earth mean radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Seconds per day
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// Seconds per Julian year
pub const SECONDS_PER_YEAR: f64 = 31_557_600.0;

/// Seconds per Julian century (36525 days)
pub const SECONDS_PER_CENTURY: f64 = 3_155_760_000.0;

pub fn km_to_meters(km: f64) -> f64 {
    km * KM_TO_METERS
}

pub fn meters_to_km(meters: f64) -> f64 {
    meters / KM_TO_METERS
}

pub fn au_to_km(au: f64) -> f64 {
    au * AU_TO_KM
}

/// Conversion utilities for time scales
pub mod time {
    use super::*;

    /// Seconds since J2000 to Julian days since J2000
    pub fn seconds_to_days(seconds: f64) -> f64 {
        seconds / SECONDS_PER_DAY
    }

    pub fn days_to_seconds(days: f64) -> f64 {
        days * SECONDS_PER_DAY
    }

    /// Seconds since J2000 to Julian centuries since J2000
    pub fn seconds_to_centuries(seconds: f64) -> f64 {
        seconds / SECONDS_PER_CENTURY
    }

    pub fn seconds_to_years(seconds: f64) -> f64 {
        seconds / SECONDS_PER_YEAR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_conversions() {
        assert_eq!(km_to_meters(1.0), 1000.0);
        assert_eq!(meters_to_km(1000.0), 1.0);
        assert!((au_to_km(1.0) - 1.495978e8).abs() < 1e3);
    }

    #[test]
    fn test_time_conversions() {
        assert_eq!(time::seconds_to_days(SECONDS_PER_DAY), 1.0);
        assert!((time::seconds_to_centuries(SECONDS_PER_CENTURY) - 1.0).abs() < 1e-12);
        assert!((time::seconds_to_years(SECONDS_PER_YEAR) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_gravitational_constants_agree() {
        // G in km³ is the SI value scaled by (1e-3 km/m)³
        assert!((GRAVITATIONAL_CONSTANT_KM - GRAVITATIONAL_CONSTANT * 1e-9).abs() < 1e-30);
    }
}
