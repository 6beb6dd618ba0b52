//! Coastal Geometry
//!
//! Points on the globe and great-circle distances between them, reported in
//! nautical miles because vessel speeds are given in knots.
//!
//! ```text
//! a = sin²(Δφ/2) + cos φ₁ · cos φ₂ · sin²(Δλ/2)
//! d = 2R · atan2(√a, √(1−a))
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod cache;

pub use cache::DistanceCache;

/// Mean earth radius in km (IUGG)
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Kilometres per nautical mile
pub const KM_PER_NM: f64 = 1.852;

/// Mean earth radius in nautical miles
pub const EARTH_RADIUS_NM: f64 = EARTH_RADIUS_KM / KM_PER_NM;

#[derive(Error, Debug, PartialEq)]
pub enum GeoError {
    #[error("Invalid coordinates: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
}

pub type Result<T> = std::result::Result<T, GeoError>;

/// A position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build a point, rejecting non-finite or out-of-range coordinates
    pub fn checked(latitude: f64, longitude: f64) -> Result<Self> {
        let point = Self::new(latitude, longitude);
        if point.is_valid() {
            Ok(point)
        } else {
            Err(GeoError::InvalidCoordinates {
                latitude,
                longitude,
            })
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance to `other` in nautical miles
    pub fn distance_nm(&self, other: &GeoPoint) -> f64 {
        haversine_nm(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Haversine distance between two points in nautical miles
pub fn haversine_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_NM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // Cuxhaven to Helgoland: ~35 nm
        let cuxhaven = GeoPoint::new(53.8683, 8.6946);
        let helgoland = GeoPoint::new(54.1784, 7.8857);
        let dist = cuxhaven.distance_nm(&helgoland);
        assert!((dist - 34.0).abs() < 3.0, "got {dist}");
    }

    #[test]
    fn test_one_degree_of_latitude_is_sixty_nm() {
        let a = GeoPoint::new(54.0, 8.0);
        let b = GeoPoint::new(55.0, 8.0);
        assert!((a.distance_nm(&b) - 60.0).abs() < 0.1);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = GeoPoint::new(54.3233, 10.1228);
        let b = GeoPoint::new(53.5511, 9.9937);
        assert_eq!(a.distance_nm(&b), b.distance_nm(&a));
        assert!(a.distance_nm(&a).abs() < 1e-9);
    }

    #[test]
    fn test_checked_rejects_out_of_range() {
        assert!(GeoPoint::checked(91.0, 0.0).is_err());
        assert!(GeoPoint::checked(0.0, f64::NAN).is_err());
        assert!(GeoPoint::checked(54.0, 8.0).is_ok());
    }
}
