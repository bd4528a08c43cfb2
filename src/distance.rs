//! Coordinates and great-circle distance.

use geo::Point;
use serde::Serialize;

use crate::error::CoordinateError;

/// Mean Earth radius used by the search heuristic.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A validated WGS-84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    /// Builds a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinateError::OutOfRange { lat, lon });
        }
        Ok(Self { lat, lon })
    }

    /// `geo` points are (x = lon, y = lat).
    pub fn to_point(self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    /// GeoJSON position order.
    pub fn to_position(self) -> Vec<f64> {
        vec![self.lon, self.lat]
    }
}

impl From<LatLon> for Point<f64> {
    fn from(value: LatLon) -> Self {
        value.to_point()
    }
}

/// Haversine distance in kilometres between two points.
pub fn haversine_km(a: impl Into<Point<f64>>, b: impl Into<Point<f64>>) -> f64 {
    let (a, b) = (a.into(), b.into());
    let (lat1, lon1) = (a.y().to_radians(), a.x().to_radians());
    let (lat2, lon2) = (b.y().to_radians(), b.x().to_radians());

    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_is_zero() {
        let p = LatLon::new(28.6139, 77.2090).unwrap();
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn one_degree_of_latitude() {
        let a = LatLon::new(0.0, 0.0).unwrap();
        let b = LatLon::new(1.0, 0.0).unwrap();
        let expected = EARTH_RADIUS_KM * 1f64.to_radians();
        assert!((haversine_km(a, b) - expected).abs() < 1e-9);
    }

    #[test]
    fn symmetric() {
        let delhi = LatLon::new(28.6139, 77.2090).unwrap();
        let mumbai = LatLon::new(19.0760, 72.8777).unwrap();
        let d = haversine_km(delhi, mumbai);
        assert!((d - haversine_km(mumbai, delhi)).abs() < 1e-9);
        // ~1150 km by great circle
        assert!((1100.0..1200.0).contains(&d), "got {d}");
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(LatLon::new(91.0, 0.0).is_err());
        assert!(LatLon::new(0.0, -180.5).is_err());
        assert!(LatLon::new(f64::NAN, 0.0).is_err());
        assert!(LatLon::new(-90.0, 180.0).is_ok());
    }
}
