use crate::models::GeoPoint;

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Calculate the Haversine distance between two points in kilometers
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
///
/// Inputs must be finite.
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Distance between two known locations in kilometers
#[inline]
pub fn distance_between(a: &GeoPoint, b: &GeoPoint) -> f64 {
    haversine_distance(a.latitude, a.longitude, b.latitude, b.longitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_distance() {
        // Hanoi to Ho Chi Minh City (approximately 1140 km)
        let distance = haversine_distance(21.0285, 105.8542, 10.8231, 106.6297);
        assert!((distance - 1140.0).abs() < 20.0, "Distance should be ~1140km, got {}", distance);
    }

    #[test]
    fn test_same_point_is_zero() {
        let p = GeoPoint::new(21.0285, 105.8542);
        assert!(distance_between(&p, &p) < 1e-9);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = GeoPoint::new(21.0285, 105.8542);
        let b = GeoPoint::new(21.0050, 105.8430);
        assert!((distance_between(&a, &b) - distance_between(&b, &a)).abs() < 1e-9);
    }
}
