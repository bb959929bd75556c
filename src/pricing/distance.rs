use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::decimal::Distance;
use crate::types::Coordinates;

/// mean earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// great-circle distance in kilometres, unrounded
pub fn haversine_km(from: Coordinates, to: Coordinates, radius_km: f64) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    radius_km * c
}

/// haversine distance on the standard earth radius, rounded to 2 decimals
pub fn compute_distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Distance {
    distance_with_radius(
        Coordinates::new(lat1, lon1),
        Coordinates::new(lat2, lon2),
        EARTH_RADIUS_KM,
    )
}

pub(crate) fn distance_with_radius(from: Coordinates, to: Coordinates, radius_km: f64) -> Distance {
    let km = haversine_km(from, to, radius_km);
    // non-finite only for out-of-domain input
    Decimal::from_f64(km)
        .map(Distance::from_km)
        .unwrap_or(Distance::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_zero_for_identical_points() {
        let d = compute_distance_km(4.6097, -74.0817, 4.6097, -74.0817);
        assert_eq!(d, Distance::ZERO);
    }

    #[test]
    fn test_symmetry() {
        let points = [
            (4.6097, -74.0817, 4.7110, -74.0721),
            (6.2442, -75.5812, 3.4516, -76.5320),
            (-33.8688, 151.2093, 51.5074, -0.1278),
        ];

        for (lat1, lon1, lat2, lon2) in points {
            assert_eq!(
                compute_distance_km(lat1, lon1, lat2, lon2),
                compute_distance_km(lat2, lon2, lat1, lon1)
            );
        }
    }

    #[test]
    fn test_one_degree_of_latitude() {
        // pi * 6371 / 180
        let d = compute_distance_km(0.0, 0.0, 1.0, 0.0);
        assert_eq!(d.km(), dec!(111.19));
    }

    #[test]
    fn test_rounded_to_two_decimals() {
        let d = compute_distance_km(4.6097, -74.0817, 4.7110, -74.0721);
        assert!(d.km().scale() <= 2);
        assert!(d.km() > dec!(11) && d.km() < dec!(12));
    }
}
