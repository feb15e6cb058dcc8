/// Compute the fare for a ride of the given distance
/// `fare = base_fee + distance_km * per_km_rate`
pub fn compute_fare(base_fee: f64, per_km_rate: f64, distance_km: f64) -> f64 {
    base_fee + distance_km * per_km_rate
}

/// Check that a rider-supplied distance is usable for fare computation
pub fn is_valid_distance(distance_km: f64) -> bool {
    distance_km.is_finite() && distance_km >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fare_five_km() {
        // 50 base fee + 10 per km
        assert_eq!(compute_fare(50.0, 10.0, 5.0), 100.0);
    }

    #[test]
    fn test_fare_zero_distance_is_base_fee() {
        assert_eq!(compute_fare(50.0, 10.0, 0.0), 50.0);
    }

    #[test]
    fn test_distance_validation() {
        assert!(is_valid_distance(0.0));
        assert!(is_valid_distance(12.3));

        assert!(!is_valid_distance(-1.0));
        assert!(!is_valid_distance(f64::NAN));
        assert!(!is_valid_distance(f64::INFINITY));
    }
}
