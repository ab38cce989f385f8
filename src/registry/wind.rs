//! # Wind Aggregation
//!
//! Combines the direction readings of all active wind beacons into a single
//! heading. Angles are averaged as unit vectors: the arithmetic mean of
//! 350° and 10° is 180°, the circular mean is 0°.

use super::DeviceRegistry;
use crate::radio::protocol::BeaconPayload;

/// Resultant vector length below which the readings cancel out
const MIN_RESULTANT: f64 = 1e-9;

/// Circular mean of a set of headings in degrees
///
/// Non-finite headings (NaN, infinities) are skipped.
///
/// # Returns
///
/// * `Option<f64>` - Mean heading in `[0, 360)`, or `None` when there are no
///   headings or they cancel each other out (e.g. 0° and 180°)
///
/// # Examples
///
/// ```
/// use sailing_basestation::registry::wind::circular_mean_heading;
///
/// let mean = circular_mean_heading([80.0, 100.0]).unwrap();
/// assert!((mean - 90.0).abs() < 1e-9);
/// assert!(circular_mean_heading(std::iter::empty()).is_none());
/// ```
pub fn circular_mean_heading<I>(headings: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (mut sin_sum, mut cos_sum, mut count) = (0.0f64, 0.0f64, 0usize);
    for heading in headings.into_iter().filter(|h| h.is_finite()) {
        let rad = heading.to_radians();
        sin_sum += rad.sin();
        cos_sum += rad.cos();
        count += 1;
    }

    if count == 0 {
        return None;
    }

    let sin_mean = sin_sum / count as f64;
    let cos_mean = cos_sum / count as f64;
    if sin_mean.hypot(cos_mean) < MIN_RESULTANT {
        return None;
    }

    let degrees = sin_mean.atan2(cos_mean).to_degrees().rem_euclid(360.0);
    // rem_euclid can round a tiny negative angle up to exactly 360.0
    Some(if degrees >= 360.0 { 0.0 } else { degrees })
}

/// Mean wind direction over beacons heard within `timeout_ms`
///
/// Beacons without a direction vane (legacy firmware) are ignored.
pub fn active_wind_direction(
    beacons: &DeviceRegistry<BeaconPayload>,
    now_ms: u64,
    timeout_ms: u64,
) -> Option<f64> {
    circular_mean_heading(
        beacons
            .iter()
            .filter(|entry| !entry.is_expired(now_ms, timeout_ms))
            .filter_map(|entry| entry.payload.wind_direction)
            .map(f64::from),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Angular distance in degrees, accounting for wrap
    fn angular_distance(a: f64, b: f64) -> f64 {
        let d = (a - b).rem_euclid(360.0);
        d.min(360.0 - d)
    }

    fn beacon(direction: Option<f32>) -> BeaconPayload {
        BeaconPayload {
            name: "ANEMO".to_string(),
            wind_speed: 5.0,
            wind_direction: direction,
        }
    }

    #[test]
    fn test_mean_across_north() {
        let mean = circular_mean_heading([350.0, 10.0]).unwrap();
        assert!(angular_distance(mean, 0.0) < 1e-6, "got {}", mean);
        assert!((0.0..360.0).contains(&mean));
    }

    #[test]
    fn test_mean_single_heading() {
        let mean = circular_mean_heading([270.0]).unwrap();
        assert!((mean - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_mean_result_is_normalized() {
        let mean = circular_mean_heading([-90.0]).unwrap();
        assert!((mean - 270.0).abs() < 1e-9);

        let mean = circular_mean_heading([720.0 + 45.0]).unwrap();
        assert!((mean - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_mean_empty_is_none() {
        assert!(circular_mean_heading(Vec::<f64>::new()).is_none());
    }

    #[test]
    fn test_opposite_headings_cancel() {
        assert!(circular_mean_heading([0.0, 180.0]).is_none());
    }

    #[test]
    fn test_active_wind_direction_skips_expired_and_legacy() {
        let mut beacons = DeviceRegistry::new();
        beacons.upsert("A", 1, beacon(Some(350.0)), 10_000);
        beacons.upsert("B", 1, beacon(Some(10.0)), 10_000);
        beacons.upsert("C", 1, beacon(Some(180.0)), 0);
        beacons.upsert("D", 1, beacon(None), 10_000);

        let mean = active_wind_direction(&beacons, 12_000, 5_000).unwrap();
        assert!(angular_distance(mean, 0.0) < 1e-4, "got {}", mean);
    }

    #[test]
    fn test_mean_skips_non_finite_headings() {
        let mean = circular_mean_heading([350.0, f64::NAN, 10.0, f64::INFINITY]).unwrap();
        assert!(angular_distance(mean, 0.0) < 1e-6, "got {}", mean);
        assert!((0.0..360.0).contains(&mean));

        assert!(circular_mean_heading([f64::NAN, f64::NEG_INFINITY]).is_none());
    }

    #[test]
    fn test_active_wind_direction_ignores_garbage_vane() {
        let mut beacons = DeviceRegistry::new();
        beacons.upsert("A", 1, beacon(Some(350.0)), 0);
        beacons.upsert("B", 1, beacon(Some(10.0)), 0);
        beacons.upsert("C", 1, beacon(Some(f32::NAN)), 0);

        let mean = active_wind_direction(&beacons, 0, 5_000).unwrap();
        assert!((0.0..360.0).contains(&mean), "got {}", mean);
        assert!(angular_distance(mean, 0.0) < 1e-4, "got {}", mean);
    }

    #[test]
    fn test_active_wind_direction_without_beacons() {
        let beacons = DeviceRegistry::new();
        assert!(active_wind_direction(&beacons, 0, 5_000).is_none());

        let mut beacons = DeviceRegistry::new();
        beacons.upsert("D", 1, beacon(None), 0);
        assert!(active_wind_direction(&beacons, 0, 5_000).is_none());
    }
}
