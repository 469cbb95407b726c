// 🚚 Movement Detector - compare two snapshots of resolved locations
// An AP only counts as moved when the displacement beats both error bars
// plus a fixed margin: distance >= hacc_prev + hacc_cur + min_distance

use crate::geo::haversine_km;
use crate::record::{AccessPointRecord, MovementRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Margin added on top of both accuracies (default: 10m)
    pub min_distance_meters: f64,

    /// Drop entries whose accuracy is unknown or above this (default: disabled)
    pub max_accuracy_meters: Option<i32>,
}

impl Default for MovementConfig {
    fn default() -> Self {
        MovementConfig {
            min_distance_meters: 10.0,
            max_accuracy_meters: None,
        }
    }
}

impl MovementConfig {
    /// Build from CLI-style values where a negative max accuracy disables the filter
    pub fn from_cli(min_distance_meters: f64, max_hacc: i32) -> Self {
        MovementConfig {
            min_distance_meters,
            max_accuracy_meters: (max_hacc >= 0).then_some(max_hacc),
        }
    }
}

// ============================================================================
// PREDICATE
// ============================================================================

/// Distance (meters) a pair must reach to count as moved
pub fn movement_threshold_meters(
    previous: &AccessPointRecord,
    current: &AccessPointRecord,
    min_distance_meters: f64,
) -> f64 {
    previous.accuracy_margin_meters() + current.accuracy_margin_meters() + min_distance_meters
}

/// Inclusive: a displacement equal to the threshold is a movement
pub fn is_movement(distance_meters: f64, threshold_meters: f64) -> bool {
    distance_meters >= threshold_meters
}

// ============================================================================
// DETECTOR
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MovementDetector {
    pub config: MovementConfig,
}

impl MovementDetector {
    pub fn new(config: MovementConfig) -> Self {
        MovementDetector { config }
    }

    fn passes_accuracy_filter(&self, record: &AccessPointRecord) -> bool {
        match self.config.max_accuracy_meters {
            Some(max) => record.accuracy_within(max),
            None => true,
        }
    }

    /// Compare a single pair, returning a movement when the predicate holds
    pub fn compare(
        &self,
        previous: &AccessPointRecord,
        current: &AccessPointRecord,
    ) -> Option<MovementRecord> {
        if !previous.has_usable_coordinates() || !current.has_usable_coordinates() {
            return None;
        }

        let distance_km = haversine_km(
            previous.latitude,
            previous.longitude,
            current.latitude,
            current.longitude,
        );
        let distance_m = distance_km * 1000.0;
        let threshold_m =
            movement_threshold_meters(previous, current, self.config.min_distance_meters);

        if !is_movement(distance_m, threshold_m) {
            debug!(
                bssid = %current.normalized_identifier,
                distance_m,
                threshold_m,
                "within accuracy, not moved"
            );
            return None;
        }

        let elapsed_ms = current.observed_at_epoch_millis - previous.observed_at_epoch_millis;

        info!(
            bssid = %current.normalized_identifier,
            distance_km,
            distance_m = distance_m.round(),
            hacc_previous = previous.accuracy_margin_meters(),
            hacc_current = current.accuracy_margin_meters(),
            min_distance_m = self.config.min_distance_meters,
            threshold_m = threshold_m.round(),
            "movement detected"
        );

        Some(MovementRecord {
            normalized_identifier: current.normalized_identifier.clone(),
            previous_location: previous.clone(),
            current_location: current.clone(),
            distance_km,
            elapsed_hours: elapsed_ms as f64 / MILLIS_PER_HOUR,
        })
    }

    /// All movements between two keyed snapshots, sorted by identifier
    pub fn detect(
        &self,
        current: &HashMap<String, AccessPointRecord>,
        previous: &HashMap<String, AccessPointRecord>,
    ) -> Vec<MovementRecord> {
        let mut movements: Vec<MovementRecord> = current
            .iter()
            .filter(|(_, cur)| self.passes_accuracy_filter(cur))
            .filter_map(|(key, cur)| {
                let prev = previous.get(key)?;
                if !self.passes_accuracy_filter(prev) {
                    return None;
                }
                self.compare(prev, cur)
            })
            .collect();

        movements.sort_by(|a, b| a.normalized_identifier.cmp(&b.normalized_identifier));
        movements
    }
}

/// Free-function form of `MovementDetector::detect`
pub fn detect_movements(
    current: &HashMap<String, AccessPointRecord>,
    previous: &HashMap<String, AccessPointRecord>,
    config: &MovementConfig,
) -> Vec<MovementRecord> {
    MovementDetector::new(config.clone()).detect(current, previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::tests::latitude_offset;

    const BASE_LAT: f64 = 40.0;
    const BASE_LON: f64 = -3.7;
    const T0: i64 = 1_700_000_000_000;

    fn record(id: &str, lat: f64, lon: f64, hacc: i32, ts: i64) -> AccessPointRecord {
        AccessPointRecord {
            raw_identifier: id.to_string(),
            normalized_identifier: id.to_string(),
            latitude: lat,
            longitude: lon,
            channel: 11,
            horizontal_accuracy_meters: hacc,
            observed_at_epoch_millis: ts,
        }
    }

    fn snapshot(records: Vec<AccessPointRecord>) -> HashMap<String, AccessPointRecord> {
        records
            .into_iter()
            .map(|r| (r.normalized_identifier.clone(), r))
            .collect()
    }

    /// previous at BASE, current `meters` further north
    fn pair(meters: f64, hacc_prev: i32, hacc_cur: i32) -> (AccessPointRecord, AccessPointRecord) {
        let id = "aa:bb:cc:dd:ee:ff";
        (
            record(id, BASE_LAT, BASE_LON, hacc_prev, T0),
            record(id, latitude_offset(BASE_LAT, meters), BASE_LON, hacc_cur, T0 + 7_200_000),
        )
    }

    #[test]
    fn test_threshold_is_inclusive() {
        assert!(is_movement(45.0, 45.0));
        assert!(!is_movement(44.999, 45.0));
        assert!(is_movement(45.001, 45.0));
    }

    #[test]
    fn test_threshold_sums_accuracies_and_margin() {
        let (prev, cur) = pair(0.0, 20, 15);
        assert_eq!(movement_threshold_meters(&prev, &cur, 10.0), 45.0);

        let (prev, cur) = pair(0.0, -1, 15);
        assert_eq!(movement_threshold_meters(&prev, &cur, 10.0), 25.0);
    }

    #[test]
    fn test_flags_at_45m_not_at_44m() {
        let detector = MovementDetector::default();

        let (prev, cur) = pair(45.0 + 1e-6, 20, 15);
        let movement = detector.compare(&prev, &cur).expect("45m should flag");
        assert!((movement.distance_km - 0.045).abs() < 1e-6);
        assert!((movement.elapsed_hours - 2.0).abs() < 1e-9);

        let (prev, cur) = pair(44.0, 20, 15);
        assert!(detector.compare(&prev, &cur).is_none());
    }

    #[test]
    fn test_displacement_equal_to_threshold_flags() {
        let (prev, cur) = pair(45.0, 20, 15);
        let distance_m = haversine_km(prev.latitude, prev.longitude, cur.latitude, cur.longitude) * 1000.0;

        // Margin chosen so accuracies + margin land exactly on the distance
        let detector = MovementDetector::new(MovementConfig {
            min_distance_meters: distance_m - 35.0,
            max_accuracy_meters: None,
        });
        let threshold_m = movement_threshold_meters(&prev, &cur, detector.config.min_distance_meters);
        assert_eq!(threshold_m, distance_m);

        let movement = detector.compare(&prev, &cur).expect("equal distance should flag");
        assert_eq!(movement.distance_km * 1000.0, distance_m);
    }

    #[test]
    fn test_identical_locations_never_move() {
        for min in [0.0, 10.0, 1000.0] {
            let detector = MovementDetector::new(MovementConfig {
                min_distance_meters: min,
                max_accuracy_meters: None,
            });
            for (hp, hc) in [(-1, -1), (0, 0), (20, 15)] {
                let (prev, cur) = pair(0.0, hp, hc);
                // An all-zero threshold flags even a zero displacement
                if min + prev.accuracy_margin_meters() + cur.accuracy_margin_meters() > 0.0 {
                    assert!(detector.compare(&prev, &cur).is_none());
                }
            }
        }
    }

    #[test]
    fn test_unknown_accuracy_adds_no_margin() {
        let detector = MovementDetector::default();
        // threshold = 0 + 0 + 10
        let (prev, cur) = pair(12.0, -1, -1);
        assert!(detector.compare(&prev, &cur).is_some());
    }

    #[test]
    fn test_sentinel_and_nan_pairs_skipped() {
        let detector = MovementDetector::default();
        let id = "aa:bb:cc:dd:ee:ff";
        let good = record(id, BASE_LAT, BASE_LON, 10, T0);

        let sentinel = record(id, -180.0, -180.0, -1, T0);
        assert!(detector.compare(&sentinel, &good).is_none());
        assert!(detector.compare(&good, &sentinel).is_none());

        let nan = record(id, f64::NAN, BASE_LON, 10, T0);
        assert!(detector.compare(&nan, &good).is_none());
    }

    #[test]
    fn test_detect_only_common_keys() {
        let current = snapshot(vec![
            record("00:00:00:00:00:01", latitude_offset(BASE_LAT, 500.0), BASE_LON, 10, T0),
            record("00:00:00:00:00:02", BASE_LAT, BASE_LON, 10, T0),
            record("00:00:00:00:00:03", latitude_offset(BASE_LAT, 900.0), BASE_LON, 10, T0),
        ]);
        let previous = snapshot(vec![
            record("00:00:00:00:00:01", BASE_LAT, BASE_LON, 10, T0 - 3_600_000),
            record("00:00:00:00:00:02", BASE_LAT, BASE_LON, 10, T0 - 3_600_000),
        ]);

        let movements = detect_movements(&current, &previous, &MovementConfig::default());

        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].normalized_identifier, "00:00:00:00:00:01");
        assert!((movements[0].elapsed_hours - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_max_accuracy_filter_drops_pairs() {
        let current = snapshot(vec![
            record("00:00:00:00:00:01", latitude_offset(BASE_LAT, 500.0), BASE_LON, 80, T0),
            record("00:00:00:00:00:02", latitude_offset(BASE_LAT, 500.0), BASE_LON, 20, T0),
            record("00:00:00:00:00:03", latitude_offset(BASE_LAT, 500.0), BASE_LON, -1, T0),
        ]);
        let previous = snapshot(vec![
            record("00:00:00:00:00:01", BASE_LAT, BASE_LON, 10, T0),
            record("00:00:00:00:00:02", BASE_LAT, BASE_LON, 10, T0),
            record("00:00:00:00:00:03", BASE_LAT, BASE_LON, 10, T0),
        ]);

        let config = MovementConfig::from_cli(10.0, 50);
        let movements = detect_movements(&current, &previous, &config);

        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].normalized_identifier, "00:00:00:00:00:02");

        // Disabled filter keeps all three
        let all = detect_movements(&current, &previous, &MovementConfig::from_cli(10.0, -1));
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_negative_elapsed_passes_through() {
        let detector = MovementDetector::default();
        let (mut prev, mut cur) = pair(1000.0, 5, 5);
        prev.observed_at_epoch_millis = T0 + 3_600_000;
        cur.observed_at_epoch_millis = T0;

        let movement = detector.compare(&prev, &cur).unwrap();
        assert!((movement.elapsed_hours + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_output_sorted_by_identifier() {
        let ids = ["00:00:00:00:00:09", "00:00:00:00:00:01", "00:00:00:00:00:05"];
        let current = snapshot(
            ids.iter()
                .map(|id| record(id, latitude_offset(BASE_LAT, 300.0), BASE_LON, 5, T0))
                .collect(),
        );
        let previous = snapshot(
            ids.iter()
                .map(|id| record(id, BASE_LAT, BASE_LON, 5, T0))
                .collect(),
        );

        let movements = MovementDetector::default().detect(&current, &previous);
        let order: Vec<&str> = movements
            .iter()
            .map(|m| m.normalized_identifier.as_str())
            .collect();
        assert_eq!(order, vec!["00:00:00:00:00:01", "00:00:00:00:00:05", "00:00:00:00:00:09"]);
    }
}
