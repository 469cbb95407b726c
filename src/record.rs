// 📍 Location Records - what the resolver produces and the detector compares
// Serialized field names match the results files written by earlier runs

use serde::{Deserialize, Serialize};

/// Coordinate pair the vendor returns when it has no location for an AP
pub const SENTINEL_COORDINATE: f64 = -180.0;

/// Channel reported for sentinel entries
pub const SENTINEL_CHANNEL: i32 = 0;

/// Marker for "not reported" channel / accuracy
pub const UNKNOWN: i32 = -1;

// ============================================================================
// ACCESS POINT RECORD
// ============================================================================

/// One access point as resolved by the vendor.
///
/// Created fresh per decoded entry and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPointRecord {
    /// Identifier exactly as the vendor returned it (octets may be unpadded)
    #[serde(rename = "bssid", default)]
    pub raw_identifier: String,

    /// Zero-padded, lower-case, colon-delimited join key
    #[serde(rename = "paddedBSSID")]
    pub normalized_identifier: String,

    #[serde(rename = "lat")]
    pub latitude: f64,

    #[serde(rename = "lon")]
    pub longitude: f64,

    /// WiFi channel, -1 when absent, 0 for sentinel entries
    #[serde(default = "unknown")]
    pub channel: i32,

    /// Horizontal accuracy in meters, -1 when unknown
    #[serde(rename = "hacc", default = "unknown")]
    pub horizontal_accuracy_meters: i32,

    /// Request time (not response time), shared by a whole response
    #[serde(rename = "timestamp", default)]
    pub observed_at_epoch_millis: i64,
}

fn unknown() -> i32 {
    UNKNOWN
}

impl AccessPointRecord {
    /// False for the vendor's "unknown location" sentinel (-180, -180)
    pub fn is_valid(&self) -> bool {
        !(self.latitude == SENTINEL_COORDINATE && self.longitude == SENTINEL_COORDINATE)
    }

    /// Usable for distance math: not the sentinel, no -180 component, no NaN
    pub fn has_usable_coordinates(&self) -> bool {
        !(self.latitude.is_nan()
            || self.longitude.is_nan()
            || self.latitude == SENTINEL_COORDINATE
            || self.longitude == SENTINEL_COORDINATE)
    }

    /// Accuracy as an error margin: unknown (negative) adds nothing
    pub fn accuracy_margin_meters(&self) -> f64 {
        self.horizontal_accuracy_meters.max(0) as f64
    }

    /// True when accuracy is known and within `[0, max]`
    pub fn accuracy_within(&self, max_meters: i32) -> bool {
        self.horizontal_accuracy_meters >= 0 && self.horizontal_accuracy_meters <= max_meters
    }
}

// ============================================================================
// MOVEMENT RECORD
// ============================================================================

/// An access point whose displacement between two snapshots exceeds what
/// both reported accuracies (plus a minimum distance) can explain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementRecord {
    #[serde(rename = "paddedBSSID")]
    pub normalized_identifier: String,

    #[serde(rename = "oldLocation")]
    pub previous_location: AccessPointRecord,

    #[serde(rename = "newLocation")]
    pub current_location: AccessPointRecord,

    /// Raw great-circle distance
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,

    /// Negative when the "previous" snapshot is newer than the current one
    #[serde(rename = "timeDiffHours")]
    pub elapsed_hours: f64,
}
