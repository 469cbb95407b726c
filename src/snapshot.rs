// 💾 Snapshot Files - the JSON results document and `--compare` input

use crate::record::{AccessPointRecord, MovementRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid snapshot format: 'locations' array not found")]
    MissingLocations,
}

// ============================================================================
// DOCUMENT
// ============================================================================

/// Parameters of the run that produced a snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infile: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bssid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare_file: Option<String>,

    pub movement_only: bool,
    pub min_distance_meters: f64,
    pub max_hacc: i32,
    pub concurrency: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Epoch millis at program start
    pub execution_timestamp: i64,
    pub parameters: RunParameters,
    pub locations: Vec<AccessPointRecord>,
    pub movements_detected: Vec<MovementRecord>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let json = self.to_json().map_err(|source| SnapshotError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

// ============================================================================
// PREVIOUS RESULTS
// ============================================================================

/// Load the locations of a previous run, keyed by lower-cased identifier.
///
/// Lenient on purpose of older files: incomplete entries are skipped, and a
/// missing per-entry timestamp falls back to the run's `executionTimestamp`.
pub fn load_previous(path: &Path) -> Result<HashMap<String, AccessPointRecord>, SnapshotError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document: Value = serde_json::from_str(&raw).map_err(|source| SnapshotError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let previous = parse_previous(&document)?;
    info!(path = %path.display(), entries = previous.len(), "loaded previous locations");
    Ok(previous)
}

pub fn parse_previous(document: &Value) -> Result<HashMap<String, AccessPointRecord>, SnapshotError> {
    let locations = document
        .get("locations")
        .and_then(Value::as_array)
        .ok_or(SnapshotError::MissingLocations)?;
    let execution_timestamp = document
        .get("executionTimestamp")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    let mut previous = HashMap::new();
    for entry in locations {
        let complete = ["paddedBSSID", "lat", "lon"]
            .iter()
            .all(|k| entry.get(k).is_some_and(|v| !v.is_null()));
        if !complete {
            warn!(entry = %entry, "skipping incomplete previous location entry");
            continue;
        }

        match serde_json::from_value::<AccessPointRecord>(entry.clone()) {
            Ok(mut record) => {
                record.normalized_identifier = record.normalized_identifier.to_lowercase();
                if record.observed_at_epoch_millis == 0 {
                    record.observed_at_epoch_millis = execution_timestamp;
                }
                previous.insert(record.normalized_identifier.clone(), record);
            }
            Err(e) => warn!(entry = %entry, error = %e, "skipping malformed previous location entry"),
        }
    }

    Ok(previous)
}
