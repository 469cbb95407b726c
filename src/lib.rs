// BSSID Locator - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod bssid;      // Input: BSSID parsing and files
pub mod record;     // Data: access point + movement records
pub mod geo;        // Geometry: haversine distance
pub mod config;     // Client constants + server environment
pub mod proto;      // Wire: vendor framing + protobuf schema
pub mod client;     // Protocol Client
pub mod batch;      // Batch resolver with bounded concurrency
pub mod movement;   // Movement Detector
pub mod snapshot;   // JSON results + previous-run loading
pub mod export;     // TSV / KML / console
pub mod logging;    // tracing subscriber

#[cfg(feature = "server")]
pub mod api;        // HTTP front-end

// Re-export commonly used types
pub use bssid::{
    Bssid, BssidError,
    normalize_bssid, pad_identifier, parse_bssid_lines, read_bssid_file,
};
pub use record::{
    AccessPointRecord, MovementRecord,
    SENTINEL_CHANNEL, SENTINEL_COORDINATE, UNKNOWN,
};
pub use geo::{haversine_km, EARTH_RADIUS_KM};
pub use config::ClientConfig;
#[cfg(feature = "server")]
pub use config::ServerConfig;
pub use client::{
    HttpTransport, LocationClient, ResolveError, ResolveOptions, Transport,
    decode_response,
};
pub use batch::{resolve_batch, BatchOutcome, LocationSet};
pub use movement::{
    detect_movements, is_movement, movement_threshold_meters,
    MovementConfig, MovementDetector,
};
pub use snapshot::{load_previous, RunParameters, Snapshot, SnapshotError};
pub use logging::init_tracing;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
