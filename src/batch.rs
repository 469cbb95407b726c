// 📦 Batch Resolver - many BSSIDs, bounded concurrency, reproducible merge
//
// Results are collected per input position first and merged afterwards in
// input order, so "first write wins" does not depend on which request
// happened to finish first.

use crate::bssid::Bssid;
use crate::client::{LocationClient, ResolveOptions};
use crate::record::AccessPointRecord;
use indexmap::map::Entry;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

// ============================================================================
// LOCATION SET
// ============================================================================

/// Records keyed by normalized identifier, in insertion order
#[derive(Debug, Clone, Default)]
pub struct LocationSet {
    records: IndexMap<String, AccessPointRecord>,
}

impl LocationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the key is already present. Returns whether it was added.
    pub fn insert(&mut self, record: AccessPointRecord) -> bool {
        match self.records.entry(record.normalized_identifier.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&AccessPointRecord> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccessPointRecord> {
        self.records.values()
    }

    pub fn into_records(self) -> Vec<AccessPointRecord> {
        self.records.into_values().collect()
    }

    /// Keep only records matching `keep`, preserving order
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&AccessPointRecord) -> bool,
    {
        self.records.retain(|_, r| keep(r));
    }

    /// Keep records whose accuracy is known and at most `max_meters`
    pub fn retain_accuracy(&mut self, max_meters: i32) {
        self.retain(|r| r.accuracy_within(max_meters));
    }

    /// Keyed copy for the movement detector
    pub fn to_map(&self) -> HashMap<String, AccessPointRecord> {
        self.records
            .iter()
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect()
    }
}

impl FromIterator<AccessPointRecord> for LocationSet {
    fn from_iter<I: IntoIterator<Item = AccessPointRecord>>(iter: I) -> Self {
        let mut set = LocationSet::new();
        for record in iter {
            set.insert(record);
        }
        set
    }
}

// ============================================================================
// BATCH OUTCOME
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Merged records, first write wins
    pub locations: LocationSet,

    /// Calls that returned at least one record
    pub succeeded: usize,

    /// Calls that completed but returned nothing
    pub empty: usize,

    /// Calls that hit a transport, HTTP or decode error
    pub failed: usize,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.succeeded + self.empty + self.failed
    }
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Resolve every BSSID with at most `concurrency` requests in flight
pub async fn resolve_batch(
    client: &LocationClient,
    bssids: &[Bssid],
    concurrency: usize,
    options: ResolveOptions,
) -> BatchOutcome {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(bssids.len());

    for bssid in bssids.iter().copied() {
        let semaphore = semaphore.clone();
        let client = client.clone();

        handles.push(tokio::spawn(async move {
            // The semaphore is never closed
            let _permit = semaphore.acquire_owned().await.ok();
            let result = client.resolve_detailed(&bssid, options).await;
            (bssid, result)
        }));
    }

    // Awaiting in spawn order keeps results aligned with the input
    let mut outcome = BatchOutcome::default();
    for handle in handles {
        match handle.await {
            Ok((bssid, Ok(records))) => {
                if records.is_empty() {
                    debug!(bssid = %bssid, "no records");
                    outcome.empty += 1;
                } else {
                    outcome.succeeded += 1;
                }
                for record in records {
                    outcome.locations.insert(record);
                }
            }
            Ok((bssid, Err(e))) => {
                warn!(bssid = %bssid, kind = e.kind(), error = %e, "geolocation failed");
                outcome.failed += 1;
            }
            Err(e) => {
                warn!(error = %e, "resolve task aborted");
                outcome.failed += 1;
            }
        }
    }

    info!(
        requested = bssids.len(),
        succeeded = outcome.succeeded,
        empty = outcome.empty,
        failed = outcome.failed,
        unique = outcome.locations.len(),
        "batch complete"
    );

    outcome
}
