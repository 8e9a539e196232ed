//! The cached temperature series and its storage round-trip.
//!
//! Samples are kept in arrival order and identified by their timestamp key.
//! Storage holds two parallel JSON arrays, one per field.

use crate::store::KeyValueStore;
use common::{Error, Result, Sample};
use std::collections::HashSet;
use tracing::warn;

/// Store key holding the JSON array of timestamp strings.
pub const TIMESTAMPS_KEY: &str = "timestamps";
/// Store key holding the JSON array of temperatures.
pub const TEMPERATURES_KEY: &str = "temperatures";

/// Deduplicated, arrival-ordered sequence of samples.
#[derive(Debug, Clone, Default)]
pub struct Series {
    samples: Vec<Sample>,
    keys: HashSet<String>,
}

/// Outcome of a [`Series::merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeStats {
    /// Pairs offered by the payload.
    pub received: usize,
    /// Pairs whose key was new and got appended.
    pub appended: usize,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from samples, keeping the first occurrence of each key.
    pub fn from_samples(samples: impl IntoIterator<Item = Sample>) -> Self {
        let mut series = Self::new();
        series.merge(samples);
        series
    }

    /// Append every sample whose key is not already present, in input order.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = Sample>) -> MergeStats {
        let mut stats = MergeStats::default();
        for sample in incoming {
            stats.received += 1;
            if self.keys.insert(sample.key.clone()) {
                self.samples.push(sample);
                stats.appended += 1;
            }
        }
        stats
    }

    /// Drop the oldest samples so at most `max` remain. Returns the number evicted.
    pub fn retain_latest(&mut self, max: usize) -> usize {
        let excess = self.samples.len().saturating_sub(max);
        for evicted in self.samples.drain(..excess) {
            self.keys.remove(&evicted.key);
        }
        excess
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.keys.clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Load the series written by [`Series::persist`]. Missing keys yield an
    /// empty series.
    pub fn load(store: &dyn KeyValueStore) -> Result<Self> {
        let keys: Vec<String> = read_array(store, TIMESTAMPS_KEY)?;
        let temperatures: Vec<f64> = read_array(store, TEMPERATURES_KEY)?;

        if keys.len() != temperatures.len() {
            warn!(
                "Stored series is ragged ({} timestamps, {} temperatures); truncating to {}",
                keys.len(),
                temperatures.len(),
                keys.len().min(temperatures.len())
            );
        }

        let stored = keys.len().min(temperatures.len());
        let series = Self::from_samples(
            keys.into_iter()
                .zip(temperatures)
                .map(|(key, temperature)| Sample { key, temperature }),
        );
        if series.len() < stored {
            warn!(
                "Dropped {} duplicate timestamps from stored series",
                stored - series.len()
            );
        }
        Ok(series)
    }

    /// Overwrite both store keys with this series.
    pub fn persist(&self, store: &dyn KeyValueStore) -> Result<()> {
        let keys: Vec<&str> = self.samples.iter().map(|s| s.key.as_str()).collect();
        let temperatures: Vec<f64> = self.samples.iter().map(|s| s.temperature).collect();

        store.set(TIMESTAMPS_KEY, &serde_json::to_string(&keys)?)?;
        store.set(TEMPERATURES_KEY, &serde_json::to_string(&temperatures)?)?;
        Ok(())
    }
}

impl PartialEq for Series {
    fn eq(&self, other: &Self) -> bool {
        self.samples == other.samples
    }
}

fn read_array<T: serde::de::DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Vec<T>> {
    match store.get(key)? {
        None => Ok(Vec::new()),
        Some(raw) if raw.trim() == "null" => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| Error::Storage(format!("stored {key:?} is not a valid array: {e}"))),
    }
}
