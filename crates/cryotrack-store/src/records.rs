//! Versioned on-disk record schema
//!
//! Earlier releases persisted a container's samples in two ad-hoc shapes:
//! a bare JSON array of samples, and an object keyed by position. Every
//! reader used to sniff which shape it was holding. Records are now
//! written in a single tagged schema; the legacy shapes are recognized
//! exactly once, at load time, by [`SampleSetRecord::decode`].

use cryotrack_core::types::{Position, Sample};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Persisted set of samples for one container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum SampleSetRecord {
    /// Current schema: a flat list, each sample carrying its own position
    #[serde(rename = "1")]
    V1 {
        /// Samples recorded in this container
        samples: Vec<Sample>,
    },
}

impl SampleSetRecord {
    /// Wrap a sample list in the current schema version
    #[must_use]
    pub fn new(samples: Vec<Sample>) -> Self {
        Self::V1 { samples }
    }

    /// Consume the record, yielding its samples
    #[must_use]
    pub fn into_samples(self) -> Vec<Sample> {
        match self {
            Self::V1 { samples } => samples,
        }
    }

    /// Decode a stored value, migrating legacy shapes when found
    ///
    /// Accepted inputs, tried in order:
    /// 1. the tagged current schema
    /// 2. a bare array of samples
    /// 3. an object mapping position strings to samples
    ///
    /// # Errors
    /// Returns [`StoreError::Corrupt`] when none of the shapes match.
    pub fn decode(key: &str, raw: &str) -> StoreResult<Self> {
        match serde_json::from_str::<Self>(raw) {
            Ok(record) => Ok(record),
            Err(_) => {
                tracing::debug!(key, "record not in current schema, trying legacy shapes");
                migrate_legacy(key, raw)
            }
        }
    }
}

/// One-time upgrade of the two historical record shapes
///
/// This is the only place in the codebase that inspects stored-record
/// shape; everything else reads the tagged schema.
fn migrate_legacy(key: &str, raw: &str) -> StoreResult<SampleSetRecord> {
    if let Ok(samples) = serde_json::from_str::<Vec<Sample>>(raw) {
        tracing::info!(key, count = samples.len(), "migrated legacy array record");
        return Ok(SampleSetRecord::V1 { samples });
    }

    let by_position = serde_json::from_str::<std::collections::BTreeMap<String, Sample>>(raw)
        .map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })?;
    let samples = by_position
        .into_iter()
        .map(|(position, mut sample)| {
            // Position-keyed maps predate samples storing their own
            // position; the key is authoritative for that shape.
            sample.position = Some(Position::new(&position));
            sample
        })
        .collect::<Vec<_>>();
    tracing::info!(key, count = samples.len(), "migrated legacy keyed record");
    Ok(SampleSetRecord::V1 { samples })
}
