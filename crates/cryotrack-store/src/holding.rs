//! Checked-out holding area
//!
//! Samples removed from a container are parked here, keyed by their
//! canonical identifier, so a later check-in can recover the full
//! history instead of starting a fresh record. Durable under the
//! `checked-out-samples` key.

use std::collections::BTreeMap;

use cryotrack_core::types::{Sample, SampleId};

use crate::error::StoreResult;
use crate::kv::{get_typed, put_typed, KeyValueStore};

const HOLDING_KEY: &str = "checked-out-samples";

/// Durable holding area for checked-out samples
pub struct CheckedOutHolding<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> CheckedOutHolding<'a> {
    /// Wrap a key-value store
    #[must_use]
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    fn load(&self) -> StoreResult<BTreeMap<SampleId, Sample>> {
        Ok(get_typed(self.store, HOLDING_KEY)?.unwrap_or_default())
    }

    fn save(&self, held: &BTreeMap<SampleId, Sample>) -> StoreResult<()> {
        put_typed(self.store, HOLDING_KEY, held)
    }

    /// Park a sample; replaces any previous entry for the same id
    pub fn put(&self, sample: Sample) -> StoreResult<()> {
        let mut held = self.load()?;
        held.insert(sample.sample_id.clone(), sample);
        self.save(&held)
    }

    /// Read a parked sample without removing it
    pub fn get(&self, id: &SampleId) -> StoreResult<Option<Sample>> {
        Ok(self.load()?.remove(id))
    }

    /// Remove and return a parked sample
    pub fn take(&self, id: &SampleId) -> StoreResult<Option<Sample>> {
        let mut held = self.load()?;
        let sample = held.remove(id);
        if sample.is_some() {
            self.save(&held)?;
        }
        Ok(sample)
    }

    /// All parked samples, ordered by identifier
    pub fn all(&self) -> StoreResult<Vec<Sample>> {
        Ok(self.load()?.into_values().collect())
    }
}
