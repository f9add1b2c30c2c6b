//! Inventory repository over the key-value store
//!
//! Owns the durable container list and each container's sample set.
//! Components receive a reference to this repository instead of reading
//! ambient global state, so every read/write path is explicit.
//!
//! Key layout:
//! - `containers` holds the full container list
//! - `samples-<container-id>` holds one container's sample set

use cryotrack_core::resolver::ContainerView;
use cryotrack_core::types::{Container, ContainerId, Sample, SampleId};

use crate::error::{StoreError, StoreResult};
use crate::kv::{put_typed, KeyValueStore};
use crate::records::SampleSetRecord;

const CONTAINERS_KEY: &str = "containers";

fn samples_key(id: &ContainerId) -> String {
    format!("samples-{id}")
}

/// Repository for containers and their sample sets
pub struct InventoryRepo<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> InventoryRepo<'a> {
    /// Wrap a key-value store
    #[must_use]
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// All known containers, archived included
    pub fn containers(&self) -> StoreResult<Vec<Container>> {
        Ok(crate::kv::get_typed(self.store, CONTAINERS_KEY)?.unwrap_or_default())
    }

    /// Look up one container by id
    ///
    /// # Errors
    /// Returns [`StoreError::UnknownContainer`] when the id is unknown.
    pub fn container(&self, id: &ContainerId) -> StoreResult<Container> {
        self.containers()?
            .into_iter()
            .find(|c| &c.id == id)
            .ok_or_else(|| StoreError::UnknownContainer(id.to_string()))
    }

    /// Insert or replace a container in the list
    pub fn upsert_container(&self, container: &Container) -> StoreResult<()> {
        let mut containers = self.containers()?;
        match containers.iter_mut().find(|c| c.id == container.id) {
            Some(slot) => *slot = container.clone(),
            None => containers.push(container.clone()),
        }
        put_typed(self.store, CONTAINERS_KEY, &containers)
    }

    /// Remove a container and its sample set
    pub fn delete_container(&self, id: &ContainerId) -> StoreResult<()> {
        let mut containers = self.containers()?;
        containers.retain(|c| &c.id != id);
        put_typed(self.store, CONTAINERS_KEY, &containers)?;
        self.store.delete(&samples_key(id))
    }

    /// Samples recorded in one container
    ///
    /// Legacy record shapes are migrated transparently on read.
    pub fn samples_in(&self, id: &ContainerId) -> StoreResult<Vec<Sample>> {
        let key = samples_key(id);
        match self.store.get_raw(&key)? {
            Some(raw) => Ok(SampleSetRecord::decode(&key, &raw)?.into_samples()),
            None => Ok(Vec::new()),
        }
    }

    /// Replace a container's sample set
    pub fn save_samples(&self, id: &ContainerId, samples: &[Sample]) -> StoreResult<()> {
        put_typed(
            self.store,
            &samples_key(id),
            &SampleSetRecord::new(samples.to_vec()),
        )
    }

    /// Find which container records a sample, if any
    pub fn find_sample(&self, id: &SampleId) -> StoreResult<Option<(Container, Sample)>> {
        for container in self.containers()? {
            if let Some(sample) = self
                .samples_in(&container.id)?
                .into_iter()
                .find(|s| &s.sample_id == id)
            {
                return Ok(Some((container, sample)));
            }
        }
        Ok(None)
    }

    /// Occupancy view of one container for the placement resolver
    pub fn view(&self, id: &ContainerId) -> StoreResult<ContainerView> {
        let container = self.container(id)?;
        let placed = self
            .samples_in(id)?
            .into_iter()
            .filter_map(|s| {
                let position = s.position.clone()?;
                s.occupies(&position).then(|| (position, s.sample_id))
            })
            .collect::<Vec<_>>();
        Ok(ContainerView::new(container, placed))
    }

    /// Occupancy views of every container except `excluding`
    pub fn other_views(&self, excluding: &ContainerId) -> StoreResult<Vec<ContainerView>> {
        self.containers()?
            .into_iter()
            .filter(|c| &c.id != excluding)
            .map(|c| self.view(&c.id))
            .collect()
    }
}
