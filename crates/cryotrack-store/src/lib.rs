//! Cryotrack Store - durable local state
//!
//! Offline-first persistence for the inventory:
//! - [`kv`]: string-keyed JSON storage, in-memory or file-backed
//! - [`records`]: versioned record schema with one-time legacy migration
//! - [`inventory`]: container list and per-container sample sets
//! - [`holding`]: checked-out holding area keyed by sample id
//!
//! Nothing here talks to the backend; the sync crate drains local
//! changes outward.

#![warn(unreachable_pub)]

pub mod error;
pub mod holding;
pub mod inventory;
pub mod kv;
pub mod records;

pub use error::{StoreError, StoreResult};
pub use holding::CheckedOutHolding;
pub use inventory::InventoryRepo;
pub use kv::{get_typed, put_typed, JsonFileStore, KeyValueStore, MemoryStore};
pub use records::SampleSetRecord;
