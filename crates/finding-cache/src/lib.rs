//! # Refine Finding Cache
//!
//! Persistent fingerprint → findings store so unchanged code never
//! re-invokes the model capability.
//!
//! The contract is storage-agnostic: backends implement [`CacheStore`], and
//! a `get` miss or backend outage is never fatal to the pipeline; it
//! degrades to a forced miss and the dispatcher recomputes. Inference
//! failures are never written back (no negative caching).
//!
//! Two backends ship here: [`DiskCache`], a sharded content-addressed
//! directory with an in-memory read-through layer, and [`MemoryCache`] for
//! tests and ephemeral runs.

mod disk;
mod entry;
mod error;
mod store;

pub use disk::{CacheStats, DiskCache};
pub use entry::CacheEntry;
pub use error::{CacheError, Result};
pub use store::{CacheStore, MemoryCache};
