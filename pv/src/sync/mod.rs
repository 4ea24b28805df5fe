//! State reconciliation across the snapshot, durable and cache tiers

mod persister;
mod reconcile;

pub use persister::{DEFAULT_DEBOUNCE, Persister};
pub use reconcile::{LoadSource, Loaded, reconcile};
