//! Observer-based change notification
//!
//! Sessions and account state expose `subscribe(callback)` returning a
//! [`Subscription`]; there is no global registry.

mod observers;
mod types;

pub use observers::{Observers, Subscription};
pub use types::SessionEvent;
