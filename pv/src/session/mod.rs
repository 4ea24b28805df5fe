//! Session state model
//!
//! [`SessionState`] is the aggregate the user edits, [`SessionRecord`] its
//! persisted/shared form, and [`share`] the reversible link encoding.
//! [`SessionManager`] owns a live session and routes every edit.

mod manager;
mod record;
pub mod share;
mod state;

pub use manager::{PendingSearch, SessionDeps, SessionManager, SessionSettings};
pub use record::{RECORD_VERSION, SessionRecord};
pub use share::{Reference, decode, encode};
pub use state::{ChecklistItem, ExternalLinks, SessionState};
