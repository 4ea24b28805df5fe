//! Pivot - mood/budget/location plan composer
//!
//! Pivot turns a vibe, a price cap and a starting point into a small evening
//! plan of nearby venues plus a pool of alternates, and keeps that plan
//! shareable and recoverable.
//!
//! # Core Concepts
//!
//! - **Score, then compose**: every candidate gets a deterministic score; the
//!   top three form the plan, the next four the alternates
//! - **Pivot, don't restart**: kept venues survive a re-roll, the rest are
//!   excluded from the next plan
//! - **Three tiers of state**: a share link snapshot wins over the durable
//!   record, which wins over the device cache, which wins over defaults
//!
//! # Modules
//!
//! - [`domain`] - Candidates, preferences, locations and event identities
//! - [`scoring`] / [`composer`] - Ranking and plan composition
//! - [`controller`] - Build/pivot/keep/replace state machine
//! - [`session`] - Session state, share codec and the session runtime
//! - [`sync`] - Reconciliation and debounced persistence
//! - [`search`] - Candidate search and geocoding providers
//! - [`comments`] / [`account`] - Per-event comment threads and sign-in
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod account;
pub mod cli;
pub mod comments;
pub mod composer;
pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod events;
pub mod geo;
pub mod scoring;
pub mod search;
pub mod session;
pub mod sync;

// Re-export commonly used types
pub use account::{Account, AccountSession};
pub use comments::{Comment, CommentThread};
pub use composer::{ALTERNATE_POOL_SIZE, Composition, PLAN_SIZE, compose};
pub use config::Config;
pub use controller::{ControllerError, Notice, PlanController, ReplaceOutcome, SearchKind, SearchOutcome};
pub use domain::{Candidate, CandidateId, EventIdentity, Location, PreferenceProfile, StartPoint};
pub use error::SessionError;
pub use events::{SessionEvent, Subscription};
pub use scoring::{Score, score};
pub use search::{CandidateSearch, SearchError, SearchQuery};
pub use session::{Reference, SessionDeps, SessionManager, SessionRecord, SessionSettings, SessionState};
pub use sync::{LoadSource, reconcile};
