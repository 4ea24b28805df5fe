//! Record keys

use serde::{Deserialize, Serialize};

/// Which family of records a key addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Event session records
    Event,
    /// Comment threads attached to an event
    Chat,
    /// The signed-in account on this device
    Account,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Chat => "chat",
            Self::Account => "account",
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Address of one record: `(namespace, owner, slug)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub namespace: Namespace,
    pub owner: String,
    pub slug: String,
}

impl RecordKey {
    pub fn new(namespace: Namespace, owner: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            namespace,
            owner: owner.into(),
            slug: slug.into(),
        }
    }

    /// Key of an event session record
    pub fn event(owner: impl Into<String>, slug: impl Into<String>) -> Self {
        Self::new(Namespace::Event, owner, slug)
    }

    /// Key of an event's comment thread
    pub fn chat(owner: impl Into<String>, slug: impl Into<String>) -> Self {
        Self::new(Namespace::Chat, owner, slug)
    }

    /// Key of the device's signed-in account
    pub fn account() -> Self {
        Self::new(Namespace::Account, "device", "current")
    }

    /// Flat storage key, e.g. `event:maya/friday-walk`
    pub fn storage_key(&self) -> String {
        format!("{}:{}/{}", self.namespace, self.owner, self.slug)
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.storage_key())
    }
}
