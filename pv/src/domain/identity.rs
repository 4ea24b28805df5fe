//! Event identity and application-level slugging

use pivotstore::RecordKey;
use serde::{Deserialize, Serialize};

/// Longest slug produced by [`slugify`]
pub const MAX_SLUG_LEN: usize = 48;

/// Path prefix accepted in front of `/{owner}/{slug}`
const EVENT_PATH_PREFIX: &str = "e";

/// Who owns an event and how it is addressed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventIdentity {
    pub owner_handle: String,
    pub slug: String,
    #[serde(default)]
    pub display_name: String,
}

impl EventIdentity {
    /// Identity for a new event; owner and slug are slugged, the name is kept verbatim
    pub fn new(owner: &str, display_name: &str) -> Self {
        Self {
            owner_handle: slugify_or(owner, "guest"),
            slug: slugify_or(display_name, "event"),
            display_name: display_name.trim().to_string(),
        }
    }

    /// Derive an identity from a reference path such as `/maya/friday-walk`
    /// or `/e/maya/friday-walk`. Query and fragment are ignored.
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.first() == Some(&EVENT_PATH_PREFIX) {
            segments.remove(0);
        }
        match segments.as_slice() {
            [owner, slug] => {
                let owner_handle = slugify(owner);
                let slug = slugify(slug);
                if owner_handle.is_empty() || slug.is_empty() {
                    return None;
                }
                Some(Self {
                    owner_handle,
                    slug,
                    display_name: String::new(),
                })
            }
            _ => None,
        }
    }

    /// Canonical reference path
    pub fn path(&self) -> String {
        format!("/{}/{}", self.owner_handle, self.slug)
    }

    /// Storage key of this event's session record
    pub fn record_key(&self) -> RecordKey {
        RecordKey::event(&self.owner_handle, &self.slug)
    }

    /// Storage key of this event's comment thread
    pub fn chat_key(&self) -> RecordKey {
        RecordKey::chat(&self.owner_handle, &self.slug)
    }
}

/// Lowercase, collapse every run of non-alphanumerics into `-`, trim, cap length
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.chars().count() > MAX_SLUG_LEN {
        slug = slug.chars().take(MAX_SLUG_LEN).collect();
    }
    slug.trim_end_matches('-').to_string()
}

fn slugify_or(text: &str, fallback: &str) -> String {
    let slug = slugify(text);
    if slug.is_empty() { fallback.to_string() } else { slug }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Friday Walk!"), "friday-walk");
        assert_eq!(slugify("  --Maya's   B-day--  "), "maya-s-b-day");
        assert_eq!(slugify("***"), "");
        let long = "a ".repeat(60);
        assert!(slugify(&long).len() <= MAX_SLUG_LEN);
        assert!(!slugify(&long).ends_with('-'));
    }

    #[test]
    fn test_new_event_identity() {
        let id = EventIdentity::new("Maya", "Friday Walk");
        assert_eq!(id.owner_handle, "maya");
        assert_eq!(id.slug, "friday-walk");
        assert_eq!(id.display_name, "Friday Walk");
        assert_eq!(id.path(), "/maya/friday-walk");

        let id = EventIdentity::new("", "???");
        assert_eq!(id.owner_handle, "guest");
        assert_eq!(id.slug, "event");
    }

    #[test]
    fn test_from_path() {
        let id = EventIdentity::from_path("/maya/friday-walk?s=abc").unwrap();
        assert_eq!(id.owner_handle, "maya");
        assert_eq!(id.slug, "friday-walk");

        let id = EventIdentity::from_path("/e/maya/friday-walk/").unwrap();
        assert_eq!(id.slug, "friday-walk");

        assert!(EventIdentity::from_path("/").is_none());
        assert!(EventIdentity::from_path("/only-one").is_none());
        assert!(EventIdentity::from_path("/a/b/c").is_none());
    }

    #[test]
    fn test_record_keys() {
        let id = EventIdentity::new("maya", "friday walk");
        assert_eq!(id.record_key().storage_key(), "event:maya/friday-walk");
        assert_eq!(id.chat_key().storage_key(), "chat:maya/friday-walk");
    }
}
