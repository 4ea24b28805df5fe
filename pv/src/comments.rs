//! Per-event comment threads
//!
//! A thread is a JSON array stored in the durable store under the event's
//! chat key. Posting is a naive read-modify-write; concurrent posters can lose
//! a comment (last write wins).

use pivotstore::{RecordKey, RecordStore};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::account::Account;
use crate::domain::EventIdentity;
use crate::error::SessionError;

pub const MAX_TEXT_CHARS: usize = 1000;
pub const MAX_NAME_CHARS: usize = 64;

/// Comments retained in storage
pub const STORED_COMMENTS: usize = 500;

/// Comments returned by [`CommentThread::list`]
pub const LISTED_COMMENTS: usize = 200;

/// Name used when the poster gives none
pub const GUEST_NAME: &str = "guest";

static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|\s)@([a-z0-9_-]+)").expect("mention pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
}

impl From<&Account> for CommentAuthor {
    fn from(account: &Account) -> Self {
        Self {
            id: account.sub.clone(),
            email: account.email.clone(),
            name: account.name.clone(),
            picture: account.picture.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    /// Unix milliseconds
    pub ts: i64,
    pub name: String,
    pub text: String,
    #[serde(default)]
    pub mentions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<CommentAuthor>,
}

/// Distinct lowercase `@handle` mentions, in order of first appearance
pub fn extract_mentions(text: &str) -> Vec<String> {
    let mut mentions: Vec<String> = Vec::new();
    for cap in MENTION_RE.captures_iter(text) {
        let handle = cap[1].to_lowercase();
        if !mentions.contains(&handle) {
            mentions.push(handle);
        }
    }
    mentions
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Comment thread of one event
pub struct CommentThread {
    store: Arc<dyn RecordStore>,
    key: RecordKey,
}

impl CommentThread {
    pub fn new(store: Arc<dyn RecordStore>, event: &EventIdentity) -> Self {
        Self {
            store,
            key: event.chat_key(),
        }
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    /// The most recent comments, oldest first
    pub async fn list(&self) -> Result<Vec<Comment>, SessionError> {
        debug!(key = %self.key, "list: called");
        let mut comments = self.load().await?;
        let skip = comments.len().saturating_sub(LISTED_COMMENTS);
        comments.drain(..skip);
        Ok(comments)
    }

    /// Append a comment; the signed-in account's name overrides `name`
    pub async fn post(&self, name: &str, text: &str, author: Option<&Account>) -> Result<Comment, SessionError> {
        debug!(key = %self.key, "post: called");
        let text = truncate_chars(text.trim(), MAX_TEXT_CHARS);
        if text.is_empty() {
            return Err(SessionError::EmptyComment);
        }

        let mut name = truncate_chars(name.trim(), MAX_NAME_CHARS);
        if let Some(account) = author
            && !account.name.is_empty()
        {
            name = account.name.clone();
        }
        if name.is_empty() {
            name = GUEST_NAME.to_string();
        }

        let comment = Comment {
            id: Uuid::now_v7().to_string(),
            ts: chrono::Utc::now().timestamp_millis(),
            name,
            mentions: extract_mentions(&text),
            text,
            user: author.map(CommentAuthor::from),
        };

        let mut comments = self.load().await?;
        comments.push(comment.clone());
        let skip = comments.len().saturating_sub(STORED_COMMENTS);
        comments.drain(..skip);

        let value = serde_json::to_value(&comments).map_err(pivotstore::StoreError::from)?;
        self.store.put(&self.key, &value).await?;
        info!(key = %self.key, id = %comment.id, "comment posted");
        Ok(comment)
    }

    /// Stored comments; anything that is not an array reads as empty
    async fn load(&self) -> Result<Vec<Comment>, SessionError> {
        let value = self.store.get(&self.key).await?;
        let comments = match value {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<Comment>(item).ok())
                .collect(),
            Some(_) => {
                debug!(key = %self.key, "load: thread is not an array");
                Vec::new()
            }
            None => Vec::new(),
        };
        Ok(comments)
    }
}
