//! Signed-in account state
//!
//! The account is read from an ID token's payload without verifying the
//! signature; it only labels comments and is never used for access control.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use pivotstore::{LocalCache, RecordKey};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::error::SessionError;
use crate::events::{Observers, Subscription};

/// Name used when a token has neither name nor email
pub const FALLBACK_NAME: &str = "User";

/// Identity of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub token: String,
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
    /// Expiry, seconds since the epoch
    #[serde(default)]
    pub exp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

impl Account {
    /// Decode the payload segment of a JWT
    pub fn from_id_token(token: &str) -> Option<Self> {
        let payload = token.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        let claims: Claims = serde_json::from_slice(&bytes).ok()?;
        let name = claims
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| claims.email.clone().filter(|e| !e.trim().is_empty()))
            .unwrap_or_else(|| FALLBACK_NAME.to_string());
        Some(Self {
            token: token.to_string(),
            sub: claims.sub,
            email: claims.email,
            name,
            picture: claims.picture,
            exp: claims.exp,
        })
    }

    /// An account without an expiry counts as expired
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.exp {
            Some(exp) => now.timestamp_millis() >= exp.saturating_mul(1000),
            None => true,
        }
    }
}

/// Current account plus change notification
pub struct AccountSession {
    current: Mutex<Option<Account>>,
    cache: Arc<dyn LocalCache>,
    observers: Observers<Option<Account>>,
}

impl AccountSession {
    pub fn new(cache: Arc<dyn LocalCache>) -> Self {
        Self {
            current: Mutex::new(None),
            cache,
            observers: Observers::new(),
        }
    }

    pub fn current(&self) -> Option<Account> {
        self.lock().clone()
    }

    /// Sign in with an ID token; the account is cached on this device
    pub fn sign_in(&self, token: &str) -> Result<Account, SessionError> {
        debug!("sign_in: called");
        let account = Account::from_id_token(token).ok_or(SessionError::InvalidToken)?;
        match serde_json::to_value(&account) {
            Ok(value) => self.cache.set(&RecordKey::account(), &value),
            Err(e) => debug!(error = %e, "sign_in: account not cached"),
        }
        info!(sub = %account.sub, "signed in");
        self.set(Some(account.clone()));
        Ok(account)
    }

    pub fn sign_out(&self) {
        debug!("sign_out: called");
        self.cache.remove(&RecordKey::account());
        self.set(None);
    }

    /// Restore a cached account, discarding it when expired
    pub fn restore(&self) -> Option<Account> {
        self.restore_at(Utc::now())
    }

    pub fn restore_at(&self, now: DateTime<Utc>) -> Option<Account> {
        let key = RecordKey::account();
        let cached = self
            .cache
            .get(&key)
            .and_then(|value| serde_json::from_value::<Account>(value).ok());
        match cached {
            Some(account) if !account.is_expired_at(now) => {
                debug!(sub = %account.sub, "restore: cached account restored");
                self.set(Some(account.clone()));
                Some(account)
            }
            Some(_) => {
                debug!("restore: cached account expired");
                self.cache.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Call `callback` now with the current account and again on every change
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Option<Account>) + Send + Sync + 'static,
    {
        callback(&self.current());
        self.observers.subscribe(callback)
    }

    fn set(&self, account: Option<Account>) {
        *self.lock() = account.clone();
        self.observers.notify(&account);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Account>> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
