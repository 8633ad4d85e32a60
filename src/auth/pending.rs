//! Single-slot pending-signup cache.
//!
//! Email-confirmation deployments cannot create the profile row at signup
//! time (no session exists yet, so the row store would reject the write).
//! The intended profile fields are parked here and consumed by the
//! reconciler on the first session change whose email matches.
//!
//! The slot is best-effort: one outstanding signup per data dir, loss only
//! costs a retry, and every operation treats failure as a cache miss.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::backend::Role;
use crate::storage::Storage;

const PENDING_SIGNUP_KEY: &str = "auth.pending_signup_profile";

/// Locally cached projection of the profile a signup intends to have.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSignupProfile {
    pub email: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl PendingSignupProfile {
    /// Case-insensitive match against an authenticated user's email.
    pub fn matches_email(&self, email: &str) -> bool {
        self.email.to_lowercase() == email.to_lowercase()
    }
}

#[derive(Clone)]
pub struct PendingSignupCache {
    storage: Arc<Storage>,
}

impl PendingSignupCache {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Overwrite the slot unconditionally. Only one outstanding signup is
    /// supported at a time.
    pub async fn save(&self, pending: &PendingSignupProfile) {
        let payload = match serde_json::to_string(pending) {
            Ok(p) => p,
            Err(e) => {
                warn!("failed to serialize pending signup: {e}");
                return;
            }
        };
        if let Err(e) = self.storage.set_setting(PENDING_SIGNUP_KEY, &payload).await {
            warn!("failed to save pending signup: {e:#}");
        }
    }

    /// Returns the cached slot, or None. Malformed stored data reads as
    /// absent, never as an error.
    pub async fn read(&self) -> Option<PendingSignupProfile> {
        self.storage
            .get_setting(PENDING_SIGNUP_KEY)
            .await
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }

    /// Best-effort removal. A stale slot is harmless — reconciliation
    /// re-checks the email match before using it.
    pub async fn clear(&self) {
        let _ = self.storage.delete_setting(PENDING_SIGNUP_KEY).await;
    }
}
