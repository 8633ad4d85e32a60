//! Profile reconciliation.
//!
//! Runs after every session change that carries a user. Guarantees that an
//! authenticated user eventually has exactly one profile row, materializing
//! it from the pending-signup slot when the signup happened before the
//! account was verified.
//!
//! Everything here is a passive path: failures are logged and surface only
//! as an absent profile. The next session change is the retry.

use tracing::{debug, warn};

use crate::backend::{Backend, NewProfile, Profile, User};

use super::pending::PendingSignupCache;
use super::AuthFlowError;

/// Resolve the profile for an authenticated user.
///
/// Fetch-first: an existing row always wins. Only when no row exists and the
/// pending slot matches the user's email is a row inserted — and then the
/// adopted value is a re-fetch of the backend's canonical representation,
/// not the local payload.
pub(crate) async fn reconcile(
    backend: &dyn Backend,
    pending: &PendingSignupCache,
    user: &User,
) -> Option<Profile> {
    match backend.fetch_profile(&user.id).await {
        Ok(Some(profile)) => return Some(profile),
        Ok(None) => {}
        Err(e) => {
            warn!(
                user_id = %user.id,
                error = %AuthFlowError::ProfileFetch(e),
                "profile fetch failed — treating as no profile for this cycle"
            );
            return None;
        }
    }

    let Some(cached) = pending.read().await else {
        // Expected for a brand-new signup still awaiting verification, or an
        // account created out-of-band.
        debug!(user_id = %user.id, "no profile and no pending signup");
        return None;
    };
    let Some(email) = user.email.as_deref() else {
        debug!(user_id = %user.id, "user has no email — pending slot not applicable");
        return None;
    };
    if !cached.matches_email(email) {
        debug!(user_id = %user.id, "pending signup is for a different email");
        return None;
    }

    let new_profile = NewProfile {
        user_id: user.id.clone(),
        role: cached.role,
        first_name: cached.first_name.clone(),
        last_name: cached.last_name.clone(),
        email: Some(cached.email.clone()),
    };
    if let Err(e) = backend.insert_profile(&new_profile).await {
        // Keep the slot: the next session change retries.
        warn!(
            user_id = %user.id,
            error = %AuthFlowError::ProfileInsert(e),
            "deferred profile creation failed"
        );
        return None;
    }

    // Companion role row is auxiliary — Profile.role stays authoritative, so
    // a failure here neither rolls back nor blocks.
    if let Err(e) = backend.insert_user_role(&user.id, cached.role).await {
        warn!(
            user_id = %user.id,
            error = %AuthFlowError::RoleInsert(e),
            "role assignment failed"
        );
    }

    pending.clear().await;

    match backend.fetch_profile(&user.id).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(
                user_id = %user.id,
                error = %AuthFlowError::ProfileFetch(e),
                "re-fetch after profile creation failed"
            );
            None
        }
    }
}
