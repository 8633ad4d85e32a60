//! Navigation guard for protected routes.
//!
//! A pure decision over `(auth state, route)` — no I/O, no waiting. While
//! the bootstrap is still loading, no navigation decision is made at all.

use crate::auth::AuthState;

use super::Route;

/// Outcome of evaluating a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Bootstrap in progress — render a blocking placeholder.
    Loading,
    /// Not signed in. `from` preserves the attempted path so the sign-in
    /// view can return there afterwards.
    RedirectToSignIn { from: String },
    /// Signed in but not allowed here — send to the default authenticated
    /// landing view.
    RedirectToDashboard,
    Allow,
}

/// Evaluate a navigation attempt against the current bootstrap state.
///
/// An authenticated user whose profile has not materialized yet (deferred
/// reconciliation pending or failed) fails a role-restricted route closed:
/// they are redirected to the dashboard rather than let through or made to
/// wait.
pub fn evaluate(state: &AuthState, route: &Route) -> GuardDecision {
    if !route.requires_auth() {
        return GuardDecision::Allow;
    }
    if state.loading {
        return GuardDecision::Loading;
    }
    if state.user.is_none() {
        return GuardDecision::RedirectToSignIn { from: route.path() };
    }
    if let Some(allowed) = route.allowed_roles() {
        match &state.profile {
            Some(profile) if allowed.contains(&profile.role) => {}
            _ => return GuardDecision::RedirectToDashboard,
        }
    }
    GuardDecision::Allow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Profile, Role, Session, User};

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            email: Some(format!("{id}@example.com")),
        }
    }

    fn session(id: &str) -> Session {
        Session {
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            expires_at: None,
            user: user(id),
        }
    }

    fn profile(user_id: &str, role: Role) -> Profile {
        Profile {
            id: format!("p-{user_id}"),
            user_id: user_id.to_string(),
            role,
            first_name: None,
            last_name: None,
            email: None,
        }
    }

    fn signed_in(role: Option<Role>) -> AuthState {
        AuthState {
            session: Some(session("u1")),
            user: Some(user("u1")),
            profile: role.map(|r| profile("u1", r)),
            loading: false,
        }
    }

    #[test]
    fn loading_blocks_all_decisions() {
        let state = AuthState {
            loading: true,
            ..signed_in(Some(Role::Borrower))
        };
        assert_eq!(evaluate(&state, &Route::Dashboard), GuardDecision::Loading);
        assert_eq!(evaluate(&state, &Route::Apply), GuardDecision::Loading);

        let anon = AuthState::default();
        assert!(anon.loading);
        assert_eq!(evaluate(&anon, &Route::Portfolio), GuardDecision::Loading);
    }

    #[test]
    fn public_routes_never_gate() {
        let anon = AuthState::default();
        for route in [Route::Landing, Route::Auth, Route::Faq, Route::Privacy] {
            assert_eq!(evaluate(&anon, &route), GuardDecision::Allow);
        }
    }

    #[test]
    fn unauthenticated_redirects_and_records_origin() {
        let state = AuthState {
            loading: false,
            ..AuthState::default()
        };
        assert_eq!(
            evaluate(&state, &Route::Apply),
            GuardDecision::RedirectToSignIn {
                from: "/apply".to_string()
            }
        );
        assert_eq!(
            evaluate(
                &state,
                &Route::Review {
                    application_id: "a1".to_string()
                }
            ),
            GuardDecision::RedirectToSignIn {
                from: "/review/a1".to_string()
            }
        );
    }

    #[test]
    fn wrong_role_redirects_to_dashboard() {
        let borrower = signed_in(Some(Role::Borrower));
        assert_eq!(
            evaluate(&borrower, &Route::Portfolio),
            GuardDecision::RedirectToDashboard
        );
        assert_eq!(evaluate(&borrower, &Route::Apply), GuardDecision::Allow);

        let lender = signed_in(Some(Role::Lender));
        assert_eq!(
            evaluate(&lender, &Route::Apply),
            GuardDecision::RedirectToDashboard
        );
        assert_eq!(evaluate(&lender, &Route::Portfolio), GuardDecision::Allow);
    }

    #[test]
    fn dashboard_allows_any_authenticated_role() {
        for role in [Role::Borrower, Role::Lender] {
            assert_eq!(
                evaluate(&signed_in(Some(role)), &Route::Dashboard),
                GuardDecision::Allow
            );
        }
    }

    #[test]
    fn missing_profile_fails_closed_on_role_restricted_routes() {
        let no_profile = signed_in(None);
        assert_eq!(
            evaluate(&no_profile, &Route::Apply),
            GuardDecision::RedirectToDashboard
        );
        // The dashboard itself has no role restriction, so there is no
        // redirect loop.
        assert_eq!(
            evaluate(&no_profile, &Route::Dashboard),
            GuardDecision::Allow
        );
    }
}
