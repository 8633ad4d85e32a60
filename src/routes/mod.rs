//! Route surface: public pages, protected views, and their role
//! restrictions.

pub mod guard;

use crate::backend::Role;

/// Every navigable view in the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Landing,
    Auth,
    ResetPassword,
    Contact,
    About,
    Privacy,
    Faq,
    /// Loan application wizard.
    Apply,
    /// Role-branched dashboard (borrower or lender view).
    Dashboard,
    /// Lender review of a single application.
    Review { application_id: String },
    /// Lender portfolio analytics.
    Portfolio,
    NotFound { path: String },
}

impl Route {
    /// Resolve a request path to a route. Trailing slashes are tolerated;
    /// anything unrecognized is `NotFound`.
    pub fn parse(path: &str) -> Route {
        let trimmed = path.trim_end_matches('/');
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed };
        match trimmed {
            "/" => Route::Landing,
            "/auth" => Route::Auth,
            "/reset-password" => Route::ResetPassword,
            "/contact" => Route::Contact,
            "/about" => Route::About,
            "/privacy" => Route::Privacy,
            "/faq" => Route::Faq,
            "/apply" => Route::Apply,
            "/dashboard" => Route::Dashboard,
            "/portfolio" => Route::Portfolio,
            _ => match trimmed.strip_prefix("/review/") {
                Some(id) if !id.is_empty() && !id.contains('/') => Route::Review {
                    application_id: id.to_string(),
                },
                _ => Route::NotFound {
                    path: path.to_string(),
                },
            },
        }
    }

    /// Canonical path for this route.
    pub fn path(&self) -> String {
        match self {
            Route::Landing => "/".to_string(),
            Route::Auth => "/auth".to_string(),
            Route::ResetPassword => "/reset-password".to_string(),
            Route::Contact => "/contact".to_string(),
            Route::About => "/about".to_string(),
            Route::Privacy => "/privacy".to_string(),
            Route::Faq => "/faq".to_string(),
            Route::Apply => "/apply".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Review { application_id } => format!("/review/{application_id}"),
            Route::Portfolio => "/portfolio".to_string(),
            Route::NotFound { path } => path.clone(),
        }
    }

    /// Whether the route sits behind authentication at all.
    pub fn requires_auth(&self) -> bool {
        matches!(
            self,
            Route::Apply | Route::Dashboard | Route::Review { .. } | Route::Portfolio
        )
    }

    /// Role restriction, if any. None means any authenticated role.
    pub fn allowed_roles(&self) -> Option<&'static [Role]> {
        match self {
            Route::Apply => Some(&[Role::Borrower]),
            Route::Review { .. } | Route::Portfolio => Some(&[Role::Lender]),
            _ => None,
        }
    }
}
