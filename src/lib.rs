pub mod applications;
pub mod assessments;
pub mod auth;
pub mod backend;
pub mod config;
pub mod events;
pub mod insights;
pub mod routes;
pub mod storage;

use std::sync::Arc;

use applications::ApplicationService;
use assessments::AssessmentService;
use auth::pending::PendingSignupCache;
use auth::AuthManager;
use backend::Backend;
use config::AppConfig;
use events::EventBroadcaster;
use storage::Storage;

/// Shared engine state handed to an embedding shell.
///
/// Explicitly constructed and dependency-injected — the backend is a trait
/// object so tests (and alternative deployments) can swap the hosted service
/// for a double.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub storage: Arc<Storage>,
    pub backend: Arc<dyn Backend>,
    pub broadcaster: Arc<EventBroadcaster>,
    pub auth: Arc<AuthManager>,
    pub applications: Arc<ApplicationService>,
    pub assessments: Arc<AssessmentService>,
}

impl AppContext {
    pub fn new(config: Arc<AppConfig>, storage: Arc<Storage>, backend: Arc<dyn Backend>) -> Self {
        let broadcaster = Arc::new(EventBroadcaster::new());
        let pending = PendingSignupCache::new(Arc::clone(&storage));
        let auth = Arc::new(AuthManager::new(
            Arc::clone(&backend),
            pending,
            Arc::clone(&broadcaster),
            config.site_url.clone(),
        ));
        let applications = Arc::new(ApplicationService::new(
            Arc::clone(&backend),
            Arc::clone(&storage),
            Arc::clone(&broadcaster),
        ));
        let assessments = Arc::new(AssessmentService::new(
            Arc::clone(&backend),
            Arc::clone(&broadcaster),
        ));
        Self {
            config,
            storage,
            backend,
            broadcaster,
            auth,
            applications,
            assessments,
        }
    }
}
