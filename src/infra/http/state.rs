use std::sync::Arc;

use async_trait::async_trait;

use crate::application::admin::AdminContentService;
use crate::application::catalog::CatalogService;
use crate::application::interactions::InteractionService;
use crate::application::repos::UsersRepo;

use super::rate_limit::RateLimiter;

/// Liveness probe for the storage backend.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn healthy(&self) -> bool;
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub interactions: Arc<InteractionService>,
    pub admin: Arc<AdminContentService>,
    pub users: Arc<dyn UsersRepo>,
    pub health: Arc<dyn HealthCheck>,
    pub rate_limiter: Arc<RateLimiter>,
}
