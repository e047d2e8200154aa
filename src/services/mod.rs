//! Business logic services

pub mod auth;
pub mod books;
pub mod borrowing;
pub mod cache;

use crate::{
    config::{AuthConfig, CacheConfig},
    error::AppResult,
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: books::CatalogService,
    pub borrowing: borrowing::BorrowingService,
    pub cache: cache::CacheService,
}

impl Services {
    /// Create all services with the given repository
    pub async fn new(
        repository: Repository,
        auth_config: AuthConfig,
        cache_config: CacheConfig,
        cache_service: cache::CacheService,
    ) -> AppResult<Self> {
        Ok(Self {
            auth: auth::AuthService::new(
                repository.clone(),
                auth_config,
                cache_config.clone(),
                cache_service.clone(),
            ),
            catalog: books::CatalogService::new(
                repository.clone(),
                cache_config,
                cache_service.clone(),
            ),
            borrowing: borrowing::BorrowingService::new(repository, cache_service.clone()),
            cache: cache_service,
        })
    }
}
