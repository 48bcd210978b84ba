//! Business logic services

pub mod auth;
pub mod catalog;
pub mod lending;

use std::sync::Arc;

use crate::{config::AppConfig, repository::Store};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn Store>,
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub lending: lending::LendingService,
}

impl Services {
    /// Create all services over the given store
    pub fn new(store: Arc<dyn Store>, config: &AppConfig) -> Self {
        Self {
            auth: auth::AuthService::new(store.clone(), config.auth.clone()),
            catalog: catalog::CatalogService::new(store.clone()),
            lending: lending::LendingService::new(store.clone(), config.lending.clone()),
            store,
        }
    }
}
