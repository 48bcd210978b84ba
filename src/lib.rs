//! Library Lending Server
//!
//! REST JSON API for a lending library: a book catalog with genres and
//! authors, borrow/return bookkeeping on available copies, and reader reviews.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    /// Build the state over any store implementation
    pub fn new(config: AppConfig, store: Arc<dyn repository::Store>) -> Self {
        let services = services::Services::new(store, &config);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
