//! Airtrack - airport equipment tracking server
//!
//! Keeps the inventory of CUTE, FIDS and Zamar equipment, binds it to
//! installations in the terminals, and groups equipment sent out for repair
//! into numbered repair batches. Exposed as a REST JSON API.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod lifecycle;
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
