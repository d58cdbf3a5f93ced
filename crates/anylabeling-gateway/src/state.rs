use std::sync::Arc;

use anylabeling_config::{ConcurrencyConfig, PerformanceConfig, SecurityConfig, Settings};

use crate::health::HealthReporter;
use crate::models::ModelRegistry;

/// Shared application state accessible from all request handlers.
pub struct AppState {
    settings: Arc<Settings>,
    pub health: HealthReporter,
}

impl AppState {
    pub fn new(settings: Arc<Settings>, registry: Arc<dyn ModelRegistry>) -> Self {
        Self {
            settings,
            health: HealthReporter::new(registry),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// API key, CORS and header settings for the routing layer to enforce.
    pub fn security(&self) -> &SecurityConfig {
        &self.settings.security
    }

    pub fn performance(&self) -> &PerformanceConfig {
        &self.settings.performance
    }

    pub fn concurrency(&self) -> &ConcurrencyConfig {
        &self.settings.concurrency
    }
}

pub type SharedState = Arc<AppState>;
