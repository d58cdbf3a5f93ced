use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ModelRegistry;

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub models_loaded: usize,
    /// RFC 3339 UTC timestamp with a `Z` suffix.
    pub timestamp: String,
}

/// Liveness probe. Reads the live model count on every call and never fails.
#[derive(Clone)]
pub struct HealthReporter {
    registry: Arc<dyn ModelRegistry>,
}

impl HealthReporter {
    pub fn new(registry: Arc<dyn ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn report(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy".to_string(),
            models_loaded: self.registry.loaded_count(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelCatalog;
    use chrono::DateTime;

    #[test]
    fn reports_healthy_with_model_count() {
        let catalog = Arc::new(ModelCatalog::new());
        for id in ["yolov8n", "sam2", "rtdetr"] {
            catalog.insert(id);
        }
        let reporter = HealthReporter::new(catalog);

        let status = reporter.report();
        assert_eq!(status.status, "healthy");
        assert_eq!(status.models_loaded, 3);
    }

    #[test]
    fn timestamp_is_utc_with_z_suffix() {
        let reporter = HealthReporter::new(Arc::new(ModelCatalog::new()));
        let status = reporter.report();

        assert!(status.timestamp.ends_with('Z'), "got {}", status.timestamp);
        assert!(!status.timestamp.contains("+00:00"));
        DateTime::parse_from_rfc3339(&status.timestamp).expect("timestamp should be RFC 3339");
    }

    #[test]
    fn count_is_read_live() {
        let catalog = Arc::new(ModelCatalog::new());
        let reporter = HealthReporter::new(catalog.clone());
        assert_eq!(reporter.report().models_loaded, 0);

        catalog.insert("yolov8n");
        assert_eq!(reporter.report().models_loaded, 1);

        catalog.remove(&"yolov8n".into());
        assert_eq!(reporter.report().models_loaded, 0);
    }

    #[test]
    fn serializes_to_expected_shape() {
        let status = HealthStatus {
            status: "healthy".into(),
            models_loaded: 3,
            timestamp: "2025-01-01T00:00:00.000000Z".into(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "healthy",
                "models_loaded": 3,
                "timestamp": "2025-01-01T00:00:00.000000Z",
            })
        );
    }
}
