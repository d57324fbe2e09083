use chrono::Utc;
use std::sync::Arc;

use crate::core::error::Result;
use crate::features::ads::models::AdRecord;
use crate::features::ads::repositories::AdRepository;
use crate::features::health::dtos::HealthStatusDto;
use crate::modules::storage::UploadStager;

/// Probes the database and the upload directory
pub struct HealthService {
    repository: Arc<dyn AdRepository>,
    stager: Arc<UploadStager>,
}

impl HealthService {
    pub fn new(repository: Arc<dyn AdRepository>, stager: Arc<UploadStager>) -> Self {
        Self { repository, stager }
    }

    /// Never fails; problems are reported in the returned status
    pub async fn check(&self) -> HealthStatusDto {
        let upload_dir_writable = self.stager.probe_writable().await;
        let stats = self.repository.stats().await;

        let (connected, total_ads, active_ads, error) = match stats {
            Ok(stats) => (true, Some(stats.total), Some(stats.active), None),
            Err(e) => {
                tracing::warn!("Health check database probe failed: {}", e);
                (false, None, None, Some(e.to_string()))
            }
        };

        let error = error.or_else(|| {
            (!upload_dir_writable).then(|| {
                format!(
                    "Upload directory {} is not writable",
                    self.stager.root().display()
                )
            })
        });
        let healthy = connected && upload_dir_writable;

        HealthStatusDto {
            connected,
            status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
            database: if connected { "connected" } else { "disconnected" }.to_string(),
            total_ads,
            active_ads,
            upload_dir_writable,
            error,
            timestamp: Utc::now(),
        }
    }

    /// Whether a database round-trip succeeds
    pub async fn test_connection(&self) -> bool {
        match self.repository.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Database connection test failed: {}", e);
                false
            }
        }
    }

    pub async fn recent_contents(&self, limit: i64) -> Result<Vec<AdRecord>> {
        self.repository.list_recent(limit).await
    }
}
