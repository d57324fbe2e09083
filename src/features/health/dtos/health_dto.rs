use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::shared::constants::{DEFAULT_DEBUG_LIMIT, MAX_DEBUG_LIMIT};

/// Overall health of the service and its dependencies
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatusDto {
    pub connected: bool,
    /// `healthy` or `unhealthy`
    #[schema(example = "healthy")]
    pub status: String,
    /// `connected` or `disconnected`
    #[schema(example = "connected")]
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_ads: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_ads: Option<i64>,
    pub upload_dir_writable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl HealthStatusDto {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Result of a database round-trip
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTestDto {
    pub connected: bool,
}

/// Query parameters for the debug contents listing
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct DebugContentsQuery {
    /// Number of rows (default: 10, max: 100)
    #[param(minimum = 1, maximum = 100)]
    pub limit: Option<i64>,
}

impl DebugContentsQuery {
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_DEBUG_LIMIT)
            .clamp(1, MAX_DEBUG_LIMIT)
    }
}
