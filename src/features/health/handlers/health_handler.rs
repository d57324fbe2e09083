use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::core::error::Result;
use crate::core::extractor::RequestOrigin;
use crate::features::ads::dtos::AdResponseDto;
use crate::features::health::dtos::{ConnectionTestDto, DebugContentsQuery, HealthStatusDto};
use crate::features::health::services::HealthService;
use crate::shared::types::{ApiResponse, Meta};

/// State for health handlers
#[derive(Clone)]
pub struct HealthState {
    pub service: Arc<HealthService>,
    pub public_base_url: Option<String>,
}

/// Liveness probe
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Database and storage health
///
/// Always answers with a structured body; the status code tells healthy from unhealthy.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service healthy", body = ApiResponse<HealthStatusDto>),
        (status = 503, description = "Database or upload directory unavailable", body = ApiResponse<HealthStatusDto>)
    )
)]
pub async fn health(
    State(state): State<HealthState>,
) -> (StatusCode, Json<ApiResponse<HealthStatusDto>>) {
    let status = state.service.check().await;

    if status.is_healthy() {
        (
            StatusCode::OK,
            Json(ApiResponse::success(Some(status), None, None)),
        )
    } else {
        let errors = status.error.clone().map(|e| vec![e]);
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse {
                success: false,
                data: Some(status),
                message: Some("Service unhealthy".to_string()),
                meta: None,
                errors,
            }),
        )
    }
}

/// Check database connectivity
#[utoipa::path(
    get,
    path = "/api/test-connection",
    tag = "health",
    responses(
        (status = 200, description = "Connectivity result", body = ApiResponse<ConnectionTestDto>)
    )
)]
pub async fn test_connection(
    State(state): State<HealthState>,
) -> Json<ApiResponse<ConnectionTestDto>> {
    let connected = state.service.test_connection().await;
    let message = if connected {
        "Database connected successfully!"
    } else {
        "Database connection failed!"
    };

    Json(ApiResponse {
        success: connected,
        data: Some(ConnectionTestDto { connected }),
        message: Some(message.to_string()),
        meta: None,
        errors: None,
    })
}

/// Most recently created ads, active or not
#[utoipa::path(
    get,
    path = "/api/debug/contents",
    tag = "health",
    params(DebugContentsQuery),
    responses(
        (status = 200, description = "Recent ads", body = ApiResponse<Vec<AdResponseDto>>)
    )
)]
pub async fn debug_contents(
    State(state): State<HealthState>,
    origin: RequestOrigin,
    Query(query): Query<DebugContentsQuery>,
) -> Result<Json<ApiResponse<Vec<AdResponseDto>>>> {
    let records = state
        .service
        .recent_contents(query.effective_limit())
        .await?;
    let base_url = origin.base_url(state.public_base_url.as_deref());

    let dtos: Vec<AdResponseDto> = records
        .into_iter()
        .map(|r| AdResponseDto::from_record(r, &base_url))
        .collect();
    let meta = Meta::total(dtos.len());

    Ok(Json(ApiResponse::success(Some(dtos), None, Some(meta))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::health::routes;
    use crate::shared::test_helpers::{ad_record, test_stager, InMemoryAdRepository};
    use axum_test::TestServer;
    use serde_json::Value;

    async fn server(repo: Arc<InMemoryAdRepository>, dir: &std::path::Path) -> TestServer {
        let state = HealthState {
            service: Arc::new(HealthService::new(repo, test_stager(dir).await)),
            public_base_url: Some("https://cdn.example".to_string()),
        };
        TestServer::new(routes::routes(state)).unwrap()
    }

    #[tokio::test]
    async fn test_health_ok_and_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(InMemoryAdRepository::new());
        let server = server(repo.clone(), dir.path()).await;

        let response = server.get("/api/health").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["status"], "healthy");
        assert_eq!(body["data"]["totalAds"], 0);
        assert_eq!(body["data"]["uploadDirWritable"], true);

        repo.set_unavailable(true);
        let response = server.get("/api/health").await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["data"]["connected"], false);
        assert_eq!(body["data"]["status"], "unhealthy");
    }

    #[tokio::test]
    async fn test_connection_probe_always_answers() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(InMemoryAdRepository::new());
        let server = server(repo.clone(), dir.path()).await;

        let body: Value = server.get("/api/test-connection").await.json();
        assert_eq!(body["data"]["connected"], true);

        repo.set_unavailable(true);
        let response = server.get("/api/test-connection").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["data"]["connected"], false);
    }

    #[tokio::test]
    async fn test_debug_contents_uses_configured_base_url() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(InMemoryAdRepository::new());
        let record = ad_record("A1", None);
        repo.seed(record.clone());
        repo.seed(ad_record("B2", None));
        let server = server(repo, dir.path()).await;

        let body: Value = server.get("/api/debug/contents?limit=1").await.json();

        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0]["imageUrl"]
            .as_str()
            .unwrap()
            .starts_with("https://cdn.example/uploads/"));
    }

    #[tokio::test]
    async fn test_liveness() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(Arc::new(InMemoryAdRepository::new()), dir.path()).await;

        server.get("/health").await.assert_status_ok();
    }
}
