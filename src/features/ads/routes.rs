use axum::{
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use tower_http::services::ServeDir;

use crate::features::ads::handlers::{
    delete_ad, list_active_ads, list_ads_by_pole, sweep_expired, update_ad_status, upload_ad,
    AdState,
};
use crate::modules::storage::UploadStager;

/// Create routes for the ads feature, including read-only serving of stored media
pub fn routes(state: AdState, stager: &UploadStager) -> Router {
    let body_limit = stager.max_file_size() + 1024 * 1024;

    // In-flight uploads live next to stored media under dot-prefixed names
    let media = Router::new()
        .nest_service(stager.public_prefix(), ServeDir::new(stager.root()))
        .layer(middleware::from_fn(hide_dotfiles));

    Router::new()
        .route(
            "/api/upload-ad",
            // Allow body size up to the file limit + buffer for multipart overhead
            post(upload_ad).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/ads", get(list_active_ads))
        .route("/api/ads/pole/{pole_type}", get(list_ads_by_pole))
        .route("/api/ads/{ad_id}/status", put(update_ad_status))
        .route("/api/ads/{ad_id}", axum::routing::delete(delete_ad))
        .route("/api/maintenance/sweep-expired", post(sweep_expired))
        .with_state(state)
        .merge(media)
}

/// 404 for any path segment naming a hidden file, plain or percent-encoded
async fn hide_dotfiles(request: Request, next: Next) -> Response {
    let hidden = request.uri().path().split('/').any(|segment| {
        segment.starts_with('.') || segment.to_ascii_lowercase().starts_with("%2e")
    });

    if hidden {
        return StatusCode::NOT_FOUND.into_response();
    }

    next.run(request).await
}
