use utoipa::{Modify, OpenApi};

use crate::features::ads::{dtos as ads_dtos, handlers as ads_handlers};
use crate::features::health::{dtos as health_dtos, handlers as health_handlers};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Ads
        ads_handlers::upload_ad,
        ads_handlers::list_ads_by_pole,
        ads_handlers::list_active_ads,
        ads_handlers::update_ad_status,
        ads_handlers::delete_ad,
        // Maintenance
        ads_handlers::sweep_expired,
        // Health
        health_handlers::health,
        health_handlers::test_connection,
        health_handlers::debug_contents,
    ),
    components(
        schemas(
            Meta,
            // Ads
            ads_dtos::UploadAdDto,
            ads_dtos::UpdateAdStatusDto,
            ads_dtos::AdResponseDto,
            ads_dtos::UploadAdResponseDto,
            ads_dtos::SweepReportDto,
            ApiResponse<ads_dtos::AdResponseDto>,
            ApiResponse<Vec<ads_dtos::AdResponseDto>>,
            ApiResponse<ads_dtos::UploadAdResponseDto>,
            ApiResponse<ads_dtos::SweepReportDto>,
            // Health
            health_dtos::HealthStatusDto,
            health_dtos::ConnectionTestDto,
            ApiResponse<health_dtos::HealthStatusDto>,
            ApiResponse<health_dtos::ConnectionTestDto>,
        )
    ),
    tags(
        (name = "ads", description = "Advertisement upload, listing, status and deletion"),
        (name = "maintenance", description = "Operator-triggered housekeeping"),
        (name = "health", description = "Health, connectivity and debug probes"),
    ),
    info(
        title = "SmartPole Ads API",
        version = "0.1.0",
        description = "API documentation for the SmartPole advertisement service",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
