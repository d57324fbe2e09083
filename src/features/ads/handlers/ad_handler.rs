use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, RequestOrigin};
use crate::features::ads::dtos::{
    AdResponseDto, CreateAdForm, SweepReportDto, UpdateAdStatusDto, UploadAdDto,
    UploadAdResponseDto,
};
use crate::features::ads::services::AdLifecycleService;
use crate::features::ads::workers::ExpirySweeper;
use crate::modules::storage::StagedFile;
use crate::shared::types::{ApiResponse, Meta};

/// State for ad handlers
#[derive(Clone)]
pub struct AdState {
    pub service: Arc<AdLifecycleService>,
    pub sweeper: Arc<ExpirySweeper>,
    /// Overrides the request origin when building absolute URLs
    pub public_base_url: Option<String>,
}

impl AdState {
    fn base_url(&self, origin: RequestOrigin) -> String {
        origin.base_url(self.public_base_url.as_deref())
    }
}

/// Text parts of the upload form as they arrived
#[derive(Debug, Default)]
struct UploadFields {
    pole_type: Option<String>,
    expiry_date: Option<String>,
    created_by: Option<String>,
}

impl UploadFields {
    fn into_form(self) -> Result<CreateAdForm> {
        let pole_type = self
            .pole_type
            .ok_or_else(|| AppError::Validation("poleType is required".to_string()))?;

        Ok(CreateAdForm {
            pole_type,
            expiry_date: self.expiry_date,
            created_by: self.created_by,
        })
    }
}

/// Non-empty trimmed text of a form part
fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Read every multipart part, streaming the file part to storage as it arrives.
///
/// The staged file is reported through `staged` even when a later part fails,
/// so the caller can discard it.
async fn read_upload(
    service: &AdLifecycleService,
    multipart: &mut Multipart,
    staged: &mut Option<StagedFile>,
) -> Result<UploadFields> {
    let mut fields = UploadFields::default();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "adFile" | "file" => {
                if staged.is_some() {
                    return Err(AppError::BadRequest(
                        "Only one file may be uploaded per request".to_string(),
                    ));
                }

                let file_name = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().map(str::to_string);

                *staged = Some(
                    service
                        .stage_upload(field, &file_name, content_type.as_deref())
                        .await?,
                );
            }
            "poleType" => fields.pole_type = non_empty(field.text().await?),
            "expiryDate" => fields.expiry_date = non_empty(field.text().await?),
            "createdBy" => fields.created_by = non_empty(field.text().await?),
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    Ok(fields)
}

/// Upload an advertisement
///
/// Accepts multipart/form-data with:
/// - `adFile` (or `file`): image or video, required
/// - `poleType`: pole identifier, required
/// - `expiryDate`: optional; the ad is deactivated automatically afterwards
/// - `createdBy`: optional, defaults to `web-user`
#[utoipa::path(
    post,
    path = "/api/upload-ad",
    tag = "ads",
    request_body(
        content = UploadAdDto,
        content_type = "multipart/form-data",
        description = "Media file plus pole and expiry fields",
    ),
    responses(
        (status = 200, description = "Ad uploaded", body = ApiResponse<UploadAdResponseDto>),
        (status = 400, description = "No file, disallowed media type, invalid field or file too large"),
        (status = 500, description = "Storage or database failure")
    )
)]
pub async fn upload_ad(
    State(state): State<AdState>,
    origin: RequestOrigin,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadAdResponseDto>>> {
    let mut staged: Option<StagedFile> = None;

    let fields = match read_upload(&state.service, &mut multipart, &mut staged).await {
        Ok(fields) => fields,
        Err(err) => {
            if let Some(staged) = staged.as_ref() {
                state.service.discard_upload(staged, &err.to_string()).await;
            }
            return Err(err);
        }
    };

    let staged = staged.ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

    let new_ad = match fields.into_form().and_then(CreateAdForm::into_new_ad) {
        Ok(new_ad) => new_ad,
        Err(err) => {
            state.service.discard_upload(&staged, &err.to_string()).await;
            return Err(err);
        }
    };

    let file_name = staged.generated_name.clone();
    let record = state.service.commit_upload(staged, new_ad).await?;

    let dto = UploadAdResponseDto::new(record, file_name, &state.base_url(origin));
    Ok(Json(ApiResponse::success(
        Some(dto),
        Some("Ad uploaded successfully".to_string()),
        None,
    )))
}

/// List ads for a pole, newest first
#[utoipa::path(
    get,
    path = "/api/ads/pole/{poleType}",
    tag = "ads",
    params(
        ("poleType" = String, Path, description = "Pole identifier")
    ),
    responses(
        (status = 200, description = "Ads for the pole", body = ApiResponse<Vec<AdResponseDto>>)
    )
)]
pub async fn list_ads_by_pole(
    State(state): State<AdState>,
    origin: RequestOrigin,
    Path(pole_type): Path<String>,
) -> Result<Json<ApiResponse<Vec<AdResponseDto>>>> {
    let records = state.service.list_by_pole(&pole_type).await?;
    let base_url = state.base_url(origin);

    let dtos: Vec<AdResponseDto> = records
        .into_iter()
        .map(|r| AdResponseDto::from_record(r, &base_url))
        .collect();
    let meta = Meta::total(dtos.len());

    Ok(Json(ApiResponse::success(Some(dtos), None, Some(meta))))
}

/// List all active ads, newest first
#[utoipa::path(
    get,
    path = "/api/ads",
    tag = "ads",
    responses(
        (status = 200, description = "Active ads", body = ApiResponse<Vec<AdResponseDto>>)
    )
)]
pub async fn list_active_ads(
    State(state): State<AdState>,
    origin: RequestOrigin,
) -> Result<Json<ApiResponse<Vec<AdResponseDto>>>> {
    let records = state.service.list_active().await?;
    let base_url = state.base_url(origin);

    let dtos: Vec<AdResponseDto> = records
        .into_iter()
        .map(|r| AdResponseDto::from_record(r, &base_url))
        .collect();
    let meta = Meta::total(dtos.len());

    Ok(Json(ApiResponse::success(Some(dtos), None, Some(meta))))
}

/// Activate or deactivate an ad
#[utoipa::path(
    put,
    path = "/api/ads/{adId}/status",
    tag = "ads",
    params(
        ("adId" = Uuid, Path, description = "Ad ID")
    ),
    request_body = UpdateAdStatusDto,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<AdResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Ad not found")
    )
)]
pub async fn update_ad_status(
    State(state): State<AdState>,
    origin: RequestOrigin,
    Path(ad_id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateAdStatusDto>,
) -> Result<Json<ApiResponse<AdResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let actor = dto.actor()?;

    let record = state
        .service
        .update_status(ad_id, dto.is_active, &actor)
        .await?;

    Ok(Json(ApiResponse::success(
        Some(AdResponseDto::from_record(record, &state.base_url(origin))),
        Some("Ad status updated".to_string()),
        None,
    )))
}

/// Delete an ad and its media file
#[utoipa::path(
    delete,
    path = "/api/ads/{adId}",
    tag = "ads",
    params(
        ("adId" = Uuid, Path, description = "Ad ID")
    ),
    responses(
        (status = 200, description = "Ad deleted", body = ApiResponse<AdResponseDto>),
        (status = 404, description = "Ad not found")
    )
)]
pub async fn delete_ad(
    State(state): State<AdState>,
    origin: RequestOrigin,
    Path(ad_id): Path<Uuid>,
) -> Result<Json<ApiResponse<AdResponseDto>>> {
    let outcome = state.service.delete_ad(ad_id).await?;

    let message = if outcome.file_cleanup.is_failed() {
        "Ad deleted; its media file could not be removed"
    } else {
        "Ad deleted successfully"
    };

    Ok(Json(ApiResponse::success(
        Some(AdResponseDto::from_record(
            outcome.record,
            &state.base_url(origin),
        )),
        Some(message.to_string()),
        None,
    )))
}

/// Run one expiry sweep now
#[utoipa::path(
    post,
    path = "/api/maintenance/sweep-expired",
    tag = "maintenance",
    responses(
        (status = 200, description = "Sweep finished", body = ApiResponse<SweepReportDto>),
        (status = 500, description = "Expired ads could not be selected")
    )
)]
pub async fn sweep_expired(
    State(state): State<AdState>,
) -> Result<Json<ApiResponse<SweepReportDto>>> {
    let report = state.sweeper.sweep_once(Utc::now()).await?;

    Ok(Json(ApiResponse::success(
        Some(report.into()),
        Some(format!("Deactivated {} expired ads", report.deactivated)),
        None,
    )))
}
