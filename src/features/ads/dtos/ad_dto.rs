use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::ads::models::{AdRecord, NewAd};
use crate::features::ads::workers::SweepReport;
use crate::shared::constants::{DEFAULT_ACTOR, SYSTEM_CLEANUP_ACTOR};
use crate::shared::validation::POLE_TYPE_REGEX;

/// Multipart form for uploading an advertisement (documentation only)
#[derive(Debug, ToSchema)]
#[schema(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct UploadAdDto {
    /// Image or video file. The field may also be named `file`.
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub ad_file: String,
    /// Pole identifier
    #[schema(example = "A1")]
    pub pole_type: String,
    /// RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` (UTC) or `YYYY-MM-DD` (midnight UTC)
    pub expiry_date: Option<String>,
    /// Defaults to `web-user`
    pub created_by: Option<String>,
}

/// Text fields of the upload form, collected from multipart parts
#[derive(Debug, Clone, Default, Validate)]
pub struct CreateAdForm {
    #[validate(
        length(min = 1, max = 50, message = "poleType must be 1-50 characters"),
        regex(
            path = *POLE_TYPE_REGEX,
            message = "poleType must start with a letter or digit and may only contain letters, digits, spaces, '.', '-' and '_'"
        )
    )]
    pub pole_type: String,

    pub expiry_date: Option<String>,

    #[validate(length(min = 1, max = 100, message = "createdBy must be 1-100 characters"))]
    pub created_by: Option<String>,
}

impl CreateAdForm {
    /// Validate the collected fields and build the record input
    pub fn into_new_ad(self) -> Result<NewAd> {
        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let created_by = self
            .created_by
            .unwrap_or_else(|| DEFAULT_ACTOR.to_string());
        ensure_not_reserved(&created_by)?;

        let expiry_date = match self.expiry_date.as_deref() {
            Some(raw) => parse_expiry_date(raw)?,
            None => None,
        };

        Ok(NewAd {
            pole_type: self.pole_type,
            created_by,
            expiry_date,
        })
    }
}

/// Request DTO for changing the active flag
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAdStatusDto {
    pub is_active: bool,

    /// Defaults to `web-user`
    #[validate(length(min = 1, max = 100, message = "updatedBy must be 1-100 characters"))]
    pub updated_by: Option<String>,
}

impl UpdateAdStatusDto {
    /// Acting user, validated against the reserved sweeper identity
    pub fn actor(&self) -> Result<String> {
        let actor = self
            .updated_by
            .clone()
            .unwrap_or_else(|| DEFAULT_ACTOR.to_string());
        ensure_not_reserved(&actor)?;
        Ok(actor)
    }
}

fn ensure_not_reserved(actor: &str) -> Result<()> {
    if actor.eq_ignore_ascii_case(SYSTEM_CLEANUP_ACTOR) {
        return Err(AppError::Validation(format!(
            "'{}' is reserved for automatic expiry",
            SYSTEM_CLEANUP_ACTOR
        )));
    }
    Ok(())
}

/// Parse an optional expiry date from a form value.
///
/// Empty input means "never expires". Values without an offset are UTC.
pub fn parse_expiry_date(raw: &str) -> Result<Option<DateTime<Utc>>> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Some(naive.and_utc()));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Some(midnight.and_utc()));
        }
    }

    Err(AppError::Validation(format!(
        "Invalid expiryDate '{}': expected RFC 3339, YYYY-MM-DDTHH:MM[:SS] or YYYY-MM-DD",
        value
    )))
}

/// Response DTO for an advertisement record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdResponseDto {
    pub id: Uuid,
    pub pole_type: String,
    /// Storage-relative path, e.g. `/uploads/<name>`
    pub image_path: String,
    /// Absolute URL of the media file
    pub image_url: String,
    pub is_active: bool,
    pub expiry_date: Option<DateTime<Utc>>,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl AdResponseDto {
    pub fn from_record(record: AdRecord, base_url: &str) -> Self {
        Self {
            image_url: absolute_url(base_url, &record.image_path),
            id: record.id,
            pole_type: record.pole_type,
            image_path: record.image_path,
            is_active: record.is_active,
            expiry_date: record.expiry_date,
            created_date: record.created_date,
            updated_date: record.updated_date,
            created_by: record.created_by,
            updated_by: record.updated_by,
        }
    }
}

/// Response DTO for a completed upload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadAdResponseDto {
    #[serde(flatten)]
    pub ad: AdResponseDto,
    /// Same as `imageUrl`
    pub file_url: String,
    /// Generated name of the stored file
    pub file_name: String,
}

impl UploadAdResponseDto {
    pub fn new(record: AdRecord, file_name: String, base_url: &str) -> Self {
        let ad = AdResponseDto::from_record(record, base_url);
        Self {
            file_url: ad.image_url.clone(),
            file_name,
            ad,
        }
    }
}

fn absolute_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Response DTO for one sweep pass
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SweepReportDto {
    pub scanned: usize,
    pub deactivated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl From<SweepReport> for SweepReportDto {
    fn from(report: SweepReport) -> Self {
        Self {
            scanned: report.scanned,
            deactivated: report.deactivated,
            skipped: report.skipped,
            failed: report.failed,
        }
    }
}
