use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for one advertisement placed on a pole
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AdRecord {
    pub id: Uuid,
    pub pole_type: String,
    /// Storage-relative public path of the media file, e.g. `/uploads/<name>`
    pub image_path: String,
    pub is_active: bool,
    /// `None` means the ad never expires on its own
    pub expiry_date: Option<DateTime<Utc>>,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl AdRecord {
    #[cfg(test)]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry <= now)
    }
}

/// Fields supplied by the caller when creating a record
#[derive(Debug, Clone)]
pub struct NewAd {
    pub pole_type: String,
    pub created_by: String,
    pub expiry_date: Option<DateTime<Utc>>,
}

/// Row counts reported by health checks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdStats {
    pub total: i64,
    pub active: i64,
}
