use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::ads::models::{AdRecord, AdStats, NewAd};
use crate::shared::constants::SYSTEM_CLEANUP_ACTOR;

/// Persistence boundary for advertisement records.
///
/// Every method is a single atomic statement against `pole_images`; nothing
/// here touches the filesystem.
#[async_trait]
pub trait AdRepository: Send + Sync {
    /// Insert a new active record referencing an already staged file.
    async fn create(&self, new_ad: &NewAd, image_path: &str) -> Result<AdRecord>;

    /// All records for a pole, newest first.
    async fn get_by_pole(&self, pole_type: &str) -> Result<Vec<AdRecord>>;

    /// All records with `is_active = true`, newest first.
    async fn get_all_active(&self) -> Result<Vec<AdRecord>>;

    /// Set the active flag. A no-op transition leaves the row untouched and
    /// returns it as is.
    async fn update_status(&self, id: Uuid, is_active: bool, updated_by: &str)
        -> Result<AdRecord>;

    /// Delete a record and hand back its former contents.
    async fn delete_by_id(&self, id: Uuid) -> Result<AdRecord>;

    /// Active records whose expiry date is at or before `now`.
    async fn find_expired_active(&self, now: DateTime<Utc>) -> Result<Vec<AdRecord>>;

    /// Compare-and-set deactivation: only applies while the row is still
    /// active and expired. Returns whether the row changed.
    async fn deactivate_if_expired_and_active(&self, id: Uuid, now: DateTime<Utc>)
        -> Result<bool>;

    async fn stats(&self) -> Result<AdStats>;

    /// Most recently created records regardless of state.
    async fn list_recent(&self, limit: i64) -> Result<Vec<AdRecord>>;

    /// Round-trip to the backing store.
    async fn ping(&self) -> Result<()>;
}

/// PostgreSQL-backed repository
pub struct PgAdRepository {
    pool: PgPool,
}

impl PgAdRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdRepository for PgAdRepository {
    async fn create(&self, new_ad: &NewAd, image_path: &str) -> Result<AdRecord> {
        let record = sqlx::query_as::<_, AdRecord>(
            r#"
            INSERT INTO pole_images
                (id, pole_type, image_path, is_active, expiry_date,
                 created_date, updated_date, created_by, updated_by)
            VALUES ($1, $2, $3, TRUE, $4, NOW(), NOW(), $5, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&new_ad.pole_type)
        .bind(image_path)
        .bind(new_ad.expiry_date)
        .bind(&new_ad.created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get_by_pole(&self, pole_type: &str) -> Result<Vec<AdRecord>> {
        let records = sqlx::query_as::<_, AdRecord>(
            r#"
            SELECT * FROM pole_images
            WHERE pole_type = $1
            ORDER BY created_date DESC
            "#,
        )
        .bind(pole_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn get_all_active(&self) -> Result<Vec<AdRecord>> {
        let records = sqlx::query_as::<_, AdRecord>(
            r#"
            SELECT * FROM pole_images
            WHERE is_active = TRUE
            ORDER BY created_date DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn update_status(
        &self,
        id: Uuid,
        is_active: bool,
        updated_by: &str,
    ) -> Result<AdRecord> {
        let updated = sqlx::query_as::<_, AdRecord>(
            r#"
            UPDATE pole_images
            SET is_active = $2, updated_by = $3, updated_date = NOW()
            WHERE id = $1 AND is_active IS DISTINCT FROM $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(is_active)
        .bind(updated_by)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(record) = updated {
            return Ok(record);
        }

        // Either the target state already holds or the row does not exist
        sqlx::query_as::<_, AdRecord>("SELECT * FROM pole_images WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ad {} not found", id)))
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<AdRecord> {
        sqlx::query_as::<_, AdRecord>("DELETE FROM pole_images WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ad {} not found", id)))
    }

    async fn find_expired_active(&self, now: DateTime<Utc>) -> Result<Vec<AdRecord>> {
        let records = sqlx::query_as::<_, AdRecord>(
            r#"
            SELECT * FROM pole_images
            WHERE expiry_date IS NOT NULL AND expiry_date <= $1 AND is_active = TRUE
            ORDER BY expiry_date ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn deactivate_if_expired_and_active(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE pole_images
            SET is_active = FALSE, updated_by = $3, updated_date = NOW()
            WHERE id = $1
              AND is_active = TRUE
              AND expiry_date IS NOT NULL
              AND expiry_date <= $2
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(SYSTEM_CLEANUP_ACTOR)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn stats(&self) -> Result<AdStats> {
        let (total, active) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active = TRUE)
            FROM pole_images
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(AdStats { total, active })
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<AdRecord>> {
        let records = sqlx::query_as::<_, AdRecord>(
            "SELECT * FROM pole_images ORDER BY created_date DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
