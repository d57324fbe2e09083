//! Test doubles shared by unit tests across features

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::core::config::StorageConfig;
use crate::core::error::{AppError, Result};
use crate::features::ads::models::{AdRecord, AdStats, NewAd};
use crate::features::ads::repositories::AdRepository;
use crate::modules::storage::UploadStager;
use crate::shared::constants::SYSTEM_CLEANUP_ACTOR;

/// Manual status change applied right after the next expiry selection,
/// simulating an operator racing the sweeper
#[derive(Debug, Clone)]
pub struct PendingStatusChange {
    pub id: Uuid,
    pub is_active: bool,
    pub updated_by: String,
}

/// In-memory `AdRepository` honoring the same conditional semantics as the
/// Postgres implementation
#[derive(Default)]
pub struct InMemoryAdRepository {
    rows: Mutex<Vec<AdRecord>>,
    fail_creates: AtomicBool,
    fail_deletes: AtomicBool,
    unavailable: AtomicBool,
    writes: AtomicUsize,
    after_select: Mutex<Option<PendingStatusChange>>,
}

#[allow(dead_code)]
impl InMemoryAdRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `create` fails with a database error
    pub fn failing_creates() -> Self {
        let repo = Self::default();
        repo.fail_creates.store(true, Ordering::SeqCst);
        repo
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Every operation fails as if the database were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn race_next_sweep_with(&self, change: PendingStatusChange) {
        *self.after_select.lock().unwrap() = Some(change);
    }

    /// Insert a fully specified row, bypassing `create`
    pub fn seed(&self, record: AdRecord) {
        self.rows.lock().unwrap().push(record);
    }

    pub fn get(&self, id: Uuid) -> Option<AdRecord> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Number of statements that modified a row
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn apply_status(
        rows: &mut [AdRecord],
        id: Uuid,
        is_active: bool,
        updated_by: &str,
    ) -> Option<(AdRecord, bool)> {
        let row = rows.iter_mut().find(|r| r.id == id)?;
        if row.is_active == is_active {
            return Some((row.clone(), false));
        }
        row.is_active = is_active;
        row.updated_by = updated_by.to_string();
        row.updated_date = Utc::now();
        Some((row.clone(), true))
    }

    fn newest_first(mut records: Vec<AdRecord>) -> Vec<AdRecord> {
        records.sort_by(|a, b| b.created_date.cmp(&a.created_date));
        records
    }
}

#[async_trait]
impl AdRepository for InMemoryAdRepository {
    async fn create(&self, new_ad: &NewAd, image_path: &str) -> Result<AdRecord> {
        self.check_available()?;
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::Protocol(
                "simulated insert failure".to_string(),
            )));
        }

        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.image_path == image_path) {
            return Err(AppError::Database(sqlx::Error::Protocol(
                "duplicate image_path".to_string(),
            )));
        }

        let now = Utc::now();
        let record = AdRecord {
            id: Uuid::now_v7(),
            pole_type: new_ad.pole_type.clone(),
            image_path: image_path.to_string(),
            is_active: true,
            expiry_date: new_ad.expiry_date,
            created_date: now,
            updated_date: now,
            created_by: new_ad.created_by.clone(),
            updated_by: new_ad.created_by.clone(),
        };
        rows.push(record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    async fn get_by_pole(&self, pole_type: &str) -> Result<Vec<AdRecord>> {
        self.check_available()?;
        let rows = self.rows.lock().unwrap();
        Ok(Self::newest_first(
            rows.iter()
                .filter(|r| r.pole_type == pole_type)
                .cloned()
                .collect(),
        ))
    }

    async fn get_all_active(&self) -> Result<Vec<AdRecord>> {
        self.check_available()?;
        let rows = self.rows.lock().unwrap();
        Ok(Self::newest_first(
            rows.iter().filter(|r| r.is_active).cloned().collect(),
        ))
    }

    async fn update_status(
        &self,
        id: Uuid,
        is_active: bool,
        updated_by: &str,
    ) -> Result<AdRecord> {
        self.check_available()?;
        let mut rows = self.rows.lock().unwrap();
        let (record, changed) = Self::apply_status(&mut rows, id, is_active, updated_by)
            .ok_or_else(|| AppError::NotFound(format!("Ad {} not found", id)))?;
        if changed {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(record)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<AdRecord> {
        self.check_available()?;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::Protocol(
                "simulated delete failure".to_string(),
            )));
        }

        let mut rows = self.rows.lock().unwrap();
        let index = rows
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Ad {} not found", id)))?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(rows.remove(index))
    }

    async fn find_expired_active(&self, now: DateTime<Utc>) -> Result<Vec<AdRecord>> {
        self.check_available()?;
        let selected: Vec<AdRecord> = {
            let rows = self.rows.lock().unwrap();
            rows.iter()
                .filter(|r| r.is_active && r.is_expired_at(now))
                .cloned()
                .collect()
        };

        let pending = self.after_select.lock().unwrap().take();
        if let Some(change) = pending {
            let mut rows = self.rows.lock().unwrap();
            if let Some((_, true)) =
                Self::apply_status(&mut rows, change.id, change.is_active, &change.updated_by)
            {
                self.writes.fetch_add(1, Ordering::SeqCst);
            }
        }

        Ok(selected)
    }

    async fn deactivate_if_expired_and_active(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.check_available()?;
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        if !row.is_active || !row.is_expired_at(now) {
            return Ok(false);
        }

        row.is_active = false;
        row.updated_by = SYSTEM_CLEANUP_ACTOR.to_string();
        row.updated_date = Utc::now();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn stats(&self) -> Result<AdStats> {
        self.check_available()?;
        let rows = self.rows.lock().unwrap();
        Ok(AdStats {
            total: rows.len() as i64,
            active: rows.iter().filter(|r| r.is_active).count() as i64,
        })
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<AdRecord>> {
        self.check_available()?;
        let rows = self.rows.lock().unwrap().clone();
        Ok(Self::newest_first(rows)
            .into_iter()
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        self.check_available()
    }
}

/// Build a record with sensible defaults for seeding
pub fn ad_record(pole_type: &str, expiry_date: Option<DateTime<Utc>>) -> AdRecord {
    let now = Utc::now();
    AdRecord {
        id: Uuid::now_v7(),
        pole_type: pole_type.to_string(),
        image_path: format!("/uploads/{}-{}.png", Uuid::new_v4(), now.timestamp_millis()),
        is_active: true,
        expiry_date,
        created_date: now,
        updated_date: now,
        created_by: "web-user".to_string(),
        updated_by: "web-user".to_string(),
    }
}

/// Stager rooted in a test directory with a 1 MiB limit
pub async fn test_stager(dir: &Path) -> Arc<UploadStager> {
    Arc::new(
        UploadStager::new(&StorageConfig {
            upload_dir: dir.to_path_buf(),
            public_prefix: "/uploads".to_string(),
            max_file_size: 1024 * 1024,
        })
        .await
        .unwrap(),
    )
}

/// Number of entries in a storage directory
pub fn stored_file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
