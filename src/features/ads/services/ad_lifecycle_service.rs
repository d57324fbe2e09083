use axum::body::Bytes;
use futures::Stream;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::ads::models::{AdRecord, NewAd};
use crate::features::ads::repositories::AdRepository;
use crate::modules::storage::{RemoveOutcome, StagedFile, UploadStager};

/// Outcome of removing a file as a saga's corrective or trailing step.
///
/// Never escalated to the caller; failures are logged as warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    Removed,
    AlreadyGone,
    Failed(String),
}

impl Compensation {
    pub fn is_failed(&self) -> bool {
        matches!(self, Compensation::Failed(_))
    }

    fn log(&self, step: &str, public_path: &str) {
        match self {
            Compensation::Removed => info!("{}: removed {}", step, public_path),
            Compensation::AlreadyGone => {
                warn!("{}: {} was already missing", step, public_path)
            }
            Compensation::Failed(reason) => warn!(
                "{}: could not remove {}, file is orphaned: {}",
                step, public_path, reason
            ),
        }
    }
}

/// Result of the delete saga: the record is gone; the file cleanup outcome
/// is informational
#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    pub record: AdRecord,
    pub file_cleanup: Compensation,
}

/// Coordinates the media file and its database record.
///
/// No transaction spans both resources, so create and delete run as two-step
/// sagas:
/// - create: stage file, then insert record; a failed insert removes the file
/// - delete: delete record, then remove file; a failed removal only leaks the file
pub struct AdLifecycleService {
    repository: Arc<dyn AdRepository>,
    stager: Arc<UploadStager>,
}

impl AdLifecycleService {
    pub fn new(repository: Arc<dyn AdRepository>, stager: Arc<UploadStager>) -> Self {
        Self { repository, stager }
    }

    #[cfg(test)]
    pub fn max_file_size(&self) -> usize {
        self.stager.max_file_size()
    }

    /// Create saga in one call: stage the upload, then commit the record
    #[cfg(test)]
    pub async fn create_ad<S, E>(
        &self,
        upload: S,
        declared_filename: &str,
        declared_mime: Option<&str>,
        new_ad: NewAd,
    ) -> Result<AdRecord>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        AppError: From<E>,
    {
        let staged = self
            .stage_upload(upload, declared_filename, declared_mime)
            .await?;
        self.commit_upload(staged, new_ad).await
    }

    /// Step 1 of the create saga. On failure nothing exists to compensate.
    pub async fn stage_upload<S, E>(
        &self,
        upload: S,
        declared_filename: &str,
        declared_mime: Option<&str>,
    ) -> Result<StagedFile>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        AppError: From<E>,
    {
        self.stager
            .stage(
                upload,
                declared_filename,
                declared_mime,
                self.stager.max_file_size(),
            )
            .await
    }

    /// Step 2 of the create saga: insert the record referencing `staged`.
    ///
    /// If the insert fails the staged file is removed and the insert error
    /// is returned unchanged.
    pub async fn commit_upload(&self, staged: StagedFile, new_ad: NewAd) -> Result<AdRecord> {
        match self.repository.create(&new_ad, &staged.public_path).await {
            Ok(record) => {
                info!(
                    "Ad created: id={}, pole={}, file={}",
                    record.id, record.pole_type, record.image_path
                );
                Ok(record)
            }
            Err(err) => {
                warn!(
                    "Record creation failed for {}, rolling back staged file: {}",
                    staged.public_path, err
                );
                self.remove_file(&staged.public_path)
                    .await
                    .log("create rollback", &staged.public_path);
                Err(err)
            }
        }
    }

    /// Abandon a staged file whose request was rejected before commit
    pub async fn discard_upload(&self, staged: &StagedFile, reason: &str) -> Compensation {
        info!("Discarding staged upload {}: {}", staged.public_path, reason);
        let outcome = self.remove_file(&staged.public_path).await;
        outcome.log("discard", &staged.public_path);
        outcome
    }

    pub async fn list_by_pole(&self, pole_type: &str) -> Result<Vec<AdRecord>> {
        self.repository.get_by_pole(pole_type).await
    }

    pub async fn list_active(&self) -> Result<Vec<AdRecord>> {
        self.repository.get_all_active().await
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        is_active: bool,
        updated_by: &str,
    ) -> Result<AdRecord> {
        let record = self
            .repository
            .update_status(id, is_active, updated_by)
            .await?;
        info!(
            "Ad status: id={}, is_active={}, updated_by={}",
            record.id, record.is_active, record.updated_by
        );
        Ok(record)
    }

    /// Delete saga: the record goes first, then its file.
    ///
    /// A failed record deletion leaves everything untouched. Once the record
    /// is gone the operation succeeds whatever happens to the file.
    pub async fn delete_ad(&self, id: Uuid) -> Result<DeleteOutcome> {
        let record = self.repository.delete_by_id(id).await?;

        let file_cleanup = self.remove_file(&record.image_path).await;
        file_cleanup.log("delete", &record.image_path);

        info!("Ad deleted: id={}, pole={}", record.id, record.pole_type);

        Ok(DeleteOutcome {
            record,
            file_cleanup,
        })
    }

    async fn remove_file(&self, public_path: &str) -> Compensation {
        match self.stager.remove(public_path).await {
            Ok(RemoveOutcome::Removed) => Compensation::Removed,
            Ok(RemoveOutcome::AlreadyGone) => Compensation::AlreadyGone,
            Err(e) => Compensation::Failed(e.to_string()),
        }
    }
}
