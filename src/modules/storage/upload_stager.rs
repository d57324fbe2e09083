//! Local filesystem stager for uploaded advertisement media
//!
//! Files are written under a hidden temporary name, flushed to disk and only
//! then renamed to their final generated name, so readers never observe a
//! partially written file.

use axum::body::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::config::StorageConfig;
use crate::core::error::{AppError, Result};
use crate::modules::storage::media::{
    is_extension_allowed, is_mime_type_allowed, original_extension,
};

/// A file that has been durably written and is visible under its final name
#[derive(Debug, Clone)]
pub struct StagedFile {
    /// `<random-token>-<millis><original-extension>`
    pub generated_name: String,
    /// Absolute location on disk
    pub durable_path: PathBuf,
    /// Storage-relative path persisted on the record, e.g. `/uploads/<name>`
    pub public_path: String,
    pub size: u64,
}

/// Result of removing a staged file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    AlreadyGone,
}

pub struct UploadStager {
    root: PathBuf,
    public_prefix: String,
    max_file_size: usize,
}

impl UploadStager {
    /// Create the stager, making sure the storage directory exists
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        fs::create_dir_all(&config.upload_dir).await?;

        Ok(Self {
            root: config.upload_dir.clone(),
            public_prefix: config.public_prefix.clone(),
            max_file_size: config.max_file_size,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Validate and durably write an upload stream
    ///
    /// Rejects disallowed media before touching the disk. Aborts with
    /// `PayloadTooLarge` as soon as the stream exceeds `size_limit`, removing
    /// the temporary file.
    pub async fn stage<S, E>(
        &self,
        stream: S,
        declared_filename: &str,
        declared_mime: Option<&str>,
        size_limit: usize,
    ) -> Result<StagedFile>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        AppError: From<E>,
    {
        let extension = original_extension(declared_filename)
            .filter(|ext| is_extension_allowed(ext))
            .ok_or_else(|| {
                AppError::Validation("Only image and video files are allowed!".to_string())
            })?;

        if !is_mime_type_allowed(declared_mime) {
            return Err(AppError::Validation(
                "Only image and video files are allowed!".to_string(),
            ));
        }

        let generated_name = generate_file_name(&extension);
        let durable_path = self.root.join(&generated_name);
        let temp_path = self.root.join(format!(".{}.tmp", generated_name));

        let temp = TempUpload::new(temp_path);
        let written = write_stream(stream, temp.path(), size_limit).await?;

        fs::rename(temp.path(), &durable_path).await?;
        temp.persisted();

        info!(
            "Staged upload {} ({} bytes) from {}",
            generated_name, written, declared_filename
        );

        Ok(StagedFile {
            public_path: format!("{}/{}", self.public_prefix, generated_name),
            generated_name,
            durable_path,
            size: written,
        })
    }

    /// Remove a stored file by its public path; a missing file is not an error
    pub async fn remove(&self, public_path: &str) -> Result<RemoveOutcome> {
        let path = self.resolve(public_path)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed stored file: {}", path.display());
                Ok(RemoveOutcome::Removed)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RemoveOutcome::AlreadyGone),
            Err(e) => Err(e.into()),
        }
    }

    /// Map a stored public path to its location under the storage root
    ///
    /// Only a single plain filename directly under the prefix is accepted.
    pub fn resolve(&self, public_path: &str) -> Result<PathBuf> {
        let name = public_path
            .strip_prefix(&self.public_prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| {
                AppError::Validation(format!("Path is outside the upload area: {}", public_path))
            })?;

        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(file_name)), None) if !name.contains('\\') => {
                Ok(self.root.join(file_name))
            }
            _ => Err(AppError::Validation(format!(
                "Invalid stored file path: {}",
                public_path
            ))),
        }
    }

    /// Whether the storage directory currently accepts writes
    pub async fn probe_writable(&self) -> bool {
        let probe = self.root.join(format!(".probe-{}", Uuid::new_v4()));
        match fs::write(&probe, b"ok").await {
            Ok(()) => {
                let _ = fs::remove_file(&probe).await;
                true
            }
            Err(e) => {
                warn!("Upload directory {} is not writable: {}", self.root.display(), e);
                false
            }
        }
    }
}

/// Removes a temporary upload when dropped, unless it was renamed into place.
///
/// Covers both error returns and a `stage` future dropped mid-stream.
struct TempUpload {
    path: PathBuf,
    persisted: bool,
}

impl TempUpload {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            persisted: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn persisted(mut self) {
        self.persisted = true;
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed temporary upload {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove temporary upload {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// `<uuid-v4>-<unix-millis><extension>`
fn generate_file_name(extension: &str) -> String {
    format!(
        "{}-{}{}",
        Uuid::new_v4(),
        Utc::now().timestamp_millis(),
        extension
    )
}

/// Human-readable size limit: whole MB when at least 1 MiB, else KB or bytes
fn format_size(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * 1024;

    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else if bytes >= MIB {
        format!("{:.1}MB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{}KB", bytes / KIB)
    } else {
        format!("{} bytes", bytes)
    }
}

async fn write_stream<S, E>(stream: S, temp_path: &Path, size_limit: usize) -> Result<u64>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    AppError: From<E>,
{
    let mut stream = std::pin::pin!(stream);
    let mut file = fs::File::create(temp_path).await?;
    let mut written: usize = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if written + chunk.len() > size_limit {
            return Err(AppError::PayloadTooLarge(format!(
                "File too large. Maximum size is {}.",
                format_size(size_limit)
            )));
        }
        file.write_all(&chunk).await?;
        written += chunk.len();
    }

    // Data must be on disk before the rename makes it visible
    file.sync_all().await?;

    Ok(written as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    const LIMIT: usize = 1024 * 1024;

    async fn stager(dir: &Path) -> UploadStager {
        UploadStager::new(&StorageConfig {
            upload_dir: dir.to_path_buf(),
            public_prefix: "/uploads".to_string(),
            max_file_size: LIMIT,
        })
        .await
        .unwrap()
    }

    fn chunks(
        parts: Vec<Vec<u8>>,
    ) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from(p))))
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_stage_writes_file_under_generated_name() {
        let dir = tempfile::tempdir().unwrap();
        let stager = stager(dir.path()).await;

        let staged = stager
            .stage(
                chunks(vec![vec![1u8; 100], vec![2u8; 50]]),
                "ad.png",
                Some("image/png"),
                LIMIT,
            )
            .await
            .unwrap();

        assert_eq!(staged.size, 150);
        assert!(staged.generated_name.ends_with(".png"));
        assert_eq!(staged.public_path, format!("/uploads/{}", staged.generated_name));
        assert_eq!(std::fs::read(&staged.durable_path).unwrap().len(), 150);
        assert_eq!(file_count(dir.path()), 1);

        // <uuid>-<millis>.png
        let stem = staged.generated_name.trim_end_matches(".png");
        let (token, millis) = stem.rsplit_once('-').unwrap();
        assert!(Uuid::parse_str(token).is_ok());
        assert!(millis.parse::<i64>().is_ok());
    }

    #[tokio::test]
    async fn test_generated_names_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let stager = stager(dir.path()).await;

        let a = stager
            .stage(chunks(vec![vec![0u8; 10]]), "ad.jpg", None, LIMIT)
            .await
            .unwrap();
        let b = stager
            .stage(chunks(vec![vec![0u8; 10]]), "ad.jpg", None, LIMIT)
            .await
            .unwrap();

        assert_ne!(a.generated_name, b.generated_name);
        assert_eq!(file_count(dir.path()), 2);
    }

    #[tokio::test]
    async fn test_disallowed_extension_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let stager = stager(dir.path()).await;

        for name in ["payload.exe", "page.html", "vector.svg", "noextension"] {
            let result = stager
                .stage(chunks(vec![vec![0u8; 10]]), name, Some("image/png"), LIMIT)
                .await;
            assert!(matches!(result, Err(AppError::Validation(_))), "{}", name);
        }

        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_disallowed_mime_type_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let stager = stager(dir.path()).await;

        let result = stager
            .stage(chunks(vec![vec![0u8; 10]]), "ad.png", Some("text/html"), LIMIT)
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_oversized_upload_aborts_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let stager = stager(dir.path()).await;

        let result = stager
            .stage(
                chunks(vec![vec![0u8; 600], vec![0u8; 600]]),
                "clip.mp4",
                Some("video/mp4"),
                1000,
            )
            .await;

        assert!(matches!(result, Err(AppError::PayloadTooLarge(_))));
        // Neither the final file nor the temporary file remains
        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_too_large_message_names_limit_below_one_megabyte() {
        let dir = tempfile::tempdir().unwrap();
        let stager = stager(dir.path()).await;

        let result = stager
            .stage(chunks(vec![vec![0u8; 600 * 1024]]), "ad.png", None, 512 * 1024)
            .await;

        match result {
            Err(AppError::PayloadTooLarge(msg)) => {
                assert_eq!(msg, "File too large. Maximum size is 512KB.")
            }
            other => panic!("expected PayloadTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(50 * 1024 * 1024), "50MB");
        assert_eq!(format_size(1536 * 1024), "1.5MB");
        assert_eq!(format_size(512 * 1024), "512KB");
        assert_eq!(format_size(1000), "1000 bytes");
    }

    #[tokio::test]
    async fn test_cancelled_upload_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let stager = stager(dir.path()).await;

        // First chunk arrives, then the client goes silent
        let stalled = chunks(vec![vec![7u8; 4096]]).chain(stream::pending());

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            stager.stage(stalled, "ad.png", Some("image/png"), LIMIT),
        )
        .await;

        assert!(result.is_err(), "stage should still be waiting for data");
        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_upload_exactly_at_limit_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let stager = stager(dir.path()).await;

        let staged = stager
            .stage(chunks(vec![vec![0u8; 1000]]), "clip.webm", None, 1000)
            .await
            .unwrap();

        assert_eq!(staged.size, 1000);
    }

    #[tokio::test]
    async fn test_stream_error_removes_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let stager = stager(dir.path()).await;

        let failing = stream::iter(vec![
            Ok(Bytes::from(vec![0u8; 10])),
            Err(std::io::Error::other("connection reset")),
        ]);

        let result = stager.stage(failing, "ad.gif", None, LIMIT).await;

        assert!(matches!(result, Err(AppError::Storage(_))));
        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_remove_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let stager = stager(dir.path()).await;

        let staged = stager
            .stage(chunks(vec![vec![0u8; 10]]), "ad.png", None, LIMIT)
            .await
            .unwrap();

        assert_eq!(
            stager.remove(&staged.public_path).await.unwrap(),
            RemoveOutcome::Removed
        );
        assert_eq!(
            stager.remove(&staged.public_path).await.unwrap(),
            RemoveOutcome::AlreadyGone
        );
        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_resolve_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let stager = stager(dir.path()).await;

        assert_eq!(
            stager.resolve("/uploads/abc-1.png").unwrap(),
            dir.path().join("abc-1.png")
        );

        for path in [
            "/uploads/../secret.env",
            "/uploads/nested/file.png",
            "/uploads/",
            "/elsewhere/file.png",
            "/uploads/..",
            "/uploads/a\\..\\b.png",
        ] {
            assert!(stager.resolve(path).is_err(), "{} should be rejected", path);
        }
    }

    #[tokio::test]
    async fn test_probe_writable() {
        let dir = tempfile::tempdir().unwrap();
        let stager = stager(dir.path()).await;

        assert!(stager.probe_writable().await);
        assert_eq!(file_count(dir.path()), 0);
    }
}
