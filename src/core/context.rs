//! Process-wide shared state
//!
//! Everything long-lived (configuration, connection pool, media storage) is
//! acquired once in [`AppContext::startup`] and handed to components by
//! construction. [`AppContext::shutdown`] releases it.

use sqlx::PgPool;
use std::sync::Arc;

use crate::core::config::Config;
use crate::core::database;
use crate::modules::storage::UploadStager;

pub struct AppContext {
    pub config: Config,
    pub pool: PgPool,
    pub stager: Arc<UploadStager>,
}

impl AppContext {
    /// Connect to the database, apply migrations and prepare the upload directory
    pub async fn startup(config: Config) -> anyhow::Result<Self> {
        let pool = database::create_pool(&config.database).await?;
        tracing::info!("Database connection pool created");

        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
        tracing::info!("Database migrations completed successfully");

        let stager = Arc::new(
            UploadStager::new(&config.storage)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to prepare upload directory: {}", e))?,
        );
        tracing::info!(
            "Upload storage ready at {} (served under {}, max {} bytes)",
            config.storage.upload_dir.display(),
            config.storage.public_prefix,
            config.storage.max_file_size
        );

        Ok(Self {
            config,
            pool,
            stager,
        })
    }

    /// Release the connection pool; in-flight queries finish first
    pub async fn shutdown(self) {
        self.pool.close().await;
        tracing::info!("Database connection pool closed");
    }
}
