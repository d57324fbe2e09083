//! Storage module for advertisement media
//!
//! Validates uploads against the media allow-list and stages them on the
//! local filesystem under collision-free generated names.

pub mod media;
mod upload_stager;

pub use upload_stager::{RemoveOutcome, StagedFile, UploadStager};
