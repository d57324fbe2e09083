//! Modules layer - Infrastructure components for external resources
//!
//! Contains adapters for resources outside the database, such as media storage.

pub mod storage;
