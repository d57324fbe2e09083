mod ad_repository;

pub use ad_repository::{AdRepository, PgAdRepository};
