mod ad_lifecycle_service;

pub use ad_lifecycle_service::AdLifecycleService;
