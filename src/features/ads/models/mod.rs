mod ad_record;

pub use ad_record::{AdRecord, AdStats, NewAd};
