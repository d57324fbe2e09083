//! Advertisement lifecycle: media upload, record bookkeeping and expiry.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/api/upload-ad` | Upload media and create an active ad |
//! | GET | `/api/ads` | List active ads |
//! | GET | `/api/ads/pole/{poleType}` | List ads for a pole |
//! | PUT | `/api/ads/{adId}/status` | Activate or deactivate an ad |
//! | DELETE | `/api/ads/{adId}` | Delete an ad and its media file |
//! | POST | `/api/maintenance/sweep-expired` | Deactivate expired ads now |
//! | GET | `/uploads/{name}` | Stored media |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod workers;

pub use repositories::{AdRepository, PgAdRepository};
pub use services::AdLifecycleService;
pub use workers::ExpirySweeper;
