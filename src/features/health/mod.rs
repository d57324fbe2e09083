//! Liveness, readiness and debug probes.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/health` | Liveness |
//! | GET | `/api/health` | Database and upload directory status |
//! | GET | `/api/test-connection` | Database round-trip |
//! | GET | `/api/debug/contents` | Most recent ads |

pub mod dtos;
pub mod handlers;
pub mod routes;
pub mod services;

pub use services::HealthService;
