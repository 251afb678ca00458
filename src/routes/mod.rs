//! HTTP routes for Kiln

pub mod admin;
pub mod finalize;
pub mod health;

pub use admin::handle_backfill;
pub use finalize::handle_finalize;
pub use health::{health_check, readiness_check, version_info};
