//! Mentor assignment and placement-readiness analytics for Group Scholar.

pub mod analytics;
pub mod assignment;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod models;
pub mod notify;
pub mod peer;
pub mod report;
pub mod risk;
pub mod roles;
pub mod scoring;
pub mod store;
pub mod trend;

pub use error::{InsightError, Result};
