//! PaperBase Common Library
//!
//! Shared code for the PaperBase services including:
//! - The catalog core (author matching, association rewrites, listing, deletion guard)
//! - Database models and connection pooling
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod catalog;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use catalog::{AuthorStore, PaperStore};
pub use config::AppConfig;
pub use db::DbPool;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
