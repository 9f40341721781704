//! Centralized error handling for the photo camera
//!
//! # Error Categories
//!
//! - **Snapshot Errors**: reading or writing the persisted gallery
//! - **Fetch Errors**: image URL validation and image byte retrieval
//! - **Configuration Errors**: settings the gallery cannot run with
//!
//! Fetch errors never reach entity consumers: the cache logs them and falls
//! back to the placeholder image. Snapshot write errors are returned from
//! `ingest` so an unpersisted gallery is never published.

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for snapshot persistence Results
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Convenience type alias for image fetch Results
pub type FetchResult<T> = Result<T, FetchError>;
