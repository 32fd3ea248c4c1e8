//! Shared datetime alias

use chrono::{DateTime as ChronoDateTime, Utc};

/// Database DateTime type used across all Qualis crates
///
/// This is the canonical datetime type for TIMESTAMPTZ columns.
///
/// # Example
/// ```rust
/// use qualis_core::DBDateTime;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// pub struct Response {
///     pub created_at: DBDateTime,
/// }
/// ```
pub type DBDateTime = ChronoDateTime<Utc>;

