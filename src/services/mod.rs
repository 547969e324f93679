//! Application services.
//!
//! Logic shared by several handlers that is not a single query: progress
//! aggregation and uploaded file storage.

pub mod progress;
pub mod uploads;
