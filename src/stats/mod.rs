//! Mastery statistics derived from attempt history

pub mod aggregator;
pub mod cache;
pub mod models;

pub use aggregator::{compute_statistics, compute_statistics_at};
pub use cache::StatisticsCache;
pub use models::*;
