//! Shared data model for the hostmon agent.
//!
//! The [`types::MetricSample`] envelope is the only document that crosses the
//! wire: one per collection iteration, carrying a resource id, a UTC
//! timestamp and a flat map of metric name to number.

pub mod error;
pub mod types;

pub use error::EncodeError;
pub use types::{MetricMap, MetricSample, MetricValue, TIMESTAMP_FORMAT};
