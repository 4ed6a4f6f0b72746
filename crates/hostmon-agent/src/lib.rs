//! hostmon agent: samples CPU and network counters once per interval and
//! POSTs them as a flat JSON envelope to a collection endpoint.

pub mod config;
pub mod error;
pub mod runner;
pub mod sink;

pub use config::AgentConfig;
pub use error::{AgentError, FailureKind};
pub use runner::{CollectorLoop, IterationOutcome, LoopSettings, LoopStats};
pub use sink::{HttpSink, MetricsSink, RecordingSink};
