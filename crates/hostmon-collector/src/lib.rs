//! Metric sources for the hostmon agent.
//!
//! Each [`MetricSource`] reads one category of host counters and returns a
//! flat [`MetricMap`] fragment. The agent merges the fragments from all of
//! its sources into a single envelope per iteration.
//!
//! Two freshness models live behind the same trait:
//!
//! - [`cpu::CpuTimesSource`] is a *delta* measurement: every call reports the
//!   share of CPU time spent in each state since the previous call, so the
//!   source keeps the last snapshot.
//! - [`network::ProcNetworkSource`] reports *cumulative* counters maintained
//!   by the kernel; it keeps no state of its own between calls.
//!
//! Both read procfs. Hosts without it are rejected by [`default_sources`].

pub mod cpu;
pub mod error;
pub mod network;

pub use error::CollectError;
pub use hostmon_common::{MetricMap, MetricValue};

use std::path::Path;

/// A host metric source polled once per collection iteration.
pub trait MetricSource: Send {
    /// Returns the source name (e.g., `"cpu"`, `"network"`), used for logging
    /// and error attribution.
    fn name(&self) -> &str;

    /// Samples the source and returns its metrics.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying OS counters cannot be read or parsed.
    fn collect(&mut self) -> Result<MetricMap, CollectError>;
}

/// Builds the default source set for a host: CPU first, then network.
///
/// Both sources read procfs under `proc_root`.
///
/// # Errors
///
/// Returns [`CollectError::Io`] naming the first counter file that cannot be
/// read, so a host without procfs fails at startup instead of on every
/// iteration.
pub fn default_sources(proc_root: &Path) -> Result<Vec<Box<dyn MetricSource>>, CollectError> {
    for file in [cpu::PROC_STAT, network::NET_DEV] {
        error::read_counter_file(proc_root.join(file))?;
    }
    Ok(vec![
        Box::new(cpu::CpuTimesSource::new(proc_root)),
        Box::new(network::ProcNetworkSource::new(proc_root)),
    ])
}
