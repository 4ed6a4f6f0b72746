use crate::error::{read_counter_file, CollectError, Result};
use crate::{MetricMap, MetricSource};
use hostmon_common::MetricValue;
use std::path::{Path, PathBuf};

pub const PROC_STAT: &str = "stat";

/// Cumulative CPU time counters from the aggregate `cpu` line of `/proc/stat`,
/// in clock ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

impl CpuTimes {
    /// Parses the aggregate line of a `/proc/stat` document.
    ///
    /// Format: `cpu  4705 356 584 3699176 23060 0 277 0 0 0`. Kernels older
    /// than 2.6.33 omit the trailing columns, which then read as zero.
    pub fn parse(content: &str) -> Option<Self> {
        let line = content.lines().find(|l| l.split_whitespace().next() == Some("cpu"))?;
        let mut fields = line.split_whitespace().skip(1).map(|f| f.parse::<u64>());

        let mut required = || fields.next()?.ok();
        let user = required()?;
        let nice = required()?;
        let system = required()?;
        let idle = required()?;

        let mut optional = || fields.next().and_then(|f| f.ok()).unwrap_or(0);
        Some(Self {
            user,
            nice,
            system,
            idle,
            iowait: optional(),
            irq: optional(),
            softirq: optional(),
            steal: optional(),
            guest: optional(),
            guest_nice: optional(),
        })
    }

    /// Total ticks. Guest time is already folded into `user`/`nice` by the
    /// kernel, so it is not added again.
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }
}

/// Share of CPU time, in percent, spent in each reported state over one
/// sampling window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuPercentages {
    pub user: f64,
    pub nice: f64,
    pub system: f64,
    pub idle: f64,
}

impl CpuPercentages {
    /// Computes percentages from two snapshots. Each value is rounded to one
    /// decimal and clamped to `[0, 100]`; an empty window yields all zeros.
    pub fn between(prev: &CpuTimes, cur: &CpuTimes) -> Self {
        let total = cur.total().saturating_sub(prev.total());
        if total == 0 {
            return Self::default();
        }
        let pct = |before: u64, after: u64| {
            let share = after.saturating_sub(before) as f64 * 100.0 / total as f64;
            ((share * 10.0).round() / 10.0).clamp(0.0, 100.0)
        };
        Self {
            user: pct(prev.user, cur.user),
            nice: pct(prev.nice, cur.nice),
            system: pct(prev.system, cur.system),
            idle: pct(prev.idle, cur.idle),
        }
    }

    pub fn to_metrics(&self) -> MetricMap {
        let mut metrics = MetricMap::new();
        metrics.insert("cpu.user".to_string(), MetricValue::Gauge(self.user));
        metrics.insert("cpu.nice".to_string(), MetricValue::Gauge(self.nice));
        metrics.insert("cpu.system".to_string(), MetricValue::Gauge(self.system));
        metrics.insert("cpu.idle".to_string(), MetricValue::Gauge(self.idle));
        metrics
    }
}

/// Delta CPU sampler backed by `<proc_root>/stat`.
///
/// The baseline is captured at construction, so the first [`collect`] covers
/// the time since the source was created. If that first read fails, the
/// first window starts at boot instead.
///
/// [`collect`]: MetricSource::collect
pub struct CpuTimesSource {
    path: PathBuf,
    previous: CpuTimes,
}

impl CpuTimesSource {
    pub fn new(proc_root: &Path) -> Self {
        let path = proc_root.join(PROC_STAT);
        let previous = match read_cpu_times(&path) {
            Ok(times) => times,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "CPU baseline unavailable, first sample covers time since boot"
                );
                CpuTimes::default()
            }
        };
        Self { path, previous }
    }

    /// Takes a snapshot and returns the percentages since the previous one.
    pub fn sample(&mut self) -> Result<CpuPercentages> {
        let current = read_cpu_times(&self.path)?;
        let percentages = CpuPercentages::between(&self.previous, &current);
        self.previous = current;
        Ok(percentages)
    }
}

impl MetricSource for CpuTimesSource {
    fn name(&self) -> &str {
        "cpu"
    }

    fn collect(&mut self) -> Result<MetricMap> {
        Ok(self.sample()?.to_metrics())
    }
}

fn read_cpu_times(path: &Path) -> Result<CpuTimes> {
    let content = read_counter_file(path.to_path_buf())?;
    CpuTimes::parse(&content).ok_or_else(|| CollectError::Parse {
        path: path.to_path_buf(),
        reason: "missing or malformed aggregate cpu line".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT_T0: &str = "cpu  1000 0 500 8500 0 0 0 0 0 0\n\
                           cpu0 1000 0 500 8500 0 0 0 0 0 0\n\
                           intr 12345\nctxt 999\n";
    const STAT_T1: &str = "cpu  1105 0 552 9343 0 0 0 0 0 0\n\
                           cpu0 1105 0 552 9343 0 0 0 0 0 0\n\
                           intr 12399\nctxt 1010\n";

    fn write_stat(dir: &Path, content: &str) {
        std::fs::write(dir.join(PROC_STAT), content).unwrap();
    }

    #[test]
    fn parse_reads_aggregate_line_only() {
        let times = CpuTimes::parse(STAT_T0).unwrap();
        assert_eq!(times.user, 1000);
        assert_eq!(times.system, 500);
        assert_eq!(times.idle, 8500);
        assert_eq!(times.total(), 10_000);
    }

    #[test]
    fn parse_accepts_old_kernel_layout() {
        let times = CpuTimes::parse("cpu 10 20 30 40\n").unwrap();
        assert_eq!(times.iowait, 0);
        assert_eq!(times.steal, 0);
        assert_eq!(times.total(), 100);
    }

    #[test]
    fn parse_rejects_missing_cpu_line() {
        assert!(CpuTimes::parse("intr 1\nctxt 2\n").is_none());
        assert!(CpuTimes::parse("cpu 1 2 x 4\n").is_none());
    }

    #[test]
    fn percentages_follow_tick_deltas() {
        let prev = CpuTimes::parse(STAT_T0).unwrap();
        let cur = CpuTimes::parse(STAT_T1).unwrap();
        let pct = CpuPercentages::between(&prev, &cur);
        assert_eq!(pct.user, 10.5);
        assert_eq!(pct.nice, 0.0);
        assert_eq!(pct.system, 5.2);
        assert_eq!(pct.idle, 84.3);
    }

    #[test]
    fn guest_time_is_not_double_counted() {
        let prev = CpuTimes::default();
        let cur = CpuTimes {
            user: 50,
            idle: 50,
            guest: 40,
            ..Default::default()
        };
        let pct = CpuPercentages::between(&prev, &cur);
        assert_eq!(pct.user, 50.0);
        assert_eq!(pct.idle, 50.0);
    }

    #[test]
    fn empty_window_reports_zeros() {
        let t = CpuTimes::parse(STAT_T0).unwrap();
        assert_eq!(CpuPercentages::between(&t, &t), CpuPercentages::default());
    }

    #[test]
    fn counter_regression_saturates_instead_of_wrapping() {
        let prev = CpuTimes {
            user: 500,
            idle: 100,
            ..Default::default()
        };
        let cur = CpuTimes {
            user: 400,
            idle: 300,
            ..Default::default()
        };
        let pct = CpuPercentages::between(&prev, &cur);
        assert_eq!(pct.user, 0.0);
        assert!(pct.idle <= 100.0);
    }

    #[test]
    fn source_measures_since_previous_call() {
        let dir = tempfile::tempdir().unwrap();
        write_stat(dir.path(), STAT_T0);
        let mut source = CpuTimesSource::new(dir.path());

        write_stat(dir.path(), STAT_T1);
        let metrics = source.collect().unwrap();
        let mut keys: Vec<&str> = metrics.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["cpu.idle", "cpu.nice", "cpu.system", "cpu.user"]);
        assert_eq!(metrics["cpu.user"], MetricValue::Gauge(10.5));

        // Nothing moved since the last call.
        let again = source.sample().unwrap();
        assert_eq!(again, CpuPercentages::default());
    }

    #[test]
    fn missing_baseline_measures_since_boot() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = CpuTimesSource::new(dir.path());

        write_stat(dir.path(), STAT_T0);
        let pct = source.sample().unwrap();
        assert_eq!(pct.user, 10.0);
        assert_eq!(pct.system, 5.0);
        assert_eq!(pct.idle, 85.0);
    }

    #[test]
    fn unreadable_stat_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = CpuTimesSource::new(dir.path());
        assert!(matches!(source.collect(), Err(CollectError::Io { .. })));
    }

    #[test]
    fn garbage_stat_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write_stat(dir.path(), "not a stat file\n");
        let mut source = CpuTimesSource::new(dir.path());
        assert!(matches!(source.collect(), Err(CollectError::Parse { .. })));
    }
}
