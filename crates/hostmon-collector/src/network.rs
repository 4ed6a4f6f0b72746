use crate::error::{read_counter_file, CollectError, Result};
use crate::{MetricMap, MetricSource};
use hostmon_common::MetricValue;
use std::path::{Path, PathBuf};

pub const NET_DEV: &str = "net/dev";

/// Cumulative counters for one interface since it came up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errin: u64,
    pub errout: u64,
    pub dropin: u64,
    pub dropout: u64,
}

impl InterfaceCounters {
    /// Field suffixes in the order they appear in metric keys.
    pub const FIELDS: [&'static str; 8] = [
        "bytes_sent",
        "bytes_recv",
        "packets_sent",
        "packets_recv",
        "errin",
        "errout",
        "dropin",
        "dropout",
    ];

    fn values(&self) -> [u64; 8] {
        [
            self.bytes_sent,
            self.bytes_recv,
            self.packets_sent,
            self.packets_recv,
            self.errin,
            self.errout,
            self.dropin,
            self.dropout,
        ]
    }

    /// Appends the eight `net.if.<interface>.<field>` keys. The interface name
    /// is used verbatim, dots included.
    pub fn insert_into(&self, interface: &str, metrics: &mut MetricMap) {
        for (field, value) in Self::FIELDS.iter().zip(self.values()) {
            metrics.insert(format!("net.if.{interface}.{field}"), MetricValue::Counter(value));
        }
    }
}

/// Parses a `/proc/net/dev` document into `(interface, counters)` pairs.
///
/// ```text
/// Inter-|   Receive                                                |  Transmit
///  face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
///   eth0: 200       2       0    0    0     0          0         0      100       1    0    0    0     0       0          0
/// ```
///
/// The name is everything before the last `:` so aliases such as `eth0:1`
/// survive intact.
pub fn parse_net_dev(
    content: &str,
) -> std::result::Result<Vec<(String, InterfaceCounters)>, String> {
    let mut interfaces = Vec::new();
    for (idx, line) in content.lines().enumerate().skip(2) {
        if line.trim().is_empty() {
            continue;
        }
        let colon = line
            .rfind(':')
            .ok_or_else(|| format!("line {}: missing ':' separator", idx + 1))?;
        let name = line[..colon].trim();
        let fields = line[colon + 1..]
            .split_whitespace()
            .map(|f| f.parse::<u64>())
            .collect::<std::result::Result<Vec<u64>, _>>()
            .map_err(|e| format!("line {}: {e}", idx + 1))?;
        if fields.len() < 16 {
            return Err(format!(
                "line {}: expected 16 counters for '{name}', found {}",
                idx + 1,
                fields.len()
            ));
        }
        interfaces.push((
            name.to_string(),
            InterfaceCounters {
                bytes_recv: fields[0],
                packets_recv: fields[1],
                errin: fields[2],
                dropin: fields[3],
                bytes_sent: fields[8],
                packets_sent: fields[9],
                errout: fields[10],
                dropout: fields[11],
            },
        ));
    }
    Ok(interfaces)
}

/// Per-interface counters read from `<proc_root>/net/dev`.
pub struct ProcNetworkSource {
    path: PathBuf,
}

impl ProcNetworkSource {
    pub fn new(proc_root: &Path) -> Self {
        Self {
            path: proc_root.join(NET_DEV),
        }
    }

    pub fn interfaces(&self) -> Result<Vec<(String, InterfaceCounters)>> {
        let content = read_counter_file(self.path.clone())?;
        parse_net_dev(&content).map_err(|reason| CollectError::Parse {
            path: self.path.clone(),
            reason,
        })
    }
}

impl MetricSource for ProcNetworkSource {
    fn name(&self) -> &str {
        "network"
    }

    fn collect(&mut self) -> Result<MetricMap> {
        let mut metrics = MetricMap::new();
        for (name, counters) in self.interfaces()? {
            counters.insert_into(&name, &mut metrics);
        }
        Ok(metrics)
    }
}
