use crate::error::{EncodeError, Result};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire format of [`MetricSample::timestamp`]: second precision, literal `Z`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Flat mapping from metric name to value.
///
/// Ordered only so that encoded bodies are stable in logs and tests; consumers
/// treat it as an unordered mapping.
pub type MetricMap = BTreeMap<String, MetricValue>;

/// A single numeric reading.
///
/// Counters are encoded as JSON integers, gauges as JSON floats (`0.0`, not
/// `0`).
///
/// # Examples
///
/// ```
/// use hostmon_common::MetricValue;
///
/// assert_eq!(serde_json::to_string(&MetricValue::Counter(100)).unwrap(), "100");
/// assert_eq!(serde_json::to_string(&MetricValue::Gauge(0.0)).unwrap(), "0.0");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Counter(u64),
    Gauge(f64),
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            MetricValue::Counter(v) => *v as f64,
            MetricValue::Gauge(v) => *v,
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            MetricValue::Counter(_) => true,
            MetricValue::Gauge(v) => v.is_finite(),
        }
    }
}

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        MetricValue::Counter(v)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Gauge(v)
    }
}

/// The envelope sent to the collection endpoint once per iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub resource_id: String,
    #[serde(with = "compact_utc")]
    pub timestamp: DateTime<Utc>,
    pub metrics: MetricMap,
}

impl MetricSample {
    /// Builds an envelope, dropping sub-second precision from `timestamp` so
    /// the in-memory value matches what goes on the wire.
    pub fn new(
        resource_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        metrics: MetricMap,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            timestamp: timestamp.trunc_subsecs(0),
            metrics,
        }
    }

    /// Timestamp rendered in [`TIMESTAMP_FORMAT`].
    pub fn timestamp_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Encodes the envelope as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::NonFinite`] if any gauge is NaN or infinite;
    /// serde_json would otherwise emit `null` for it.
    pub fn encode(&self) -> Result<String> {
        if let Some((key, _)) = self.metrics.iter().find(|(_, v)| !v.is_finite()) {
            return Err(EncodeError::NonFinite { key: key.clone() });
        }
        Ok(serde_json::to_string(self)?)
    }

    /// Parses an envelope previously produced by [`MetricSample::encode`].
    pub fn decode(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}

mod compact_utc {
    use super::TIMESTAMP_FORMAT;
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}
