//! The collect → encode → deliver → sleep cycle.

use crate::config::AgentConfig;
use crate::error::{AgentError, FailureKind, Result};
use crate::sink::MetricsSink;
use chrono::Utc;
use hostmon_collector::{MetricMap, MetricSource};
use hostmon_common::MetricSample;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub resource_id: String,
    /// Pause after each iteration, measured from its end.
    pub interval: Duration,
}

impl LoopSettings {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            resource_id: config.effective_resource_id(),
            interval: config.interval(),
        }
    }
}

/// Result of a single iteration, consumed by the loop driver.
#[derive(Debug)]
pub enum IterationOutcome {
    Delivered { metric_count: usize },
    Failed(AgentError),
}

impl IterationOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, IterationOutcome::Delivered { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            IterationOutcome::Delivered { .. } => None,
            IterationOutcome::Failed(e) => Some(e.kind()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub iterations: u64,
    pub delivered: u64,
    pub failed: u64,
}

impl LoopStats {
    fn record(&mut self, outcome: &IterationOutcome) {
        self.iterations += 1;
        if outcome.is_delivered() {
            self.delivered += 1;
        } else {
            self.failed += 1;
        }
    }
}

pub struct CollectorLoop {
    settings: LoopSettings,
    sources: Vec<Box<dyn MetricSource>>,
    sink: Arc<dyn MetricsSink>,
}

impl CollectorLoop {
    pub fn new(
        settings: LoopSettings,
        sources: Vec<Box<dyn MetricSource>>,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            settings,
            sources,
            sink,
        }
    }

    /// Polls every source and wraps the merged metrics in an envelope stamped
    /// with the current UTC second.
    ///
    /// # Errors
    ///
    /// Fails on the first source error; no partial envelope is produced.
    pub fn sample(&mut self) -> Result<MetricSample> {
        let mut metrics = MetricMap::new();
        for source in &mut self.sources {
            let fragment = source.collect().map_err(|error| AgentError::Sampling {
                source_name: source.name().to_string(),
                error,
            })?;
            metrics.extend(fragment);
        }
        Ok(MetricSample::new(
            self.settings.resource_id.clone(),
            Utc::now(),
            metrics,
        ))
    }

    /// Runs one iteration without sleeping.
    pub async fn run_once(&mut self) -> IterationOutcome {
        match self.try_iteration().await {
            Ok(metric_count) => IterationOutcome::Delivered { metric_count },
            Err(e) => IterationOutcome::Failed(e),
        }
    }

    async fn try_iteration(&mut self) -> Result<usize> {
        let sample = self.sample()?;
        let body = sample.encode()?;
        self.sink.deliver(body).await?;
        Ok(sample.metrics.len())
    }

    /// Loops until `shutdown` becomes `true`.
    ///
    /// The flag is checked before each iteration, while a delivery is in
    /// flight (the request is dropped) and during the sleep. Iteration
    /// failures are logged and never end the loop.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> LoopStats {
        let mut stats = LoopStats::default();
        let interval = self.settings.interval;

        tracing::info!(
            resource_id = %self.settings.resource_id,
            interval_ms = interval.as_millis() as u64,
            sources = self.sources.len(),
            sink = self.sink.name(),
            "Starting collection loop"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let outcome = tokio::select! {
                outcome = self.run_once() => outcome,
                _ = stop_requested(&mut shutdown) => {
                    tracing::info!("Stop requested, abandoning in-flight iteration");
                    break;
                }
            };

            match &outcome {
                IterationOutcome::Delivered { metric_count } => {
                    tracing::debug!(count = metric_count, "Metrics reported");
                }
                IterationOutcome::Failed(e) => {
                    tracing::warn!(kind = %e.kind(), error = %e, "Collection iteration failed");
                }
            }
            stats.record(&outcome);

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = stop_requested(&mut shutdown) => break,
            }
        }

        tracing::info!(
            iterations = stats.iterations,
            delivered = stats.delivered,
            failed = stats.failed,
            "Collection loop stopped"
        );
        stats
    }
}

/// Resolves once the stop flag is set. A dropped sender can no longer stop
/// the loop, so this then never resolves.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
