//! Telemetry for planning requests using the `tracing` ecosystem.
//!
//! Works with any tracing subscriber. [`PlanTelemetry`] emits the spans and
//! events for one request and keeps a [`PlanMetrics`] summary of it.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut telemetry = PlanTelemetry::new();
//! let _span = PlanTelemetry::request_span("plan").entered();
//! telemetry.record_regime(Regime::FirstStep);
//! telemetry.complete_ok("SWAP_TOKEN");
//! println!("{}", telemetry.metrics());
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{Span, debug, debug_span, info, info_span, warn};

use crate::contract::ContractId;
use crate::providers::TokenUsage;
use crate::regime::Regime;

/// How a request ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Still running.
    #[default]
    Pending,
    /// A decision was returned.
    Decided,
    /// The request failed.
    Failed,
}

/// Metrics collected during one planning request.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PlanMetrics {
    /// Selected regime, for `plan` requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regime: Option<Regime>,
    /// Number of actions offered to the oracle.
    pub catalog_size: usize,
    /// Time spent waiting on the oracle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oracle_latency: Option<Duration>,
    /// Tokens reported by the model, summed over oracle calls.
    pub tokens: TokenUsage,
    /// Total duration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
    /// How the request ended.
    pub outcome: Outcome,
}

impl PlanMetrics {
    /// Total tokens (input + output).
    #[must_use]
    pub const fn total_tokens(&self) -> u32 {
        self.tokens.total()
    }

    /// Record token usage.
    pub fn record_tokens(&mut self, usage: TokenUsage) {
        self.tokens += usage;
    }
}

impl std::fmt::Display for PlanMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Plan Request Metrics")?;
        if let Some(regime) = self.regime {
            writeln!(f, "  Regime:   {regime}")?;
        }
        writeln!(f, "  Catalog:  {} actions", self.catalog_size)?;
        if !self.tokens.is_empty() {
            writeln!(
                f,
                "  Tokens:   {} (in: {}, out: {})",
                self.total_tokens(),
                self.tokens.input_tokens,
                self.tokens.output_tokens
            )?;
        }
        if let Some(latency) = self.oracle_latency {
            writeln!(f, "  Oracle:   {:.2}s", latency.as_secs_f64())?;
        }
        if let Some(d) = self.duration {
            writeln!(f, "  Duration: {:.2}s", d.as_secs_f64())?;
        }
        Ok(())
    }
}

/// Telemetry collector for one planning request.
#[derive(Debug, Clone, Copy)]
pub struct PlanTelemetry {
    start: Instant,
    metrics: PlanMetrics,
}

impl Default for PlanTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanTelemetry {
    /// Create a new collector; the request clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            metrics: PlanMetrics::default(),
        }
    }

    /// Record the selected regime.
    pub fn record_regime(&mut self, regime: Regime) {
        self.metrics.regime = Some(regime);
        info!(regime = %regime, "regime_selected");
    }

    /// Record the size of the offered catalog.
    pub const fn record_catalog(&mut self, size: usize) {
        self.metrics.catalog_size = size;
    }

    /// Record a finished oracle call.
    pub fn record_oracle(&mut self, latency: Duration, usage: Option<&TokenUsage>) {
        self.metrics.oracle_latency = Some(latency);
        if let Some(usage) = usage {
            self.metrics.record_tokens(*usage);
        }
        debug!(
            latency_ms = latency.as_millis(),
            input_tokens = usage.map_or(0, |u| u.input_tokens),
            output_tokens = usage.map_or(0, |u| u.output_tokens),
            "oracle_completed"
        );
    }

    /// Finish a request that produced `action`.
    pub fn complete_ok(&mut self, action: &str) {
        self.finish(Outcome::Decided);
        info!(
            action,
            catalog_size = self.metrics.catalog_size,
            input_tokens = self.metrics.tokens.input_tokens,
            output_tokens = self.metrics.tokens.output_tokens,
            duration_ms = self.elapsed_ms(),
            "plan_completed"
        );
    }

    /// Finish a request that failed.
    pub fn complete_err(&mut self, error: &dyn std::error::Error) {
        self.finish(Outcome::Failed);
        warn!(error = %error, duration_ms = self.elapsed_ms(), "plan_failed");
    }

    /// Get current metrics snapshot.
    #[must_use]
    pub const fn metrics(&self) -> &PlanMetrics {
        &self.metrics
    }

    /// Create a span for a request.
    #[must_use]
    pub fn request_span(operation: &'static str) -> Span {
        info_span!("plan_request", operation)
    }

    /// Create a span for an oracle call.
    #[must_use]
    pub fn oracle_span(contract: ContractId) -> Span {
        debug_span!("oracle_call", contract = %contract)
    }

    fn finish(&mut self, outcome: Outcome) {
        self.metrics.duration = Some(self.start.elapsed());
        self.metrics.outcome = outcome;
    }

    fn elapsed_ms(&self) -> u128 {
        self.metrics.duration.unwrap_or_default().as_millis()
    }
}
