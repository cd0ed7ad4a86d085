/*!
Observability infrastructure for twofold.

- Structured logging through `tracing`, installed by [`init_observability`]
- Prometheus counters and latency histograms for save/load calls (feature
  `metrics`)
*/

#[cfg(feature = "metrics")]
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;
#[cfg(feature = "metrics")]
use std::time::Instant;
use tracing::subscriber::set_global_default;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry as TracingRegistry};

use crate::{Result, TwofoldError};

/// Filter directive used when `RUST_LOG` does not mention the crate
pub const DEFAULT_LOG_DIRECTIVE: &str = "twofold_core=info";

/// Global metrics instance
#[cfg(feature = "metrics")]
static METRICS: OnceLock<std::result::Result<TwofoldMetrics, String>> = OnceLock::new();

/// Metrics collection for save/load operations
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct TwofoldMetrics {
    /// Successful and failed saves, by format
    pub saves_total: IntCounterVec,
    /// Successful and failed loads, by format
    pub loads_total: IntCounterVec,
    /// Failed operations, by format and operation
    pub errors_total: IntCounterVec,
    /// Wall time per operation
    pub operation_seconds: HistogramVec,

    // Prometheus registry for scraping
    registry: Registry,
}

#[cfg(feature = "metrics")]
impl TwofoldMetrics {
    fn new() -> Result<Self> {
        let registry = Registry::new();

        let saves_total = IntCounterVec::new(
            Opts::new("twofold_saves_total", "Total save calls dispatched by twofold"),
            &["format"],
        )
        .map_err(|e| TwofoldError::storage(format!("Failed to create saves_total metric: {e}")))?;

        let loads_total = IntCounterVec::new(
            Opts::new("twofold_loads_total", "Total load calls dispatched by twofold"),
            &["format"],
        )
        .map_err(|e| TwofoldError::storage(format!("Failed to create loads_total metric: {e}")))?;

        let errors_total = IntCounterVec::new(
            Opts::new("twofold_errors_total", "Total failed save/load calls"),
            &["format", "operation"],
        )
        .map_err(|e| TwofoldError::storage(format!("Failed to create errors_total metric: {e}")))?;

        let operation_seconds = HistogramVec::new(
            HistogramOpts::new(
                "twofold_operation_seconds",
                "Duration of save/load calls in seconds",
            ),
            &["operation"],
        )
        .map_err(|e| {
            TwofoldError::storage(format!("Failed to create operation_seconds metric: {e}"))
        })?;

        registry
            .register(Box::new(saves_total.clone()))
            .map_err(|e| TwofoldError::storage(format!("Failed to register saves_total: {e}")))?;
        registry
            .register(Box::new(loads_total.clone()))
            .map_err(|e| TwofoldError::storage(format!("Failed to register loads_total: {e}")))?;
        registry
            .register(Box::new(errors_total.clone()))
            .map_err(|e| TwofoldError::storage(format!("Failed to register errors_total: {e}")))?;
        registry
            .register(Box::new(operation_seconds.clone()))
            .map_err(|e| {
                TwofoldError::storage(format!("Failed to register operation_seconds: {e}"))
            })?;

        Ok(Self {
            saves_total,
            loads_total,
            errors_total,
            operation_seconds,
            registry,
        })
    }

    /// Get or initialize the global metrics instance
    pub fn global() -> Result<&'static TwofoldMetrics> {
        METRICS
            .get_or_init(|| Self::new().map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|e| TwofoldError::storage(e.clone()))
    }

    /// Record a dispatched call
    pub fn record_call(&self, operation: &str, format: &str) {
        match operation {
            "save" => self.saves_total.with_label_values(&[format]).inc(),
            _ => self.loads_total.with_label_values(&[format]).inc(),
        }
    }

    /// Record a failed call
    pub fn record_error(&self, operation: &str, format: &str) {
        self.errors_total.with_label_values(&[format, operation]).inc();
    }

    /// Record call latency
    pub fn record_latency(&self, operation: &str, duration: std::time::Duration) {
        self.operation_seconds
            .with_label_values(&[operation])
            .observe(duration.as_secs_f64());
    }

    /// Gather metrics in Prometheus format
    pub fn gather_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| TwofoldError::storage(format!("Failed to encode metrics: {e}")))?;

        String::from_utf8(buffer)
            .map_err(|e| TwofoldError::storage(format!("Failed to convert metrics to string: {e}")))
    }
}

/// Render the global registry in the Prometheus text format
#[cfg(feature = "metrics")]
pub fn gather_metrics() -> Result<String> {
    TwofoldMetrics::global()?.gather_metrics()
}

/// Measures one save or load call
///
/// Metrics are best effort: if the registry failed to initialize the timer
/// records nothing.
#[cfg(feature = "metrics")]
pub struct MetricsTimer {
    start: Instant,
    operation: &'static str,
    format: String,
}

#[cfg(feature = "metrics")]
impl MetricsTimer {
    /// Count the call and start timing it
    pub fn start(operation: &'static str, format: impl Into<String>) -> Self {
        let format = format.into();
        if let Ok(metrics) = TwofoldMetrics::global() {
            metrics.record_call(operation, &format);
        }
        Self {
            start: Instant::now(),
            operation,
            format,
        }
    }

    /// Complete the timer, recording latency
    pub fn finish(self) {
        if let Ok(metrics) = TwofoldMetrics::global() {
            metrics.record_latency(self.operation, self.start.elapsed());
        }
    }

    /// Complete the timer with an error, recording both latency and error
    pub fn finish_with_error(self) {
        if let Ok(metrics) = TwofoldMetrics::global() {
            metrics.record_latency(self.operation, self.start.elapsed());
            metrics.record_error(self.operation, &self.format);
        }
    }
}

/// Initialize the global tracing subscriber
///
/// The filter comes from `RUST_LOG` with [`DEFAULT_LOG_DIRECTIVE`] added.
/// `json` selects one JSON object per event instead of human-readable lines.
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn init_observability(json: bool) -> Result<()> {
    #[cfg(feature = "metrics")]
    TwofoldMetrics::global()?;

    let filter = EnvFilter::from_default_env().add_directive(
        DEFAULT_LOG_DIRECTIVE
            .parse()
            .map_err(|e| TwofoldError::validation(format!("Invalid log directive: {e}")))?,
    );

    let result = if json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(false);
        set_global_default(TracingRegistry::default().with(filter).with(fmt_layer))
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
        set_global_default(TracingRegistry::default().with(filter).with(fmt_layer))
    };
    result.map_err(|e| {
        TwofoldError::storage(format!("Failed to set global tracing subscriber: {e}"))
    })?;

    tracing::info!(json, "twofold observability initialized");
    Ok(())
}

/// Initialize observability with default settings (JSON logs)
pub fn init_default_observability() -> Result<()> {
    init_observability(true)
}
