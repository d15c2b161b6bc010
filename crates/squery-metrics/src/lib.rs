//! Metrics for the squery client.
//!
//! Declares every metric the query client records as a structured [`Metric`]
//! constant, plus the [`ConnectionLabels`] attached to each sample. The
//! `metrics` facade is re-exported so callers install whatever recorder they
//! like.
//!
//! # Example
//!
//! ```rust,ignore
//! use squery_metrics::{ConnectionLabels, metric_defs, describe_metrics};
//!
//! describe_metrics();
//!
//! let labels = ConnectionLabels::new("127.0.0.1", 10011);
//! metrics::counter!(metric_defs::QUERY_COMMANDS.name, &labels.to_labels()).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use squery_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const RECONNECTS: Metric = Metric::counter("squery.query.reconnects")
///     .with_description("Reconnect attempts")
///     .with_unit(Unit::Count)
///     .with_labels(&["host", "port"]);
///
/// assert_eq!(RECONNECTS.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name, e.g. `squery.query.commands`.
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// The unit of measurement, if any.
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Declare a counter.
    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    /// Declare a gauge.
    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    /// Declare a histogram.
    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    /// Sets the description.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }

    /// The unit as a human-readable string, empty when unset.
    pub fn unit_str(&self) -> &'static str {
        self.unit.map(|u| u.as_str()).unwrap_or("")
    }
}

/// All metric definitions for the query client.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Labels present on every connection-scoped metric.
    pub const CONNECTION_LABELS: &[&str] = &["host", "port"];

    /// Labels for per-verb breakdown.
    pub const COMMAND_LABELS: &[&str] = &["host", "port", "verb"];

    /// Commands sent to the server.
    ///
    /// Labels: host, port, verb
    pub const QUERY_COMMANDS: Metric = Metric::counter("squery.query.commands")
        .with_description("Commands sent to the server")
        .with_unit(Unit::Count)
        .with_labels(COMMAND_LABELS);

    /// Replies whose status line carried a non-zero id.
    ///
    /// Labels: host, port, verb
    pub const QUERY_ERRORS: Metric = Metric::counter("squery.query.errors")
        .with_description("Replies with a non-zero status id")
        .with_unit(Unit::Count)
        .with_labels(COMMAND_LABELS);

    /// Commands refused locally because their verb is blocked.
    ///
    /// Labels: host, port, verb
    pub const QUERY_BLOCKED: Metric = Metric::counter("squery.query.blocked")
        .with_description("Commands refused by the local blocklist")
        .with_unit(Unit::Count)
        .with_labels(COMMAND_LABELS);

    /// Lines read from the transport.
    ///
    /// Labels: host, port
    pub const QUERY_LINES_READ: Metric = Metric::counter("squery.query.lines_read")
        .with_description("Lines read from the transport")
        .with_unit(Unit::Count)
        .with_labels(CONNECTION_LABELS);

    /// Notifications decoded, both embedded in replies and read by `wait`.
    ///
    /// Labels: host, port, kind
    pub const QUERY_EVENTS: Metric = Metric::counter("squery.query.events")
        .with_description("Notification events decoded")
        .with_unit(Unit::Count)
        .with_labels(&["host", "port", "kind"]);

    /// Time from sending a command to reading its status line.
    ///
    /// Labels: host, port, verb
    pub const QUERY_COMMAND_TIME: Metric = Metric::histogram("squery.query.command_time_us")
        .with_description("Round-trip time of a command in microseconds")
        .with_unit(Unit::Microseconds)
        .with_labels(COMMAND_LABELS);

    /// Process memory change accumulated by the command profiler.
    ///
    /// Labels: host, port
    pub const QUERY_PROFILER_MEMORY: Metric =
        Metric::gauge("squery.query.profiler_memory_bytes")
            .with_description("Resident memory change across profiled commands")
            .with_unit(Unit::Bytes)
            .with_labels(CONNECTION_LABELS);

    /// Every metric, for bulk registration.
    pub const ALL: &[&Metric] = &[
        &QUERY_COMMANDS,
        &QUERY_ERRORS,
        &QUERY_BLOCKED,
        &QUERY_LINES_READ,
        &QUERY_EVENTS,
        &QUERY_COMMAND_TIME,
        &QUERY_PROFILER_MEMORY,
    ];
}

/// Labels identifying one server connection.
///
/// ```rust
/// use squery_metrics::ConnectionLabels;
///
/// let labels = ConnectionLabels::new("voice.example.org", 10011);
/// assert!(labels.to_labels().contains(&("port", "10011".to_string())));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionLabels {
    /// Server host name or address.
    pub host: String,
    /// Query port.
    pub port: u16,
}

impl ConnectionLabels {
    /// Creates labels for a connection.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Converts the labels to the metrics crate label format.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![("host", self.host.clone()), ("port", self.port.to_string())]
    }

    /// Returns labels with additional key-value pairs.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Installs a Prometheus recorder serving scrapes on `addr`.
///
/// The exporter runs its HTTP listener on a background thread.
#[cfg(feature = "prometheus")]
pub fn install_prometheus(
    addr: std::net::SocketAddr,
) -> Result<(), metrics_exporter_prometheus::BuildError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
}

/// Describes all client metrics.
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
