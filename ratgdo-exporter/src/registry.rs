//! Metric registry that stores labeled series and renders them in the
//! Prometheus text exposition format.

use std::collections::BTreeMap;
use std::io::Write;

use parking_lot::{RwLock, RwLockWriteGuard};
use tracing::warn;

/// Prometheus metric type of a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Gauge,
    Counter,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Counter => "counter",
        }
    }
}

/// Handle to a registered metric family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FamilyId(usize);

/// All series sharing one metric name.
#[derive(Debug)]
struct Family {
    name: String,
    help: String,
    metric_type: MetricType,
    label_names: Vec<String>,
    /// Values keyed by label values, in `label_names` order.
    series: BTreeMap<Vec<String>, f64>,
}

impl Family {
    fn series_mut(&mut self, label_values: &[&str]) -> Option<&mut f64> {
        if label_values.len() != self.label_names.len() {
            warn!(
                metric = %self.name,
                expected = self.label_names.len(),
                got = label_values.len(),
                "Label cardinality mismatch, ignoring update"
            );
            return None;
        }
        let key = label_values.iter().map(|v| v.to_string()).collect();
        Some(self.series.entry(key).or_insert(0.0))
    }
}

/// Thread-safe store of metric families.
///
/// Families are registered once while the registry is still exclusively
/// owned. Afterwards series are only mutated through a [`RegistryWriter`],
/// which holds the write lock for its whole lifetime, so a batch of updates
/// is never observed half-applied by [`MetricsRegistry::render`].
///
/// Series are never removed. Every distinct label combination ever written
/// stays in the exposition until the process exits.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    families: RwLock<Vec<Family>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new metric family.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        help: impl Into<String>,
        metric_type: MetricType,
        label_names: &[&str],
    ) -> FamilyId {
        let families = self.families.get_mut();
        families.push(Family {
            name: name.into(),
            help: help.into(),
            metric_type,
            label_names: label_names.iter().map(|l| l.to_string()).collect(),
            series: BTreeMap::new(),
        });
        FamilyId(families.len() - 1)
    }

    /// Start a batch of updates.
    pub fn writer(&self) -> RegistryWriter<'_> {
        RegistryWriter {
            families: self.families.write(),
        }
    }

    /// Current value of a series, looked up by metric name and label values.
    pub fn get(&self, name: &str, label_values: &[&str]) -> Option<f64> {
        let families = self.families.read();
        let family = families.iter().find(|f| f.name == name)?;
        family
            .series
            .iter()
            .find(|(key, _)| key.iter().map(String::as_str).eq(label_values.iter().copied()))
            .map(|(_, value)| *value)
    }

    /// Number of series stored for a metric name.
    pub fn series_len(&self, name: &str) -> usize {
        self.families
            .read()
            .iter()
            .find(|f| f.name == name)
            .map_or(0, |f| f.series.len())
    }

    /// Total number of stored series across all families.
    pub fn series_count(&self) -> usize {
        self.families.read().iter().map(|f| f.series.len()).sum()
    }

    /// Render all families in Prometheus exposition format.
    ///
    /// Families are sorted by name; families with no series are omitted.
    pub fn render(&self) -> String {
        let families = self.families.read();
        let mut output = Vec::with_capacity(families.len() * 256);

        let mut sorted: Vec<&Family> = families.iter().filter(|f| !f.series.is_empty()).collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        for family in sorted {
            writeln!(output, "# HELP {} {}", family.name, escape_help(&family.help)).ok();
            writeln!(output, "# TYPE {} {}", family.name, family.metric_type.as_str()).ok();

            for (label_values, value) in &family.series {
                let mut labels: Vec<(&str, &str)> = family
                    .label_names
                    .iter()
                    .map(String::as_str)
                    .zip(label_values.iter().map(String::as_str))
                    .collect();
                labels.sort_by(|a, b| a.0.cmp(b.0));

                writeln!(
                    output,
                    "{}{} {}",
                    family.name,
                    format_labels(&labels),
                    format_value(*value)
                )
                .ok();
            }
        }

        String::from_utf8(output).unwrap_or_default()
    }
}

/// Exclusive access to the registry for a batch of updates.
pub struct RegistryWriter<'a> {
    families: RwLockWriteGuard<'a, Vec<Family>>,
}

impl RegistryWriter<'_> {
    /// Set a gauge series, creating it if needed.
    pub fn set(&mut self, id: FamilyId, label_values: &[&str], value: f64) {
        let family = &mut self.families[id.0];
        debug_assert_eq!(family.metric_type, MetricType::Gauge);
        if let Some(slot) = family.series_mut(label_values) {
            *slot = value;
        }
    }

    /// Increment a counter series by one, creating it if needed.
    pub fn inc(&mut self, id: FamilyId, label_values: &[&str]) {
        let family = &mut self.families[id.0];
        debug_assert_eq!(family.metric_type, MetricType::Counter);
        if let Some(slot) = family.series_mut(label_values) {
            *slot += 1.0;
        }
    }

    /// Create a series at zero without changing an existing value.
    pub fn init(&mut self, id: FamilyId, label_values: &[&str]) {
        self.families[id.0].series_mut(label_values);
    }
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// HELP text escapes only backslash and newline.
fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Format labels for Prometheus exposition format.
fn format_labels(labels: &[(&str, &str)]) -> String {
    if labels.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    format!("{{{}}}", parts.join(","))
}
