//! Mapping from a ratgdo status snapshot to Prometheus metrics.
//!
//! The exported names and label sets are consumed by existing dashboards and
//! must stay stable.

use tracing::debug;

use crate::error::DecodeError;
use crate::registry::{FamilyId, MetricType, MetricsRegistry, RegistryWriter};
use crate::status::StatusSnapshot;

/// Labels identifying the device on every per-device gauge.
pub const DEVICE_LABELS: [&str; 5] = [
    "location",
    "accessoryID",
    "deviceName",
    "localIP",
    "macAddress",
];

/// Labels of the `_info` gauge.
pub const INFO_LABELS: [&str; 7] = [
    "location",
    "firmwareVersion",
    "subnetMask",
    "gatewayIP",
    "wifiSSID",
    "garageLockState",
    "GDOSecurityType",
];

/// Label of the request outcome counter.
pub const STATUS_CLASS_LABEL: &str = "status_code_class";

/// A per-device gauge and how to read it from a snapshot.
///
/// `read` returning `None` leaves the series untouched for that scrape.
struct DeviceGauge {
    suffix: &'static str,
    help: &'static str,
    read: fn(&StatusSnapshot) -> Option<f64>,
}

fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

const DEVICE_GAUGES: &[DeviceGauge] = &[
    DeviceGauge {
        suffix: "up_time_seconds",
        help: "Uptime of the garage door in seconds.",
        read: |s| Some(s.up_time as f64),
    },
    DeviceGauge {
        suffix: "paired",
        help: "Indicates if the garage door is paired.",
        read: |s| Some(flag(s.paired)),
    },
    DeviceGauge {
        suffix: "light_on",
        help: "Indicates if the garage light is on.",
        read: |s| Some(flag(s.garage_light_on)),
    },
    DeviceGauge {
        suffix: "motion",
        help: "Indicates if there is motion detected in the garage.",
        read: |s| Some(flag(s.garage_motion)),
    },
    DeviceGauge {
        suffix: "obstructed",
        help: "Indicates if the garage door is obstructed.",
        read: |s| Some(flag(s.garage_obstructed)),
    },
    DeviceGauge {
        suffix: "password_required",
        help: "Indicates if a password is required.",
        read: |s| Some(flag(s.password_required)),
    },
    DeviceGauge {
        suffix: "free_heap_bytes",
        help: "Free heap memory in bytes.",
        read: |s| Some(s.free_heap as f64),
    },
    DeviceGauge {
        suffix: "min_heap_bytes",
        help: "Minimum heap memory in bytes.",
        read: |s| Some(s.min_heap as f64),
    },
    DeviceGauge {
        suffix: "min_stack_bytes",
        help: "Minimum stack memory in bytes.",
        read: |s| Some(s.min_stack as f64),
    },
    DeviceGauge {
        suffix: "crash_count",
        help: "Number of crashes.",
        read: |s| Some(s.crash_count as f64),
    },
    // Unknown states (opening, closing, stopped) keep the last value.
    DeviceGauge {
        suffix: "door_state",
        help: "The state of the garage door (0 = Closed, 1 = Open).",
        read: |s| s.door_state().gauge_value(),
    },
    DeviceGauge {
        suffix: "reboot_seconds",
        help: "Configured automatic reboot interval in seconds.",
        read: |s| Some(s.reboot_seconds as f64),
    },
    DeviceGauge {
        suffix: "wifi_phy_mode",
        help: "WiFi PHY mode reported by the device.",
        read: |s| Some(s.wifi_phy_mode as f64),
    },
    DeviceGauge {
        suffix: "wifi_power",
        help: "WiFi transmit power setting.",
        read: |s| Some(s.wifi_power as f64),
    },
    DeviceGauge {
        suffix: "wifi_rssi_dbm",
        help: "WiFi signal strength in dBm (NaN when the device reports no readable value).",
        read: |s| Some(s.wifi_rssi_dbm().unwrap_or(f64::NAN)),
    },
    DeviceGauge {
        suffix: "time_to_close_seconds",
        help: "Warning delay before the door closes in seconds.",
        read: |s| Some(s.ttc_seconds as f64),
    },
    DeviceGauge {
        suffix: "motion_triggers",
        help: "Motion trigger sources configured on the device.",
        read: |s| Some(s.motion_triggers as f64),
    },
    DeviceGauge {
        suffix: "led_idle",
        help: "LED idle state setting.",
        read: |s| Some(s.led_idle as f64),
    },
    DeviceGauge {
        suffix: "last_door_update_at",
        help: "Timestamp of the last door state change as reported by the device.",
        read: |s| Some(s.last_door_update_at as f64),
    },
    DeviceGauge {
        suffix: "flash_crc_checked",
        help: "Indicates if the firmware flash CRC is checked.",
        read: |s| Some(flag(s.check_flash_crc)),
    },
];

/// HTTP status class of an upstream response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    Success,
    Redirection,
    ClientError,
    ServerError,
}

impl StatusClass {
    pub const ALL: [StatusClass; 4] = [
        StatusClass::Success,
        StatusClass::Redirection,
        StatusClass::ClientError,
        StatusClass::ServerError,
    ];

    /// Classify a status code; informational (1xx) codes have no class.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            200..=299 => Some(StatusClass::Success),
            300..=399 => Some(StatusClass::Redirection),
            400..=499 => Some(StatusClass::ClientError),
            500.. => Some(StatusClass::ServerError),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusClass::Success => "2xx",
            StatusClass::Redirection => "3xx",
            StatusClass::ClientError => "4xx",
            StatusClass::ServerError => "5xx",
        }
    }
}

/// The exporter's metric instruments, bound to one registry.
///
/// Device gauges are labeled with the configured location plus identity
/// fields from the latest snapshot. When the device reports new identity
/// values, new series are created and the old ones are kept.
#[derive(Debug)]
pub struct ExporterMetrics {
    registry: MetricsRegistry,
    prefix: String,
    location: String,
    device: Vec<FamilyId>,
    info: FamilyId,
    request_count: FamilyId,
}

impl ExporterMetrics {
    /// Register all instruments and pre-create the request counter buckets.
    pub fn new(prefix: &str, location: impl Into<String>) -> Self {
        let mut registry = MetricsRegistry::new();

        let device: Vec<FamilyId> = DEVICE_GAUGES
            .iter()
            .map(|g| {
                registry.register(
                    metric_name(prefix, g.suffix),
                    g.help,
                    MetricType::Gauge,
                    &DEVICE_LABELS,
                )
            })
            .collect();

        let info = registry.register(
            metric_name(prefix, "info"),
            "Garage door device info.",
            MetricType::Gauge,
            &INFO_LABELS,
        );

        let request_count = registry.register(
            metric_name(prefix, "request_count"),
            "Count of HTTP requests to the JSON endpoint, labeled by status code class.",
            MetricType::Counter,
            &[STATUS_CLASS_LABEL],
        );

        {
            let mut writer = registry.writer();
            for class in StatusClass::ALL {
                writer.init(request_count, &[class.as_str()]);
            }
        }

        Self {
            registry,
            prefix: prefix.to_string(),
            location: location.into(),
            device,
            info,
            request_count,
        }
    }

    pub fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }

    /// Full metric name for a suffix, e.g. `door_state`.
    pub fn name(&self, suffix: &str) -> String {
        metric_name(&self.prefix, suffix)
    }

    /// Decode a response body and update every gauge from it.
    ///
    /// On a decode failure nothing is updated.
    pub fn apply_scrape(&self, body: &[u8]) -> Result<(), DecodeError> {
        let snapshot = StatusSnapshot::from_slice(body)?;
        self.apply_snapshot(&snapshot);
        Ok(())
    }

    /// Update every gauge from a decoded snapshot in one batch.
    pub fn apply_snapshot(&self, snapshot: &StatusSnapshot) {
        let mut writer = self.registry.writer();
        self.write_snapshot(&mut writer, snapshot);
    }

    /// Count one upstream response by status class.
    pub fn record_status(&self, code: u16) -> Option<StatusClass> {
        let mut writer = self.registry.writer();
        self.write_status(&mut writer, code)
    }

    /// Count the response status and, if the body decodes, update the gauges,
    /// all in one batch.
    pub fn apply_response(
        &self,
        code: u16,
        body: &[u8],
    ) -> (Option<StatusClass>, Result<(), DecodeError>) {
        let decoded = StatusSnapshot::from_slice(body);

        let mut writer = self.registry.writer();
        let class = self.write_status(&mut writer, code);
        let applied = decoded.map(|snapshot| self.write_snapshot(&mut writer, &snapshot));

        (class, applied)
    }

    /// Value of a per-device gauge for the given identity labels.
    pub fn device_gauge(&self, suffix: &str, snapshot: &StatusSnapshot) -> Option<f64> {
        let labels = self.device_labels(snapshot);
        self.registry.get(&self.name(suffix), &labels)
    }

    /// Value of one request counter bucket.
    pub fn request_count(&self, class: StatusClass) -> f64 {
        self.registry
            .get(&self.name("request_count"), &[class.as_str()])
            .unwrap_or(0.0)
    }

    /// Render all instruments in Prometheus exposition format.
    pub fn render(&self) -> String {
        self.registry.render()
    }

    fn device_labels<'a>(&'a self, snapshot: &'a StatusSnapshot) -> [&'a str; 5] {
        [
            self.location.as_str(),
            snapshot.accessory_id.as_str(),
            snapshot.device_name.as_str(),
            snapshot.local_ip.as_str(),
            snapshot.mac_address.as_str(),
        ]
    }

    fn write_snapshot(&self, writer: &mut RegistryWriter<'_>, snapshot: &StatusSnapshot) {
        let labels = self.device_labels(snapshot);
        for (gauge, id) in DEVICE_GAUGES.iter().zip(&self.device) {
            if let Some(value) = (gauge.read)(snapshot) {
                writer.set(*id, &labels, value);
            }
        }

        writer.set(
            self.info,
            &[
                self.location.as_str(),
                snapshot.firmware_version.as_str(),
                snapshot.subnet_mask.as_str(),
                snapshot.gateway_ip.as_str(),
                snapshot.wifi_ssid.as_str(),
                snapshot.garage_lock_state.as_str(),
                snapshot.security_type.as_str(),
            ],
            1.0,
        );
    }

    fn write_status(&self, writer: &mut RegistryWriter<'_>, code: u16) -> Option<StatusClass> {
        let class = StatusClass::from_code(code);
        match class {
            Some(class) => writer.inc(self.request_count, &[class.as_str()]),
            None => debug!(status = code, "Status code has no class, not counted"),
        }
        class
    }
}

fn metric_name(prefix: &str, suffix: &str) -> String {
    if prefix.is_empty() {
        suffix.to_string()
    } else {
        format!("{}_{}", prefix, suffix)
    }
}
