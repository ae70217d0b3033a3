//! The ratgdo `status.json` payload.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// Reported garage door position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
    Open,
    Closed,
    /// Opening, closing, stopped, or anything else the firmware reports.
    Other,
}

impl DoorState {
    /// Gauge value for the door state, `None` when it should not be touched.
    pub fn gauge_value(self) -> Option<f64> {
        match self {
            DoorState::Closed => Some(0.0),
            DoorState::Open => Some(1.0),
            DoorState::Other => None,
        }
    }
}

/// JSON keys of every [`StatusSnapshot`] field.
const FIELD_NAMES: [&str; 30] = [
    "upTime",
    "freeHeap",
    "minHeap",
    "minStack",
    "crashCount",
    "rebootSeconds",
    "wifiPhyMode",
    "wifiPower",
    "TTCseconds",
    "motionTriggers",
    "LEDidle",
    "lastDoorUpdateAt",
    "paired",
    "garageLightOn",
    "garageMotion",
    "garageObstructed",
    "passwordRequired",
    "checkFlashCRC",
    "deviceName",
    "firmwareVersion",
    "accessoryID",
    "localIP",
    "subnetMask",
    "gatewayIP",
    "macAddress",
    "wifiSSID",
    "wifiRSSI",
    "GDOSecurityType",
    "garageDoorState",
    "garageLockState",
];

/// One decoded status response from the device.
///
/// Keys match field names case-insensitively, an exact match taking
/// precedence. Missing fields (and fields explicitly set to `null`) take
/// their zero value; unknown fields are ignored. A field holding the wrong
/// JSON type fails the whole decode.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StatusSnapshot {
    #[serde(rename = "upTime")]
    pub up_time: i64,
    #[serde(rename = "freeHeap")]
    pub free_heap: i64,
    #[serde(rename = "minHeap")]
    pub min_heap: i64,
    #[serde(rename = "minStack")]
    pub min_stack: i64,
    #[serde(rename = "crashCount")]
    pub crash_count: i64,
    #[serde(rename = "rebootSeconds")]
    pub reboot_seconds: i64,
    #[serde(rename = "wifiPhyMode")]
    pub wifi_phy_mode: i64,
    #[serde(rename = "wifiPower")]
    pub wifi_power: i64,
    #[serde(rename = "TTCseconds")]
    pub ttc_seconds: i64,
    #[serde(rename = "motionTriggers")]
    pub motion_triggers: i64,
    #[serde(rename = "LEDidle")]
    pub led_idle: i64,
    #[serde(rename = "lastDoorUpdateAt")]
    pub last_door_update_at: i64,

    pub paired: bool,
    #[serde(rename = "garageLightOn")]
    pub garage_light_on: bool,
    #[serde(rename = "garageMotion")]
    pub garage_motion: bool,
    #[serde(rename = "garageObstructed")]
    pub garage_obstructed: bool,
    #[serde(rename = "passwordRequired")]
    pub password_required: bool,
    #[serde(rename = "checkFlashCRC")]
    pub check_flash_crc: bool,

    #[serde(rename = "deviceName")]
    pub device_name: String,
    #[serde(rename = "firmwareVersion")]
    pub firmware_version: String,
    #[serde(rename = "accessoryID")]
    pub accessory_id: String,
    #[serde(rename = "localIP")]
    pub local_ip: String,
    #[serde(rename = "subnetMask")]
    pub subnet_mask: String,
    #[serde(rename = "gatewayIP")]
    pub gateway_ip: String,
    #[serde(rename = "macAddress")]
    pub mac_address: String,
    #[serde(rename = "wifiSSID")]
    pub wifi_ssid: String,
    #[serde(rename = "wifiRSSI")]
    pub wifi_rssi: String,
    #[serde(rename = "GDOSecurityType")]
    pub security_type: String,
    #[serde(rename = "garageDoorState")]
    pub garage_door_state: String,
    #[serde(rename = "garageLockState")]
    pub garage_lock_state: String,
}

impl StatusSnapshot {
    /// Decode a snapshot from a raw response body.
    pub fn from_slice(body: &[u8]) -> Result<Self, DecodeError> {
        let mut value: Value = serde_json::from_slice(body)?;
        match &mut value {
            Value::Null => return Ok(Self::default()),
            Value::Object(fields) => {
                fields.retain(|_, v| !v.is_null());
                canonicalize_keys(fields);
            }
            _ => {}
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn door_state(&self) -> DoorState {
        match self.garage_door_state.as_str() {
            "Open" => DoorState::Open,
            "Closed" => DoorState::Closed,
            _ => DoorState::Other,
        }
    }

    /// Signal strength in dBm, parsed from the leading number of `wifiRSSI`
    /// (the firmware reports strings like `"-61 dBm"`).
    pub fn wifi_rssi_dbm(&self) -> Option<f64> {
        let trimmed = self.wifi_rssi.trim_start();
        let end = trimmed
            .char_indices()
            .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
            .map(|(i, _)| i)
            .unwrap_or(trimmed.len());
        trimmed[..end].parse().ok()
    }
}

/// Rename keys that differ from a field name only by case.
fn canonicalize_keys(fields: &mut Map<String, Value>) {
    let renames: Vec<(String, &str)> = fields
        .keys()
        .filter(|key| !FIELD_NAMES.contains(&key.as_str()))
        .filter_map(|key| {
            FIELD_NAMES
                .iter()
                .find(|name| name.eq_ignore_ascii_case(key))
                .map(|name| (key.clone(), *name))
        })
        .collect();

    for (key, name) in renames {
        if let Some(value) = fields.remove(&key)
            && !fields.contains_key(name)
        {
            fields.insert(name.to_string(), value);
        }
    }
}
