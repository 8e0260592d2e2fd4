// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sensor bodies from `sensors/list` and `sensor/info`.

use serde::Deserialize;

/// A sensor entry in `sensors/list`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SensorSummary {
    /// Gateway-assigned id.
    pub id: u32,
    /// Name configured on the gateway.
    #[serde(default)]
    pub name: String,
    /// Vendor model hint, e.g. `temperaturehumidity`.
    #[serde(default)]
    pub model: String,
    /// RF protocol, e.g. `fineoffset`.
    #[serde(default)]
    pub protocol: Option<String>,
}

/// Body of `sensors/list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SensorList {
    /// All sensors known to the gateway.
    #[serde(rename = "sensor", default)]
    pub sensors: Vec<SensorSummary>,
}

/// One reported channel of a sensor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SensorValue {
    /// Channel name, e.g. `temp`, `humidity`, `wgust`.
    pub name: String,
    /// The reading.
    #[serde(deserialize_with = "super::lenient_f64")]
    pub value: f64,
    /// Unit scale selector reported by the gateway.
    #[serde(default)]
    pub scale: Option<i32>,
}

/// Body of `sensor/info`.
///
/// # Examples
///
/// ```
/// use telldus_bridge::model::SensorInfo;
///
/// let json = r#"{"id":3,"name":"Garden","model":"","data":[
///     {"name":"rtot","value":350.5},{"name":"rrate","value":"0.0"}
/// ]}"#;
/// let info: SensorInfo = serde_json::from_str(json).unwrap();
///
/// assert_eq!(info.value("rtot"), Some(350.5));
/// assert_eq!(info.value("rrate"), Some(0.0));
/// assert_eq!(info.value("temp"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorInfo {
    /// Gateway-assigned id.
    #[serde(default)]
    pub id: u32,
    /// Name configured on the gateway.
    #[serde(default)]
    pub name: String,
    /// Vendor model hint.
    #[serde(default)]
    pub model: String,
    /// Reported channels, in the order the gateway lists them.
    #[serde(default)]
    pub data: Vec<SensorValue>,
    /// Battery status code, when the sensor reports one.
    #[serde(default)]
    pub battery: Option<u32>,
    /// Unix time of the last reading.
    #[serde(default)]
    pub last_updated: Option<i64>,
}

impl SensorInfo {
    /// Returns the reading of the named channel.
    #[must_use]
    pub fn value(&self, channel: &str) -> Option<f64> {
        self.data
            .iter()
            .find(|v| v.name == channel)
            .map(|v| v.value)
    }

    /// Returns the name of the channel at `index`.
    #[must_use]
    pub fn channel_name(&self, index: usize) -> Option<&str> {
        self.data.get(index).map(|v| v.name.as_str())
    }
}
