// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device bodies from `devices/list` and `device/info`.

use serde::Deserialize;

use crate::types::{Brightness, DeviceModel, DeviceStateCode, Methods};

/// A device as reported by the gateway.
///
/// # Examples
///
/// ```
/// use telldus_bridge::model::Device;
/// use telldus_bridge::types::{DeviceModel, DeviceStateCode};
///
/// let json = r#"{"id":4,"name":"Porch","methods":19,"state":16,"statevalue":"128"}"#;
/// let device: Device = serde_json::from_str(json).unwrap();
///
/// assert_eq!(device.model(), DeviceModel::Dimmer);
/// assert_eq!(device.state, DeviceStateCode::DIM);
/// assert_eq!(device.dim_level(), Some(128));
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Device {
    /// Gateway-assigned id, stable across restarts.
    pub id: u32,
    /// Name configured on the gateway.
    #[serde(default)]
    pub name: String,
    /// Methods the device supports.
    #[serde(default = "Methods::all")]
    pub methods: Methods,
    /// Last method executed on the device.
    #[serde(default)]
    pub state: DeviceStateCode,
    /// Extra state data, the dim level for dimmed devices.
    #[serde(default, deserialize_with = "super::lenient_opt_f64")]
    pub statevalue: Option<f64>,
    /// Gateway model string, e.g. `selflearning-switch:nexa`.
    #[serde(default)]
    pub model: Option<String>,
    /// RF protocol, e.g. `arctech`.
    #[serde(default)]
    pub protocol: Option<String>,
}

impl Device {
    /// Returns the device model derived from its supported methods.
    #[must_use]
    pub fn model(&self) -> DeviceModel {
        DeviceModel::from_methods(self.methods)
    }

    /// Returns the dim level (0-255) when the device reports one.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn dim_level(&self) -> Option<u8> {
        self.statevalue
            // Safe: clamped to the u8 range first
            .map(|v| v.clamp(0.0, 255.0) as u8)
    }

    /// Returns the brightness when the device is dimmed.
    #[must_use]
    pub fn brightness(&self) -> Option<Brightness> {
        if self.state == DeviceStateCode::DIM {
            self.dim_level().map(Brightness::from_device_level)
        } else {
            None
        }
    }
}

/// Body of `devices/list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceList {
    /// All devices known to the gateway.
    #[serde(rename = "device", default)]
    pub devices: Vec<Device>,
}
