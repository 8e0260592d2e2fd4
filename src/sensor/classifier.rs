// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Classification of sensor payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::SensorInfo;

/// What a sensor measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    /// Temperature only.
    Temperature,
    /// Humidity only. Never produced by [`classify`], but accepted when a
    /// kind is deserialized.
    Humidity,
    /// Temperature and humidity.
    TemperatureHumidity,
    /// Wind direction, average and gust speed.
    Wind,
    /// Rain rate and total.
    Rain,
    /// Nothing recognised.
    Unknown,
}

impl SensorKind {
    /// Returns true if the sensor reports temperature.
    #[must_use]
    pub const fn has_temperature(self) -> bool {
        matches!(self, Self::Temperature | Self::TemperatureHumidity)
    }

    /// Returns true if the sensor reports humidity.
    #[must_use]
    pub const fn has_humidity(self) -> bool {
        matches!(self, Self::Humidity | Self::TemperatureHumidity)
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::TemperatureHumidity => "temperaturehumidity",
            Self::Wind => "wind",
            Self::Rain => "rain",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Classifies a sensor from its `sensor/info` payload.
///
/// A `model` of `temperature` or `temperaturehumidity` is taken at face
/// value. Otherwise the names of the first reported channels decide.
///
/// # Examples
///
/// ```
/// use telldus_bridge::model::SensorInfo;
/// use telldus_bridge::sensor::{classify, SensorKind};
///
/// let info: SensorInfo = serde_json::from_str(
///     r#"{"data":[{"name":"temp","value":20.1},{"name":"humidity","value":40}]}"#,
/// ).unwrap();
/// assert_eq!(classify(&info), SensorKind::TemperatureHumidity);
///
/// assert_eq!(classify(&SensorInfo::default()), SensorKind::Unknown);
/// ```
#[must_use]
pub fn classify(info: &SensorInfo) -> SensorKind {
    match info.model.as_str() {
        "temperature" => return SensorKind::Temperature,
        "temperaturehumidity" => return SensorKind::TemperatureHumidity,
        _ => {}
    }

    match info.channel_name(0) {
        Some("temp") if info.channel_name(1) == Some("humidity") => {
            SensorKind::TemperatureHumidity
        }
        Some("temp") => SensorKind::Temperature,
        Some("wdir" | "wavg" | "wgust") => SensorKind::Wind,
        Some("rrate" | "rtot") => SensorKind::Rain,
        _ => SensorKind::Unknown,
    }
}
