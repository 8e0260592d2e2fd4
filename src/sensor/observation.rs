// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed observations extracted from sensor payloads.

use crate::host::{Characteristic, CharacteristicValue};
use crate::model::SensorInfo;
use crate::types::CompassDirection;

use super::SensorKind;

/// Rain rate above which it counts as raining, mm/h.
pub const RAINING_THRESHOLD: f64 = 0.2;

/// A reading of one sensor, ready to be pushed to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// Temperature in °C, offset applied, one decimal.
    Temperature(f64),
    /// Relative humidity in percent, whole number.
    Humidity(f64),
    /// Rain totals.
    Rain {
        /// Accumulated rain, mm.
        total_24h: f64,
        /// Current rate, mm/h.
        rate_1h: f64,
        /// Whether the rate is above [`RAINING_THRESHOLD`].
        raining: bool,
    },
    /// Wind reading.
    Wind {
        /// Direction the wind blows from.
        direction: CompassDirection,
        /// Average speed, m/s.
        average: f64,
        /// Gust speed, m/s.
        gust: f64,
    },
}

impl Observation {
    /// Returns the characteristic updates this observation maps to.
    #[must_use]
    pub fn characteristics(&self) -> Vec<(Characteristic, CharacteristicValue)> {
        match *self {
            Self::Temperature(celsius) => vec![(
                Characteristic::CurrentTemperature,
                CharacteristicValue::Float(celsius),
            )],
            Self::Humidity(percent) => vec![(
                Characteristic::CurrentRelativeHumidity,
                CharacteristicValue::Float(percent),
            )],
            Self::Rain {
                total_24h,
                rate_1h,
                raining,
            } => vec![
                (Characteristic::Rain, CharacteristicValue::Bool(raining)),
                (Characteristic::Rain1h, CharacteristicValue::Float(rate_1h)),
                (Characteristic::Rain24h, CharacteristicValue::Float(total_24h)),
            ],
            Self::Wind {
                direction,
                average,
                gust,
            } => vec![
                (
                    Characteristic::WindDirection,
                    CharacteristicValue::Text(direction.label().to_string()),
                ),
                (Characteristic::WindSpeed, CharacteristicValue::Float(average)),
                (Characteristic::MaximumWindSpeed, CharacteristicValue::Float(gust)),
            ],
        }
    }
}

/// Extracts every observation a sensor of `kind` carries.
///
/// Observations whose channels are missing are logged and skipped.
///
/// # Examples
///
/// ```
/// use telldus_bridge::model::SensorInfo;
/// use telldus_bridge::sensor::{observe, Observation, SensorKind};
///
/// let info: SensorInfo = serde_json::from_str(
///     r#"{"id":3,"data":[{"name":"rtot","value":350.5},{"name":"rrate","value":0.0}]}"#,
/// ).unwrap();
///
/// let observations = observe(SensorKind::Rain, &info, 0.0);
/// assert_eq!(
///     observations,
///     vec![Observation::Rain { total_24h: 350.5, rate_1h: 0.0, raining: false }],
/// );
/// ```
#[must_use]
pub fn observe(kind: SensorKind, info: &SensorInfo, temperature_offset: f64) -> Vec<Observation> {
    let mut observations = Vec::with_capacity(2);
    if kind.has_temperature() {
        observations.push(temperature(info, temperature_offset));
    }
    if kind.has_humidity() {
        observations.push(humidity(info));
    }
    match kind {
        SensorKind::Rain => observations.push(rain(info)),
        SensorKind::Wind => observations.push(wind(info)),
        _ => {}
    }
    observations.into_iter().flatten().collect()
}

/// Reads channel `temp`, adds `offset` and rounds to one decimal.
#[must_use]
pub fn temperature(info: &SensorInfo, offset: f64) -> Option<Observation> {
    let celsius = channel(info, "temp")?;
    Some(Observation::Temperature(((celsius + offset) * 10.0).round() / 10.0))
}

/// Reads channel `humidity`, rounded to a whole percent.
#[must_use]
pub fn humidity(info: &SensorInfo) -> Option<Observation> {
    channel(info, "humidity").map(|h| Observation::Humidity(h.round()))
}

/// Reads channels `rtot` and `rrate`.
#[must_use]
pub fn rain(info: &SensorInfo) -> Option<Observation> {
    let total_24h = channel(info, "rtot")?;
    let rate_1h = channel(info, "rrate")?;
    Some(Observation::Rain {
        total_24h,
        rate_1h,
        raining: rate_1h > RAINING_THRESHOLD,
    })
}

/// Reads channels `wdir`, `wavg` and `wgust`.
#[must_use]
pub fn wind(info: &SensorInfo) -> Option<Observation> {
    let degrees = channel(info, "wdir")?;
    let average = channel(info, "wavg")?;
    let gust = channel(info, "wgust")?;
    Some(Observation::Wind {
        direction: CompassDirection::from_degrees(degrees),
        average,
        gust,
    })
}

fn channel(info: &SensorInfo, name: &str) -> Option<f64> {
    let value = info.value(name);
    if value.is_none() {
        tracing::warn!(sensor_id = info.id, channel = name, "Sensor payload is missing a channel");
    }
    value
}
