// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Response bodies returned by the gateway's REST API.
//!
//! The gateway is loose about numbers: depending on firmware, sensor values
//! and dim levels arrive either as JSON numbers or as numeric strings. The
//! deserializers here accept both.

mod device;
mod sensor;
mod system;

pub use device::{Device, DeviceList};
pub use sensor::{SensorInfo, SensorList, SensorSummary, SensorValue};
pub use system::{SystemInfo, TokenRefresh};

use serde::{Deserialize, Deserializer};

/// A JSON number or a numeric string.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

impl NumberOrString {
    fn into_f64(self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Deserializes a number that may be sent as a string.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    NumberOrString::deserialize(deserializer)?
        .into_f64()
        .ok_or_else(|| serde::de::Error::custom("expected a number or numeric string"))
}

/// Deserializes an optional number that may be sent as a (possibly empty) string.
fn lenient_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<NumberOrString>::deserialize(deserializer)?.and_then(NumberOrString::into_f64))
}
