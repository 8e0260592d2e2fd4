// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sensor classification, observations and polling.
//!
//! A sensor is classified once at discovery from its `sensor/info` payload.
//! Every poll then extracts the [`Observation`]s its kind carries and pushes
//! them to the host as characteristic values.

mod classifier;
mod observation;
mod poller;

pub use classifier::{SensorKind, classify};
pub use observation::{
    Observation, RAINING_THRESHOLD, humidity, observe, rain, temperature, wind,
};
pub use poller::{SensorPoller, SensorSettings, jittered_heartrate};
