// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Periodic sensor polling.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::Rng;

use crate::host::{AccessoryHost, AccessoryId, Characteristic, CharacteristicValue};
use crate::model::SensorInfo;
use crate::protocol::Gateway;

use super::{SensorKind, classify, observe};

/// Polling settings of one sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSettings {
    /// Nominal polling interval, in platform beats of one second.
    pub heartrate: u64,
    /// Spread the interval randomly around the nominal value.
    pub random_heartrate: bool,
    /// Added to every temperature reading, °C.
    pub temperature_offset: f64,
}

impl SensorSettings {
    /// Default polling interval in seconds.
    pub const DEFAULT_HEARTRATE: u64 = 300;
    /// Relative spread of a randomised interval.
    pub const JITTER: f64 = 0.2;
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            heartrate: Self::DEFAULT_HEARTRATE,
            random_heartrate: false,
            temperature_offset: 0.0,
        }
    }
}

/// Picks a polling interval around `nominal`.
///
/// The active interval is `persisted` (the value the host kept from an
/// earlier run), or `nominal` on a fresh host. If it lies within ±20 % of
/// `nominal`, a new value is drawn uniformly from that band. Otherwise the
/// configuration changed since and `nominal` is used as is.
///
/// # Examples
///
/// ```
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use telldus_bridge::sensor::jittered_heartrate;
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let rate = jittered_heartrate(300, Some(310), &mut rng);
/// assert!((240..=360).contains(&rate));
///
/// let fresh = jittered_heartrate(300, None, &mut rng);
/// assert!((240..=360).contains(&fresh));
///
/// assert_eq!(jittered_heartrate(300, Some(60), &mut rng), 300);
/// ```
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn jittered_heartrate(nominal: u64, persisted: Option<u64>, rng: &mut impl Rng) -> u64 {
    let low = ((nominal as f64) * (1.0 - SensorSettings::JITTER)).floor().max(1.0) as u64;
    let high = ((nominal as f64) * (1.0 + SensorSettings::JITTER)).ceil() as u64;

    let active = persisted.unwrap_or(nominal);
    if low < high && (low..=high).contains(&active) {
        rng.gen_range(low..=high)
    } else {
        nominal
    }
}

/// Polls one sensor and pushes its observations to the host.
pub struct SensorPoller<G> {
    sensor_id: u32,
    name: String,
    kind: SensorKind,
    heartrate: u64,
    temperature_offset: f64,
    gateway: Arc<G>,
    host: Arc<dyn AccessoryHost>,
    polling: AtomicBool,
}

/// Clears the in-flight flag when a poll ends, however it ends.
struct PollGuard<'a>(&'a AtomicBool);

impl Drop for PollGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<G: Gateway> SensorPoller<G> {
    /// Creates the poller of a discovered sensor.
    ///
    /// The sensor is classified once from `info`. With a random heartrate
    /// the interval is drawn from `rng`, and the chosen value is published
    /// as the `Heartrate` characteristic.
    pub fn new(
        info: &SensorInfo,
        gateway: Arc<G>,
        host: Arc<dyn AccessoryHost>,
        settings: SensorSettings,
        rng: &mut impl Rng,
    ) -> Self {
        let accessory = AccessoryId::Sensor(info.id);
        let nominal = settings.heartrate.max(1);

        let heartrate = if settings.random_heartrate {
            let persisted = host
                .get_value(accessory, Characteristic::Heartrate)
                .and_then(|v| v.as_int())
                .and_then(|v| u64::try_from(v).ok());
            jittered_heartrate(nominal, persisted, rng)
        } else {
            nominal
        };

        host.set_value(
            accessory,
            Characteristic::Heartrate,
            CharacteristicValue::Int(i64::try_from(heartrate).unwrap_or(i64::MAX)),
        );

        let kind = classify(info);
        tracing::debug!(sensor_id = info.id, name = %info.name, %kind, heartrate, "Sensor registered");

        Self {
            sensor_id: info.id,
            name: info.name.clone(),
            kind,
            heartrate,
            temperature_offset: settings.temperature_offset,
            gateway,
            host,
            polling: AtomicBool::new(false),
        }
    }

    /// Returns the gateway id of the sensor.
    #[must_use]
    pub fn sensor_id(&self) -> u32 {
        self.sensor_id
    }

    /// Returns the sensor name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the classified kind.
    #[must_use]
    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Returns the polling interval in beats.
    #[must_use]
    pub fn heartrate(&self) -> u64 {
        self.heartrate
    }

    /// Returns true if the sensor should be polled on beat `tick`.
    #[must_use]
    pub fn is_due(&self, tick: u64) -> bool {
        tick % self.heartrate == 0
    }

    /// Returns true while a poll is waiting on the gateway.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.polling.load(Ordering::Acquire)
    }

    /// Fetches the sensor and pushes its observations. Returns the number of
    /// observations delivered.
    ///
    /// A poll started while the previous one is still out is skipped and
    /// delivers nothing.
    pub async fn poll(&self) -> usize {
        if self.polling.swap(true, Ordering::AcqRel) {
            tracing::debug!(sensor_id = self.sensor_id, "Previous poll still running, skipping");
            return 0;
        }
        let _guard = PollGuard(&self.polling);

        let info = match self.gateway.sensor_info(self.sensor_id).await {
            Ok(response) => match response.into_result("sensor/info") {
                Ok(info) => info,
                Err(e) => {
                    tracing::warn!(sensor_id = self.sensor_id, error = %e, "{}", e.kind.hint());
                    return 0;
                }
            },
            Err(e) => {
                tracing::warn!(sensor_id = self.sensor_id, error = %e, "Sensor poll failed");
                return 0;
            }
        };

        if let Some(last_updated) = info.last_updated {
            tracing::trace!(sensor_id = self.sensor_id, last_updated, battery = ?info.battery, "Sensor read");
        }

        let observations = observe(self.kind, &info, self.temperature_offset);
        let accessory = AccessoryId::Sensor(self.sensor_id);
        for observation in &observations {
            for (characteristic, value) in observation.characteristics() {
                self.host.set_value(accessory, characteristic, value);
            }
        }
        observations.len()
    }
}

impl<G> std::fmt::Debug for SensorPoller<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorPoller")
            .field("sensor_id", &self.sensor_id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("heartrate", &self.heartrate)
            .finish_non_exhaustive()
    }
}
